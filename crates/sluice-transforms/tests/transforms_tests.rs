// Tests for sluice-transforms: Compose, DropoutCompose, wrapping, gradient
// scoping and device / dtype propagation

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use sluice_core::{Batch, DType, Device, Error, GradState, Result, Tensor};
use sluice_transforms::{
    BatchFn, Compose, Context, DropoutCompose, KernelTransform, Mirror, NormMeanStd, Transform,
    TransformWrapper,
};

fn random_batch(seed: u64) -> Batch {
    use rand::Rng;
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..100).map(|_| rng.gen::<f64>()).collect();
    let mut batch = Batch::new();
    batch.insert(
        "data".into(),
        Tensor::new(data, [1, 1, 10, 10], DType::F32, Device::Cpu).unwrap(),
    );
    batch
}

fn two_mirrors() -> Vec<Box<dyn Transform>> {
    vec![Box::new(Mirror::new(&[0])), Box::new(Mirror::new(&[0]))]
}

// Compose

#[test]
fn test_compose_single() {
    let batch = random_batch(0);
    let mut ctx = Context::seeded(0);
    let single = Compose::new(Mirror::new(&[0]));
    let out = single.call(batch.clone(), &mut ctx).unwrap();
    let expected = Mirror::new(&[0]).call(batch, &mut ctx).unwrap();
    assert_eq!(out["data"], expected["data"]);
}

#[test]
fn test_compose_multiple() {
    let batch = random_batch(1);
    let compose = Compose::new(two_mirrors());
    let out = compose.call(batch.clone(), &mut Context::seeded(0)).unwrap();
    assert_eq!(out["data"], batch["data"]);
    assert_eq!(compose.transform_order().len(), 2);
}

#[test]
fn test_compose_multiple_tuple() {
    let batch = random_batch(2);
    let compose = Compose::new((Mirror::new(&[0]), Mirror::new(&[0])));
    let out = compose.call(batch.clone(), &mut Context::seeded(0)).unwrap();
    assert_eq!(out["data"], batch["data"]);
}

#[test]
fn test_compose_identity_order() {
    let compose = Compose::new(two_mirrors());
    for seed in 0..3 {
        compose.call(random_batch(seed), &mut Context::seeded(seed)).unwrap();
        assert_eq!(compose.transform_order(), vec![0, 1]);
    }
}

#[test]
fn test_compose_shuffle() {
    let stages: Vec<Box<dyn Transform>> = (0..10)
        .map(|_| Box::new(Mirror::new(&[0])) as Box<dyn Transform>)
        .collect();
    let compose = Compose::new(stages).shuffle(true);
    assert_eq!(compose.len(), 10);

    compose.call(random_batch(3), &mut Context::seeded(0)).unwrap();

    let order: Vec<usize> = (0..10).collect();
    let mut expected = order.clone();
    expected.shuffle(&mut StdRng::seed_from_u64(0));

    assert_eq!(compose.transform_order(), expected);
    assert_ne!(expected, order);
}

#[test]
fn test_compose_shuffle_reproducible() {
    let build = || {
        let stages: Vec<Box<dyn Transform>> = (0..8)
            .map(|_| Box::new(Mirror::new(&[1])) as Box<dyn Transform>)
            .collect();
        Compose::new(stages).shuffle(true)
    };
    let (a, b) = (build(), build());
    a.call(random_batch(4), &mut Context::seeded(42)).unwrap();
    b.call(random_batch(4), &mut Context::seeded(42)).unwrap();
    assert_eq!(a.transform_order(), b.transform_order());
}

#[test]
fn test_compose_reseed_reproduces_order() {
    let stages: Vec<Box<dyn Transform>> = (0..8)
        .map(|_| Box::new(Mirror::new(&[0])) as Box<dyn Transform>)
        .collect();
    let compose = Compose::new(stages).shuffle(true);
    let mut ctx = Context::seeded(7);

    compose.call(random_batch(4), &mut ctx).unwrap();
    let first = compose.transform_order();
    compose.call(random_batch(4), &mut ctx).unwrap();
    let drifted = compose.transform_order();

    ctx.reseed(7);
    compose.call(random_batch(4), &mut ctx).unwrap();
    assert_eq!(compose.transform_order(), first);

    ctx.reseed(7);
    compose.call(random_batch(4), &mut ctx).unwrap();
    compose.call(random_batch(4), &mut ctx).unwrap();
    assert_eq!(compose.transform_order(), drifted);
}

#[test]
fn test_self_inverse_mirror_pair() {
    let mut batch = Batch::new();
    batch.insert(
        "data".into(),
        Tensor::full([1, 1, 10, 10], 0.37, DType::F32, Device::Cpu),
    );
    let compose = Compose::new((Mirror::new(&[0]), Mirror::new(&[0])));
    let out = compose.call(batch.clone(), &mut Context::seeded(0)).unwrap();
    assert_eq!(out, batch);
}

// DropoutCompose

#[test]
fn test_dropout_compose() {
    let compose = DropoutCompose::new(Mirror::new(&[0]), 0.0).unwrap();
    assert_eq!(compose.transform_order().len(), 1);

    let batch = random_batch(5);
    let compose = DropoutCompose::new(two_mirrors(), 1.0).unwrap();
    let out = compose.call(batch.clone(), &mut Context::seeded(0)).unwrap();
    assert_eq!(compose.transform_order().len(), 2);
    assert_eq!(out["data"], batch["data"]);
}

#[test]
fn test_dropout_compose_error() {
    let err = DropoutCompose::new(two_mirrors(), vec![1.0]).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_dropout_selects_subset_in_order() {
    let stages: Vec<Box<dyn Transform>> = (0..20)
        .map(|_| Box::new(Mirror::new(&[0])) as Box<dyn Transform>)
        .collect();
    let compose = DropoutCompose::new(stages, 0.5).unwrap();
    let mut ctx = Context::seeded(7);
    let mut sizes = Vec::new();
    for _ in 0..10 {
        compose.call(random_batch(6), &mut ctx).unwrap();
        let order = compose.transform_order();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        sizes.push(order.len());
    }
    // 200 fair trials: neither all kept nor all dropped
    let kept: usize = sizes.iter().sum();
    assert!(kept > 0 && kept < 200);
}

#[test]
fn test_dropout_shuffled_reproducible() {
    let build = || {
        let stages: Vec<Box<dyn Transform>> = (0..6)
            .map(|_| Box::new(Mirror::new(&[0])) as Box<dyn Transform>)
            .collect();
        DropoutCompose::new(stages, 0.7).unwrap().shuffle(true)
    };
    let (a, b) = (build(), build());
    a.call(random_batch(8), &mut Context::seeded(3)).unwrap();
    b.call(random_batch(8), &mut Context::seeded(3)).unwrap();
    assert_eq!(a.transform_order(), b.transform_order());
}

// Device / dtype propagation

struct DummyTrafo {
    tmp: Tensor,
}

impl DummyTrafo {
    fn new(value: f64) -> Self {
        Self {
            tmp: Tensor::new(vec![value], [1], DType::F32, Device::Cpu).unwrap(),
        }
    }
}

impl Transform for DummyTrafo {
    fn forward(&self, mut batch: Batch, _ctx: &mut Context) -> Result<Batch> {
        batch.insert("tmp".into(), self.tmp.clone());
        Ok(batch)
    }

    fn visit_buffers_mut(&mut self, f: &mut dyn FnMut(&mut Tensor) -> Result<()>) -> Result<()> {
        f(&mut self.tmp)
    }
}

#[test]
fn test_device_dtype_change() {
    let mut compose = Compose::new((DummyTrafo::new(1.0), DummyTrafo::new(2.0)));
    assert_eq!(
        compose.transforms()[0].downcast_ref::<DummyTrafo>().unwrap().tmp.dtype(),
        DType::F32
    );
    compose.to_dtype(DType::F64).unwrap();
    compose.to_device(Device::Cuda(0)).unwrap();
    for stage in compose.transforms() {
        let dummy = stage.downcast_ref::<DummyTrafo>().unwrap();
        assert_eq!(dummy.tmp.dtype(), DType::F64);
        assert_eq!(dummy.tmp.device(), Device::Cuda(0));
    }
}

#[test]
fn test_nested_propagation() {
    let inner = Compose::new(NormMeanStd::new(&[0.5], &[0.25]).unwrap());
    let mut outer = DropoutCompose::new((inner, DummyTrafo::new(3.0)), 1.0).unwrap();
    outer.to_dtype(DType::F16).unwrap();
    let nested = outer.transforms()[0].downcast_ref::<Compose>().unwrap();
    let norm = nested.transforms()[0].downcast_ref::<NormMeanStd>().unwrap();
    assert_eq!(norm.mean().dtype(), DType::F16);
    assert_eq!(norm.std().dtype(), DType::F16);
}

// Wrapping plain callables

struct CallableTrafo {
    a: i32,
}

impl BatchFn for CallableTrafo {
    fn apply(&self, batch: Batch) -> Result<Batch> {
        Ok(batch)
    }
}

#[test]
fn test_wrapping_non_stage_trafos() {
    let compose = Compose::from_fns([CallableTrafo { a: 5 }]);
    let wrapper = compose.transforms()[0]
        .downcast_ref::<TransformWrapper<CallableTrafo>>()
        .unwrap();
    assert_eq!(wrapper.trafo().a, 5);
}

#[test]
fn test_with_fn_wraps_closure() {
    let scale = |mut batch: Batch| -> Result<Batch> {
        if let Some(t) = batch.get_mut("data") {
            *t = t.map(|v| v * 0.0);
        }
        Ok(batch)
    };
    let compose = Compose::new(Mirror::new(&[1])).with_fn(scale);
    let out = compose.call(random_batch(9), &mut Context::seeded(0)).unwrap();
    assert_eq!(out["data"].max(), 0.0);
    assert_eq!(compose.transforms()[1].name(), "TransformWrapper");
}

// Gradient scoping

#[test]
fn test_grad_state_restored_after_pipeline() {
    let tracked = KernelTransform::new(|t: &Tensor, ctx: &mut Context| {
        assert!(ctx.grad_enabled());
        Ok(t.clone())
    })
    .grad(true);
    let untracked = KernelTransform::new(|t: &Tensor, ctx: &mut Context| {
        assert!(!ctx.grad_enabled());
        Ok(t.clone())
    });
    let compose = Compose::new((tracked, untracked));

    for ambient in [true, false] {
        let mut ctx = Context::seeded(0);
        let mut scope = ctx.grad_scope(ambient);
        compose.call(random_batch(10), &mut scope).unwrap();
        assert_eq!(scope.grad_enabled(), ambient);
    }
}

#[test]
fn test_grad_state_restored_on_error() {
    let failing = KernelTransform::new(|_: &Tensor, _: &mut Context| -> Result<Tensor> {
        Err(Error::msg("kernel failed"))
    })
    .grad(true);
    let compose = Compose::new(failing);
    let mut ctx = Context::seeded(0);
    {
        let mut scope = ctx.grad_scope(false);
        assert!(compose.call(random_batch(11), &mut scope).is_err());
        assert!(!scope.grad_enabled());
    }
    assert!(ctx.grad_enabled());
}

#[test]
fn test_missing_key_surfaces() {
    let compose = Compose::new(Mirror::new(&[0]).keys(["data", "seg"]));
    let err = compose.call(random_batch(12), &mut Context::seeded(0)).unwrap_err();
    assert!(matches!(err, Error::MissingField { ref key } if key == "seg"));
}
