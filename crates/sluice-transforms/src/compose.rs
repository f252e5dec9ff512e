// Compose / DropoutCompose: run a sequence of stages
//
// The batch is threaded through the stages one after another. The execution
// order is the identity, or a fresh permutation per call when shuffling is
// on; DropoutCompose additionally keeps each stage only if its Bernoulli
// trial succeeds. The realised order of the latest call is recorded and can
// be read back through `transform_order()`.
//
// All randomness comes from the `Context` passed to the call.

use std::sync::{Mutex, PoisonError};

use rand::distributions::{Bernoulli, Distribution};
use rand::seq::SliceRandom;

use sluice_core::{Batch, DType, Device, Error, Result, Tensor};

use crate::context::Context;
use crate::transform::{BatchFn, Transform, TransformWrapper};

// IntoStages: what a pipeline can be built from

/// Anything that can be turned into an ordered list of stages: a single
/// stage, an array of stages, a `Vec` of boxed stages, or a tuple of any of
/// these.
pub trait IntoStages {
    fn into_stages(self) -> Vec<Box<dyn Transform>>;
}

impl<T: Transform + 'static> IntoStages for T {
    fn into_stages(self) -> Vec<Box<dyn Transform>> {
        vec![Box::new(self)]
    }
}

impl IntoStages for Vec<Box<dyn Transform>> {
    fn into_stages(self) -> Vec<Box<dyn Transform>> {
        self
    }
}

impl<T: Transform + 'static, const N: usize> IntoStages for [T; N] {
    fn into_stages(self) -> Vec<Box<dyn Transform>> {
        self.into_iter()
            .map(|t| Box::new(t) as Box<dyn Transform>)
            .collect()
    }
}

macro_rules! tuple_into_stages {
    ($($name:ident),+) => {
        impl<$($name: IntoStages),+> IntoStages for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_stages(self) -> Vec<Box<dyn Transform>> {
                let ($($name,)+) = self;
                let mut stages = Vec::new();
                $(stages.extend($name.into_stages());)+
                stages
            }
        }
    };
}

tuple_into_stages!(A, B);
tuple_into_stages!(A, B, C);
tuple_into_stages!(A, B, C, D);
tuple_into_stages!(A, B, C, D, E);

fn identity_order(n: usize) -> Vec<usize> {
    (0..n).collect()
}

// Compose

/// Runs stages in sequence, optionally in a shuffled order per call.
///
/// # Example
/// ```
/// use sluice_core::{Batch, DType, Device, Tensor};
/// use sluice_transforms::{Compose, Context, Mirror, NormMinMax, Transform};
///
/// let pipeline = Compose::new((Mirror::new(&[0]), NormMinMax::new()));
/// let mut batch = Batch::new();
/// batch.insert("data".into(), Tensor::zeros([1, 1, 4, 4], DType::F32, Device::Cpu));
///
/// let out = pipeline.call(batch, &mut Context::seeded(0)).unwrap();
/// assert_eq!(pipeline.transform_order(), vec![0, 1]);
/// assert_eq!(out["data"].dims(), &[1, 1, 4, 4]);
/// ```
#[derive(Debug, Default)]
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
    shuffle: bool,
    transform_order: Mutex<Vec<usize>>,
}

impl Compose {
    pub fn new(stages: impl IntoStages) -> Self {
        let transforms = stages.into_stages();
        let order = identity_order(transforms.len());
        Self {
            transforms,
            shuffle: false,
            transform_order: Mutex::new(order),
        }
    }

    /// Pipeline made of plain callables, each wrapped in a
    /// [`TransformWrapper`].
    pub fn from_fns<F, I>(fns: I) -> Self
    where
        F: BatchFn + 'static,
        I: IntoIterator<Item = F>,
    {
        let stages: Vec<Box<dyn Transform>> = fns
            .into_iter()
            .map(|f| Box::new(TransformWrapper::new(f)) as Box<dyn Transform>)
            .collect();
        Self::new(stages)
    }

    /// Append more stages.
    pub fn with(mut self, stages: impl IntoStages) -> Self {
        self.transforms.extend(stages.into_stages());
        self.reset_order();
        self
    }

    /// Append a plain callable, wrapped in a [`TransformWrapper`].
    pub fn with_fn<F: BatchFn + 'static>(self, f: F) -> Self {
        self.with(TransformWrapper::new(f))
    }

    /// Draw a new execution order on every call.
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    pub fn transforms(&self) -> &[Box<dyn Transform>] {
        &self.transforms
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Stage indices executed by the latest call, in execution order.
    ///
    /// Before the first call this is the identity order.
    pub fn transform_order(&self) -> Vec<usize> {
        self.transform_order
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn reset_order(&mut self) {
        let order = identity_order(self.transforms.len());
        *self
            .transform_order
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = order;
    }

    /// Identity, or a fresh permutation drawn from `ctx` when shuffling.
    fn draw_order(&self, ctx: &mut Context) -> Vec<usize> {
        let mut order = identity_order(self.transforms.len());
        if self.shuffle {
            order.shuffle(ctx.rng());
        }
        order
    }

    /// Record `order` and thread `batch` through those stages.
    fn run(&self, mut batch: Batch, order: Vec<usize>, ctx: &mut Context) -> Result<Batch> {
        tracing::trace!(order = ?order, "running pipeline");
        *self
            .transform_order
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = order.clone();
        for idx in order {
            let stage = self.transforms.get(idx).ok_or(Error::IndexOutOfRange {
                index: idx,
                len: self.transforms.len(),
            })?;
            batch = stage.call(batch, ctx)?;
        }
        Ok(batch)
    }

    fn visit_children(
        &mut self,
        mut f: impl FnMut(&mut dyn Transform) -> Result<()>,
    ) -> Result<()> {
        for stage in &mut self.transforms {
            f(&mut **stage)?;
        }
        Ok(())
    }
}

impl Transform for Compose {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        let order = self.draw_order(ctx);
        self.run(batch, order, ctx)
    }

    fn visit_buffers_mut(&mut self, f: &mut dyn FnMut(&mut Tensor) -> Result<()>) -> Result<()> {
        self.visit_children(|stage| stage.visit_buffers_mut(f))
    }

    fn to_device(&mut self, device: Device) -> Result<()> {
        self.visit_children(|stage| stage.to_device(device))
    }

    fn to_dtype(&mut self, dtype: DType) -> Result<()> {
        self.visit_children(|stage| stage.to_dtype(dtype))
    }

    fn name(&self) -> &str {
        "Compose"
    }
}

// DropoutCompose

/// Inclusion probability for [`DropoutCompose`]: one value shared by every
/// stage, or one value per stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Probability {
    Shared(f64),
    PerStage(Vec<f64>),
}

impl Probability {
    /// One probability per stage, validated against the stage count and the
    /// `[0, 1]` range.
    fn per_stage(self, stages: usize) -> Result<Vec<f64>> {
        let probs = match self {
            Probability::Shared(p) => vec![p; stages],
            Probability::PerStage(ps) => {
                if ps.len() != stages {
                    return Err(Error::config(format!(
                        "dropout needs one probability per stage: got {} for {stages} stages",
                        ps.len()
                    )));
                }
                ps
            }
        };
        if let Some(bad) = probs.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(Error::config(format!(
                "dropout probability {bad} outside [0, 1]"
            )));
        }
        Ok(probs)
    }
}

impl From<f64> for Probability {
    fn from(p: f64) -> Self {
        Probability::Shared(p)
    }
}

impl From<Vec<f64>> for Probability {
    fn from(ps: Vec<f64>) -> Self {
        Probability::PerStage(ps)
    }
}

impl From<&[f64]> for Probability {
    fn from(ps: &[f64]) -> Self {
        Probability::PerStage(ps.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Probability {
    fn from(ps: [f64; N]) -> Self {
        Probability::PerStage(ps.to_vec())
    }
}

/// A [`Compose`] whose stages each run only if an independent Bernoulli
/// trial succeeds.
///
/// The probability is the chance that a stage is *kept*: `1.0` always runs
/// every stage, `0.0` never runs any.
#[derive(Debug)]
pub struct DropoutCompose {
    compose: Compose,
    probabilities: Vec<f64>,
    trials: Vec<Bernoulli>,
}

impl DropoutCompose {
    /// Fails with a configuration error if a per-stage probability list does
    /// not match the number of stages or a value lies outside `[0, 1]`.
    pub fn new(stages: impl IntoStages, dropout: impl Into<Probability>) -> Result<Self> {
        Self::from_compose(Compose::new(stages), dropout)
    }

    /// Gate the stages of an existing pipeline, keeping its shuffle setting.
    pub fn from_compose(compose: Compose, dropout: impl Into<Probability>) -> Result<Self> {
        let probabilities = dropout.into().per_stage(compose.len())?;
        let trials = probabilities
            .iter()
            .map(|&p| {
                Bernoulli::new(p)
                    .map_err(|e| Error::config_with_source("invalid dropout probability", e))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            compose,
            probabilities,
            trials,
        })
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.compose = self.compose.shuffle(shuffle);
        self
    }

    /// Per-stage inclusion probabilities.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn transforms(&self) -> &[Box<dyn Transform>] {
        self.compose.transforms()
    }

    /// Stage indices kept and executed by the latest call.
    pub fn transform_order(&self) -> Vec<usize> {
        self.compose.transform_order()
    }

    pub fn len(&self) -> usize {
        self.compose.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compose.is_empty()
    }
}

impl Transform for DropoutCompose {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        let order: Vec<usize> = self
            .compose
            .draw_order(ctx)
            .into_iter()
            .filter(|&idx| self.trials[idx].sample(ctx.rng()))
            .collect();
        self.compose.run(batch, order, ctx)
    }

    fn visit_buffers_mut(&mut self, f: &mut dyn FnMut(&mut Tensor) -> Result<()>) -> Result<()> {
        self.compose.visit_buffers_mut(f)
    }

    fn to_device(&mut self, device: Device) -> Result<()> {
        self.compose.to_device(device)
    }

    fn to_dtype(&mut self, dtype: DType) -> Result<()> {
        self.compose.to_dtype(dtype)
    }

    fn name(&self) -> &str {
        "DropoutCompose"
    }
}
