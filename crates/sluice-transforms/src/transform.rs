// Transform: the stage interface every pipeline step implements
//
// A stage takes a batch (field name -> tensor), rewrites some of its fields
// and hands it back. `forward()` is the stage's own computation; `call()` is
// what pipelines invoke, and runs `forward()` with gradient tracking forced
// to the stage's `grad()` setting, restoring the caller's state afterwards.
//
// Stages own their parameter buffers (e.g. normalisation statistics) and may
// own child stages. `visit_buffers_mut()` exposes all of them so that
// `to_device()` / `to_dtype()` reach every nested buffer.

use std::any::Any;

use sluice_core::{Batch, DType, Device, Error, GradState, Result, Tensor};

use crate::context::Context;

/// Upcast to `Any`, blanket-implemented for every `'static` type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A single pipeline step.
///
/// # Example
/// ```
/// use sluice_core::{Batch, Result};
/// use sluice_transforms::{Context, Transform};
///
/// struct DropSeg;
///
/// impl Transform for DropSeg {
///     fn forward(&self, mut batch: Batch, _ctx: &mut Context) -> Result<Batch> {
///         batch.remove("seg");
///         Ok(batch)
///     }
/// }
/// ```
pub trait Transform: AsAny + Send + Sync {
    /// Apply the stage to `batch`.
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch>;

    /// Whether gradients are tracked while this stage runs.
    fn grad(&self) -> bool {
        false
    }

    /// Run [`Transform::forward`] under this stage's gradient setting.
    fn call(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        let mut scope = ctx.grad_scope(self.grad());
        self.forward(batch, &mut scope)
    }

    /// Visit every tensor this stage owns, including those of child stages.
    fn visit_buffers_mut(&mut self, _f: &mut dyn FnMut(&mut Tensor) -> Result<()>) -> Result<()> {
        Ok(())
    }

    /// Move every owned buffer to `device`.
    fn to_device(&mut self, device: Device) -> Result<()> {
        self.visit_buffers_mut(&mut |t| {
            *t = t.to_device(device);
            Ok(())
        })
    }

    /// Cast every owned buffer to `dtype`.
    fn to_dtype(&mut self, dtype: DType) -> Result<()> {
        self.visit_buffers_mut(&mut |t| {
            *t = t.to_dtype(dtype)?;
            Ok(())
        })
    }

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl dyn Transform {
    /// Concrete stage behind a trait object, if it is a `T`.
    pub fn downcast_ref<T: Transform + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Transform + 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl std::fmt::Debug for dyn Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transform({})", self.name())
    }
}

/// A plain batch callable.
pub trait BatchFn: Send + Sync {
    fn apply(&self, batch: Batch) -> Result<Batch>;
}

impl<F> BatchFn for F
where
    F: Fn(Batch) -> Result<Batch> + Send + Sync,
{
    fn apply(&self, batch: Batch) -> Result<Batch> {
        self(batch)
    }
}

/// Turns a plain callable into a stage.
///
/// Pipelines wrap callables automatically; the original stays reachable
/// through [`TransformWrapper::trafo`].
#[derive(Clone)]
pub struct TransformWrapper<F> {
    trafo: F,
}

impl<F: BatchFn> TransformWrapper<F> {
    pub fn new(trafo: F) -> Self {
        Self { trafo }
    }

    /// The wrapped callable.
    pub fn trafo(&self) -> &F {
        &self.trafo
    }

    pub fn into_inner(self) -> F {
        self.trafo
    }
}

impl<F: BatchFn + 'static> Transform for TransformWrapper<F> {
    fn forward(&self, batch: Batch, _ctx: &mut Context) -> Result<Batch> {
        self.trafo.apply(batch)
    }

    fn name(&self) -> &str {
        "TransformWrapper"
    }
}

/// Replace `batch[key]` with `f(batch[key])` for every key.
///
/// Outputs stop tracking gradients when the context has tracking disabled.
/// A key absent from the batch is a [`Error::MissingField`].
pub fn map_keys<F>(mut batch: Batch, keys: &[String], ctx: &mut Context, mut f: F) -> Result<Batch>
where
    F: FnMut(&Tensor, &mut Context) -> Result<Tensor>,
{
    for key in keys {
        let input = batch.get(key).ok_or_else(|| Error::missing_field(key.as_str()))?;
        let mut out = f(input, ctx)?;
        if !ctx.grad_enabled() {
            out = out.detach();
        }
        batch.insert(key.clone(), out);
    }
    Ok(batch)
}

/// Collect `keys` into owned field names.
pub(crate) fn key_list<I, S>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keys.into_iter().map(Into::into).collect()
}

/// Builder methods shared by every stage that has `keys` and `grad` fields.
macro_rules! stage_options {
    ($ty:ty) => {
        impl $ty {
            /// Batch fields this stage operates on.
            pub fn keys<I, S>(mut self, keys: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.keys = $crate::transform::key_list(keys);
                self
            }

            /// Keep gradient tracking enabled while this stage runs.
            pub fn grad(mut self, grad: bool) -> Self {
                self.grad = grad;
                self
            }
        }
    };
}
pub(crate) use stage_options;

/// Generic stage: apply a kernel closure to every configured key.
///
/// Built for one-off stages that do not deserve their own type.
///
/// # Example
/// ```
/// use sluice_core::Tensor;
/// use sluice_transforms::{functional, Context, KernelTransform};
///
/// let invert = KernelTransform::new(|t: &Tensor, _: &mut Context| Ok(t.map(|v| 1.0 - v)))
///     .keys(["data"]);
/// let flip_w = KernelTransform::new(|t: &Tensor, _: &mut Context| functional::mirror(t, &[1]));
/// # let _ = (invert, flip_w);
/// ```
pub struct KernelTransform<K> {
    kernel: K,
    keys: Vec<String>,
    grad: bool,
}

impl<K> KernelTransform<K>
where
    K: Fn(&Tensor, &mut Context) -> Result<Tensor> + Send + Sync + 'static,
{
    /// Kernel applied to `"data"` without gradient tracking.
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            keys: vec!["data".to_string()],
            grad: false,
        }
    }

    pub fn keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = key_list(keys);
        self
    }

    pub fn grad(mut self, grad: bool) -> Self {
        self.grad = grad;
        self
    }
}

impl<K> Transform for KernelTransform<K>
where
    K: Fn(&Tensor, &mut Context) -> Result<Tensor> + Send + Sync + 'static,
{
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        map_keys(batch, &self.keys, ctx, |t, ctx| (self.kernel)(t, ctx))
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn name(&self) -> &str {
        "KernelTransform"
    }
}
