//! # sluice-transforms
//!
//! Batch transform stages and the pipelines that run them.
//!
//! This crate provides:
//! - [`Transform`]: the stage trait (scoped gradient state, buffer
//!   propagation for device / dtype changes)
//! - [`Compose`]: ordered, optionally shuffled sequence of stages
//! - [`DropoutCompose`]: `Compose` with a Bernoulli trial per stage
//! - [`TransformWrapper`]: adapts plain `Fn(Batch) -> Result<Batch>` callables
//! - [`Context`]: explicit random generator + gradient flag for every call
//   - Random stage parameters (fixed, uniform, normal, choice)
//   - Functional kernels and the stages built on them: mirroring, clamping,
//     normalisation, noise, gamma, random offsets/scales, one-hot encoding

pub mod channel;
pub mod compose;
pub mod context;
pub mod functional;
pub mod intensity;
pub mod params;
pub mod spatial;
pub mod transform;

pub use channel::OneHot;
pub use compose::{Compose, DropoutCompose, IntoStages, Probability};
pub use context::Context;
pub use functional::NoiseKind;
pub use intensity::{
    Clamp, GammaCorrection, Noise, NormMeanStd, NormMinMax, NormRange, NormZeroMeanUnitStd,
    RandomValuePerChannel, ValueOp,
};
pub use params::Param;
pub use spatial::Mirror;
pub use transform::{map_keys, AsAny, BatchFn, KernelTransform, Transform, TransformWrapper};
