//! # Sluice
//!
//! Data preparation for training loops: datasets that load samples from disk
//! and pipelines of randomized transforms that reshape batches of them.
//!
//! This is the top-level facade crate that re-exports everything you need.
//!
//! ## Usage
//!
//! ```rust
//! use sluice::prelude::*;
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|----------|
//! | `sluice-core` | Tensor, Shape, DType, Device, gradient scopes, Error |
//! | `sluice-data` | CacheDataset, LazyDataset, SubsetDataset, ID lookup, collation |
//! | `sluice-transforms` | Transform trait, Compose, DropoutCompose, built-in stages |

/// Re-export core types.
pub use sluice_core::{
    with_grad_enabled, Batch, DType, Device, Error, GradGuard, GradMode, GradState, Result, Shape,
    Tensor, WithDType,
};

/// Re-export datasets.
pub mod data {
    pub use sluice_data::*;
}

/// Re-export transform stages and pipelines.
pub mod transforms {
    pub use sluice_transforms::*;
}

/// Prelude: import this for the most common types.
pub mod prelude {
    pub use crate::data::{
        collate, collate_all, train_test_split, CacheConfig, CacheDataset, CacheDatasetId,
        DataSource, Dataset, IdDataset, IdLookup, LazyDataset, LazyDatasetId, LoadMode,
        LoadOptions, Loaded, Sample, SampleId, SampleLoader, SubsetDataset, Value,
    };
    pub use crate::transforms::{
        Clamp, Compose, Context, DropoutCompose, GammaCorrection, KernelTransform, Mirror, Noise,
        NormMeanStd, NormMinMax, NormRange, NormZeroMeanUnitStd, OneHot, Param,
        RandomValuePerChannel, Transform, TransformWrapper,
    };
    pub use crate::{Batch, DType, Device, Error, GradState, Result, Shape, Tensor};
}
