//! # sluice-core
//!
//! Numeric substrate shared by the sluice crates.
//!
//! This crate provides:
//! - [`Tensor`]: n-dimensional host buffer with dtype, device and a
//!   gradient-tracking bit
//! - [`Shape`], [`DType`], [`Device`]
//! - [`Batch`]: the named-buffer mapping every transform stage consumes
//! - [`GradState`] / [`GradGuard`]: scoped gradient enable/disable
//! - [`Error`] / [`Result`]: the error type used across the workspace

pub mod device;
pub mod dtype;
pub mod error;
pub mod grad;
pub mod shape;
pub mod tensor;

pub use device::Device;
pub use dtype::{DType, WithDType};
pub use error::{Error, Result};
pub use grad::{with_grad_enabled, GradGuard, GradMode, GradState};
pub use shape::Shape;
pub use tensor::{Batch, Tensor};
