//! # sluice-data
//!
//! Datasets for sluice: loading samples from disk into memory, eagerly or on
//! demand, with ID lookup and subset derivation.
//!
//! This crate provides:
//! - [`Dataset`] trait: unified interface for any dataset
//! - [`CacheDataset`]: loads everything at construction, optionally on a
//!   rayon worker pool
//! - [`LazyDataset`]: stores locations and loads on every access
//! - [`IdDataset`] / [`IdLookup`]: ID -> index lookup, cached or linear scan
//! - [`SubsetDataset`]: materialized selection that keeps the parent's
//!   attributes
//   - Directory / path-list data sources, sorted for reproducibility
//   - Collation of samples into a `Batch`
//   - Train/validation splitting with reproducible seeding

pub mod cache;
pub mod collate;
pub mod combinators;
pub mod config;
pub mod dataset;
pub mod id;
pub mod lazy;
pub mod loader;
pub mod sample;
pub mod source;

pub use cache::{CacheAttrs, CacheDataset};
pub use collate::{collate, collate_all};
pub use combinators::{train_test_split, SubsetDataset};
pub use config::{debug_mode, set_debug_mode, CacheConfig, DEBUG_ENV};
pub use dataset::{stored_sample, Dataset, DatasetIter, ItemAccess};
pub use id::{
    find_index_iterative, CacheDatasetId, IdAttrs, IdDataset, IdIndex, IdLookup, LazyDatasetId,
};
pub use lazy::{LazyAttrs, LazyDataset};
pub use loader::{LoadMode, LoadOptions, Loaded, SampleLoader};
pub use sample::{Sample, SampleId, Value};
pub use source::DataSource;
