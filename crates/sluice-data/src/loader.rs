// Sample loading: the loader contract, keyword options, merge modes and the
// sequential / parallel load drivers used by the cached datasets.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rayon::prelude::*;

use sluice_core::{Error, Result};

use crate::sample::{Sample, Value};

/// What a loader produced for one location.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// A single sample.
    One(Sample),
    /// Several samples from one location (e.g. the slices of a volume).
    Many(Vec<Sample>),
}

impl From<Sample> for Loaded {
    fn from(s: Sample) -> Self {
        Loaded::One(s)
    }
}

impl From<Vec<Sample>> for Loaded {
    fn from(v: Vec<Sample>) -> Self {
        Loaded::Many(v)
    }
}

/// Keyword options forwarded to every loader call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOptions {
    entries: BTreeMap<String, Value>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Maps a location to sample data.
///
/// Loaders are dispatched across worker threads during cache construction and
/// may be called concurrently by lazy datasets, so they must not rely on
/// shared mutable state.
///
/// Any `Fn(&Path, &LoadOptions) -> Result<Loaded>` closure or function is a
/// loader.
pub trait SampleLoader: Send + Sync {
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Loaded>;
}

impl<F> SampleLoader for F
where
    F: Fn(&Path, &LoadOptions) -> Result<Loaded> + Send + Sync,
{
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Loaded> {
        self(path, options)
    }
}

/// How loaded units are merged into a cached dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Every loaded unit becomes one entry.
    #[default]
    Append,
    /// Every loaded unit is a collection that is flattened into the dataset.
    Extend,
}

impl LoadMode {
    /// Merge `item` (loaded from `path`) into `data`.
    pub fn add_item(self, data: &mut Vec<Sample>, item: Loaded, path: &Path) -> Result<()> {
        match (self, item) {
            (LoadMode::Append, Loaded::One(sample)) => data.push(sample),
            (LoadMode::Extend, Loaded::Many(samples)) => data.extend(samples),
            (LoadMode::Append, Loaded::Many(_)) => {
                return Err(Error::config(format!(
                    "append mode expects a single sample, loader returned several for {}",
                    path.display()
                )))
            }
            (LoadMode::Extend, Loaded::One(_)) => {
                return Err(Error::config(format!(
                    "extend mode expects a collection of samples, loader returned one for {}",
                    path.display()
                )))
            }
        }
        Ok(())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadMode::Append => "append",
            LoadMode::Extend => "extend",
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "append" => Ok(LoadMode::Append),
            "extend" => Ok(LoadMode::Extend),
            other => Err(Error::config(format!(
                "unknown load mode '{other}', expected 'append' or 'extend'"
            ))),
        }
    }
}

/// Load every path on the calling thread, optionally reporting progress.
pub(crate) fn load_sequential(
    paths: &[PathBuf],
    loader: &dyn SampleLoader,
    options: &LoadOptions,
    verbose: bool,
) -> Result<Vec<Loaded>> {
    let n = paths.len();
    let mut loaded = Vec::with_capacity(n);
    for (i, path) in paths.iter().enumerate() {
        if verbose {
            tracing::info!("Loading Samples {}/{}", i + 1, n);
        }
        loaded.push(loader.load(path, options)?);
    }
    Ok(loaded)
}

/// Load every path on a dedicated rayon pool.
///
/// `num_workers = None` sizes the pool to the number of logical cores. Results
/// come back in input order; the first failure aborts the whole load.
pub(crate) fn load_parallel(
    paths: &[PathBuf],
    loader: &dyn SampleLoader,
    options: &LoadOptions,
    num_workers: Option<usize>,
) -> Result<Vec<Loaded>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_workers.unwrap_or(0))
        .build()
        .map_err(|e| Error::config_with_source("failed to build loader thread pool", e))?;
    tracing::debug!(
        workers = pool.current_num_threads(),
        samples = paths.len(),
        "loading samples in parallel"
    );
    pool.install(|| {
        paths
            .par_iter()
            .map(|path| loader.load(path, options))
            .collect::<Result<Vec<_>>>()
    })
}
