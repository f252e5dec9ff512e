// CacheDataset: load everything up front
//
// Every location is loaded once at construction (sequentially or on a rayon
// pool) and the samples are kept in memory. The dataset is immutable after
// construction.

use std::fmt;
use std::sync::Arc;

use sluice_core::Result;

use crate::config::{CacheConfig, LoadPlan};
use crate::dataset::{index_checked, Dataset};
use crate::loader::{load_parallel, load_sequential, LoadMode, LoadOptions, SampleLoader};
use crate::sample::Sample;
use crate::source::DataSource;

/// Everything a [`CacheDataset`] carries besides its samples.
#[derive(Clone)]
pub struct CacheAttrs {
    pub loader: Arc<dyn SampleLoader>,
    pub mode: LoadMode,
    pub num_workers: Option<usize>,
    pub verbose: bool,
    pub options: LoadOptions,
}

impl fmt::Debug for CacheAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAttrs")
            .field("mode", &self.mode)
            .field("num_workers", &self.num_workers)
            .field("verbose", &self.verbose)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A dataset that materializes every sample at construction time.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use sluice_data::{CacheConfig, CacheDataset, Dataset, LoadOptions, Loaded, Sample};
///
/// fn load(path: &Path, _: &LoadOptions) -> sluice_core::Result<Loaded> {
///     Ok(Loaded::One(Sample::new().with("name", path.display().to_string())))
/// }
///
/// let ds = CacheDataset::new("data/train", load, CacheConfig::default()).unwrap();
/// println!("{} samples", ds.len());
/// ```
#[derive(Debug)]
pub struct CacheDataset {
    data: Vec<Sample>,
    attrs: CacheAttrs,
}

impl CacheDataset {
    /// Resolve `source`, load every location and merge the results per
    /// `config.mode`.
    ///
    /// Fails with a configuration error for a non-directory source or a
    /// loader output that does not fit the mode; loader failures propagate.
    pub fn new<L>(source: impl Into<DataSource>, loader: L, config: CacheConfig) -> Result<Self>
    where
        L: SampleLoader + 'static,
    {
        Self::with_loader(source, Arc::new(loader), config)
    }

    /// Like [`CacheDataset::new`] with an already shared loader.
    pub fn with_loader(
        source: impl Into<DataSource>,
        loader: Arc<dyn SampleLoader>,
        config: CacheConfig,
    ) -> Result<Self> {
        let paths = source.into().resolve()?;
        let plan = config.plan();
        let loaded = match plan {
            LoadPlan::Sequential { verbose } => {
                load_sequential(&paths, loader.as_ref(), &config.options, verbose)?
            }
            LoadPlan::Parallel { num_workers } => {
                load_parallel(&paths, loader.as_ref(), &config.options, num_workers)?
            }
        };

        let mut data = Vec::with_capacity(loaded.len());
        for (item, path) in loaded.into_iter().zip(&paths) {
            config.mode.add_item(&mut data, item, path)?;
        }
        tracing::debug!(
            locations = paths.len(),
            samples = data.len(),
            mode = %config.mode,
            "cache dataset built"
        );

        let (num_workers, verbose) = match plan {
            LoadPlan::Sequential { verbose } => (Some(0), verbose),
            LoadPlan::Parallel { num_workers } => (num_workers, false),
        };
        Ok(Self {
            data,
            attrs: CacheAttrs {
                loader,
                mode: config.mode,
                num_workers,
                verbose,
                options: config.options,
            },
        })
    }

    /// The materialized samples.
    pub fn data(&self) -> &[Sample] {
        &self.data
    }

    pub fn mode(&self) -> LoadMode {
        self.attrs.mode
    }
}

impl Dataset for CacheDataset {
    type Attrs = CacheAttrs;

    fn len(&self) -> usize {
        self.data.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        index_checked(&self.data, index).cloned()
    }

    fn name(&self) -> &str {
        "cache"
    }

    fn attrs(&self) -> CacheAttrs {
        self.attrs.clone()
    }
}
