// LazyDataset: keep locations, load on access

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use sluice_core::{Error, Result};

use crate::dataset::{index_checked, Dataset};
use crate::loader::{LoadOptions, Loaded, SampleLoader};
use crate::sample::Sample;
use crate::source::DataSource;

/// Everything a [`LazyDataset`] carries besides its locations.
#[derive(Clone)]
pub struct LazyAttrs {
    pub loader: Arc<dyn SampleLoader>,
    pub options: LoadOptions,
}

impl fmt::Debug for LazyAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyAttrs")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A dataset that stores sorted sample locations and calls the loader on
/// every access.
///
/// Nothing is cached: reading the same index twice loads it twice.
#[derive(Debug)]
pub struct LazyDataset {
    paths: Vec<PathBuf>,
    attrs: LazyAttrs,
}

impl LazyDataset {
    pub fn new<L>(source: impl Into<DataSource>, loader: L, options: LoadOptions) -> Result<Self>
    where
        L: SampleLoader + 'static,
    {
        Self::with_loader(source, Arc::new(loader), options)
    }

    pub fn with_loader(
        source: impl Into<DataSource>,
        loader: Arc<dyn SampleLoader>,
        options: LoadOptions,
    ) -> Result<Self> {
        let paths = source.into().resolve()?;
        tracing::debug!(locations = paths.len(), "lazy dataset indexed");
        Ok(Self {
            paths,
            attrs: LazyAttrs { loader, options },
        })
    }

    /// The sorted sample locations.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl Dataset for LazyDataset {
    type Attrs = LazyAttrs;

    fn len(&self) -> usize {
        self.paths.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let path = index_checked(&self.paths, index)?;
        match self.attrs.loader.load(path, &self.attrs.options)? {
            Loaded::One(sample) => Ok(sample),
            Loaded::Many(_) => Err(Error::config(format!(
                "lazy loading expects a single sample per location, loader returned several for {}",
                path.display()
            ))),
        }
    }

    fn name(&self) -> &str {
        "lazy"
    }

    fn attrs(&self) -> LazyAttrs {
        self.attrs.clone()
    }
}
