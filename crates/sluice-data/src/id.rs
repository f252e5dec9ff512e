// ID-based lookup
//
// `IdIndex` is a small component holding the ID field name and an optional
// ID -> index map. `IdDataset<D>` composes it with any dataset and exposes the
// lookup through the `IdLookup` trait. The map is built once and is not
// invalidated if the wrapped data changes afterwards.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use sluice_core::{Error, Result};

use crate::cache::CacheDataset;
use crate::config::CacheConfig;
use crate::dataset::Dataset;
use crate::lazy::LazyDataset;
use crate::loader::{LoadOptions, SampleLoader};
use crate::sample::{Sample, SampleId};
use crate::source::DataSource;

/// ID field name plus an optional cached ID -> index map.
#[derive(Debug, Clone)]
pub struct IdIndex {
    id_key: String,
    cached: Option<Arc<HashMap<SampleId, usize>>>,
}

impl IdIndex {
    /// An index without a cache; every lookup scans the dataset.
    pub fn new(id_key: impl Into<String>) -> Self {
        Self {
            id_key: id_key.into(),
            cached: None,
        }
    }

    /// Scan `dataset` once and cache every ID.
    ///
    /// If an ID occurs more than once the first occurrence wins.
    pub fn build<D: Dataset + ?Sized>(id_key: impl Into<String>, dataset: &D) -> Result<Self> {
        let mut index = Self::new(id_key);
        index.rebuild(dataset)?;
        Ok(index)
    }

    /// Replace the cache with a fresh scan of `dataset`.
    pub fn rebuild<D: Dataset + ?Sized>(&mut self, dataset: &D) -> Result<()> {
        let mut map = HashMap::with_capacity(dataset.len());
        for idx in 0..dataset.len() {
            let id = dataset.get(idx)?.id(&self.id_key)?;
            match map.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(idx);
                }
                Entry::Occupied(first) => {
                    tracing::warn!(
                        id = %first.key(),
                        first = *first.get(),
                        duplicate = idx,
                        "duplicate sample ID, keeping the first occurrence"
                    );
                }
            }
        }
        self.cached = Some(Arc::new(map));
        Ok(())
    }

    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    /// Number of cached IDs, `None` without a cache.
    pub fn cached_len(&self) -> Option<usize> {
        self.cached.as_ref().map(|m| m.len())
    }

    /// Look `id` up in the cache if there is one, otherwise scan `dataset`.
    pub fn index_of<D: Dataset + ?Sized>(&self, dataset: &D, id: &SampleId) -> Result<usize> {
        match &self.cached {
            Some(map) => map.get(id).copied().ok_or_else(|| Error::id_not_found(id)),
            None => find_index_iterative(dataset, &self.id_key, id),
        }
    }
}

/// Linear scan for the first sample whose `id_key` field equals `id`.
pub fn find_index_iterative<D: Dataset + ?Sized>(
    dataset: &D,
    id_key: &str,
    id: &SampleId,
) -> Result<usize> {
    for idx in 0..dataset.len() {
        if dataset.get(idx)?.id(id_key)? == *id {
            return Ok(idx);
        }
    }
    Err(Error::id_not_found(id))
}

/// ID-based access to a dataset.
pub trait IdLookup: Dataset {
    /// Name of the sample field holding the identifier.
    fn id_key(&self) -> &str;

    /// Index of the sample carrying `id`.
    fn get_index_by_id(&self, id: impl Into<SampleId>) -> Result<usize>;

    /// Sample carrying `id`.
    fn get_sample_by_id(&self, id: impl Into<SampleId>) -> Result<Sample> {
        let idx = self.get_index_by_id(id)?;
        self.get(idx)
    }

    /// Build (or rebuild) the ID cache.
    fn cache_ids(&mut self) -> Result<()>;
}

/// Attributes of an [`IdDataset`]: the wrapped dataset's attributes plus the
/// ID index.
///
/// Subsets inherit `ids` unchanged, so it still maps IDs to *parent*
/// indices; resolving them against the subset returns the wrong samples. To
/// look up IDs inside a subset, wrap it again with
/// [`IdDataset::wrap`]`(subset, id_key, cache_ids)`.
#[derive(Debug, Clone)]
pub struct IdAttrs<A> {
    pub inner: A,
    pub ids: IdIndex,
}

/// Any dataset with ID lookup attached.
///
/// Loading behaviour is exactly that of the wrapped dataset.
#[derive(Debug)]
pub struct IdDataset<D> {
    inner: D,
    index: IdIndex,
}

pub type CacheDatasetId = IdDataset<CacheDataset>;
pub type LazyDatasetId = IdDataset<LazyDataset>;

impl<D: Dataset> IdDataset<D> {
    /// Attach ID lookup to `inner`, building the cache right away when
    /// `cache_ids` is set.
    pub fn wrap(inner: D, id_key: impl Into<String>, cache_ids: bool) -> Result<Self> {
        let index = if cache_ids {
            IdIndex::build(id_key, &inner)?
        } else {
            IdIndex::new(id_key)
        };
        Ok(Self { inner, index })
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }

    pub fn index(&self) -> &IdIndex {
        &self.index
    }
}

impl IdDataset<CacheDataset> {
    /// Cache all samples from `source`, then attach ID lookup.
    pub fn new<L>(
        source: impl Into<DataSource>,
        loader: L,
        id_key: impl Into<String>,
        cache_ids: bool,
        config: CacheConfig,
    ) -> Result<Self>
    where
        L: SampleLoader + 'static,
    {
        Self::wrap(CacheDataset::new(source, loader, config)?, id_key, cache_ids)
    }
}

impl IdDataset<LazyDataset> {
    /// Index the locations in `source`, then attach ID lookup.
    ///
    /// With `cache_ids` every sample is loaded once here to read its ID.
    pub fn new<L>(
        source: impl Into<DataSource>,
        loader: L,
        id_key: impl Into<String>,
        cache_ids: bool,
        options: LoadOptions,
    ) -> Result<Self>
    where
        L: SampleLoader + 'static,
    {
        Self::wrap(LazyDataset::new(source, loader, options)?, id_key, cache_ids)
    }

    pub fn paths(&self) -> &[PathBuf] {
        self.inner.paths()
    }
}

impl<D: Dataset> Dataset for IdDataset<D> {
    type Attrs = IdAttrs<D::Attrs>;

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        self.inner.get(index)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn attrs(&self) -> Self::Attrs {
        IdAttrs {
            inner: self.inner.attrs(),
            ids: self.index.clone(),
        }
    }
}

impl<D: Dataset> IdLookup for IdDataset<D> {
    fn id_key(&self) -> &str {
        self.index.id_key()
    }

    fn get_index_by_id(&self, id: impl Into<SampleId>) -> Result<usize> {
        self.index.index_of(&self.inner, &id.into())
    }

    fn cache_ids(&mut self) -> Result<()> {
        self.index.rebuild(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::loader::Loaded;

    fn stem_id(path: &Path, _: &LoadOptions) -> Result<Loaded> {
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Loaded::One(Sample::new().with("id", id)))
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn cached_and_linear_agree() {
        let src = paths(&["c", "a", "b"]);
        let cfg = CacheConfig::default().num_workers(0);
        let cached = CacheDatasetId::new(src.clone(), stem_id, "id", true, cfg.clone()).unwrap();
        let linear = CacheDatasetId::new(src, stem_id, "id", false, cfg).unwrap();
        assert!(cached.index().is_cached());
        assert!(!linear.index().is_cached());
        for id in ["a", "b", "c"] {
            assert_eq!(
                cached.get_index_by_id(id).unwrap(),
                linear.get_index_by_id(id).unwrap()
            );
        }
        assert_eq!(cached.get_index_by_id("b").unwrap(), 1);
    }

    #[test]
    fn missing_id() {
        let cfg = CacheConfig::default().num_workers(0);
        let cached = CacheDatasetId::new(paths(&["a"]), stem_id, "id", true, cfg.clone()).unwrap();
        let linear = CacheDatasetId::new(paths(&["a"]), stem_id, "id", false, cfg).unwrap();
        assert!(matches!(cached.get_index_by_id("zz"), Err(Error::IdNotFound { .. })));
        assert!(matches!(linear.get_index_by_id("zz"), Err(Error::IdNotFound { .. })));
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let loader = |_: &Path, _: &LoadOptions| -> Result<Loaded> {
            Ok(Loaded::One(Sample::new().with("id", 7i64)))
        };
        let cfg = CacheConfig::default().num_workers(0);
        let cached =
            CacheDatasetId::new(paths(&["x", "y"]), loader, "id", true, cfg.clone()).unwrap();
        let linear = CacheDatasetId::new(paths(&["x", "y"]), loader, "id", false, cfg).unwrap();
        assert_eq!(cached.get_index_by_id(7i64).unwrap(), 0);
        assert_eq!(linear.get_index_by_id(7i64).unwrap(), 0);
        assert_eq!(cached.index().cached_len(), Some(1));
    }

    #[test]
    fn lazy_sample_by_id() {
        let mut ds =
            LazyDatasetId::new(paths(&["q", "p"]), stem_id, "id", false, LoadOptions::new())
                .unwrap();
        let s = ds.get_sample_by_id("q").unwrap();
        assert_eq!(s.id("id").unwrap(), SampleId::from("q"));
        ds.cache_ids().unwrap();
        assert!(ds.index().is_cached());
        assert_eq!(ds.get_index_by_id("p").unwrap(), 0);
    }

    #[test]
    fn subset_carries_index_attr() {
        let cfg = CacheConfig::default().num_workers(0);
        let ds = CacheDatasetId::new(paths(&["a", "b", "c"]), stem_id, "id", true, cfg).unwrap();
        let sub = ds.get_subset(&[2, 0]).unwrap();
        assert_eq!(sub.attrs().ids.id_key(), "id");
        assert!(sub.attrs().ids.is_cached());
        // inherited index still answers in parent positions
        assert_eq!(sub.attrs().ids.index_of(&ds, &SampleId::from("a")).unwrap(), 0);

        // Re-attach lookup to resolve IDs against the subset's own indices.
        let sub_ids = IdDataset::wrap(sub, "id", true).unwrap();
        assert_eq!(sub_ids.get_index_by_id("a").unwrap(), 1);
    }
}
