// Dataset trait: unified interface for every loading strategy

use sluice_core::{Error, Result};

use crate::combinators::SubsetDataset;
use crate::sample::Sample;

/// Item-access logic a [`SubsetDataset`] inherits from the dataset it was cut from.
///
/// It receives the subset itself (not the parent) together with the index.
pub type ItemAccess<A> = fn(&SubsetDataset<A>, usize) -> Result<Sample>;

/// An indexed collection of samples.
///
/// Besides its samples every dataset carries a declared attribute struct
/// (`Attrs`): loader, load options, ID cache and whatever else shapes how it
/// behaves. [`Dataset::get_subset`] hands that struct to the subset so the
/// derived dataset keeps the parent's configuration while owning different
/// samples.
///
/// Implementations must be `Send + Sync` so loaders and training code can read
/// from multiple threads.
pub trait Dataset: Send + Sync {
    /// Auxiliary state copied into subsets. Cloning must share, not deep-copy,
    /// anything expensive (loaders, ID caches).
    type Attrs: Clone + Send + Sync + 'static;

    /// Total number of samples in the dataset.
    fn len(&self) -> usize;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve the sample at position `index`.
    ///
    /// Fails with [`Error::IndexOutOfRange`] past the end; loader failures of
    /// lazy datasets propagate unchanged.
    fn get(&self, index: usize) -> Result<Sample>;

    /// Optional human-readable name.
    fn name(&self) -> &str {
        "dataset"
    }

    /// Every attribute except the sample container.
    fn attrs(&self) -> Self::Attrs;

    /// How a subset of this dataset resolves an index to a sample.
    fn item_access(&self) -> ItemAccess<Self::Attrs> {
        stored_sample::<Self::Attrs>
    }

    /// A new dataset whose `i`-th sample is `self.get(indices[i])`.
    ///
    /// The samples are resolved once, here, through this dataset's own
    /// `get`. The parent is left untouched.
    fn get_subset(&self, indices: &[usize]) -> Result<SubsetDataset<Self::Attrs>> {
        let data = indices
            .iter()
            .map(|&idx| self.get(idx))
            .collect::<Result<Vec<_>>>()?;
        Ok(SubsetDataset::new(data, self.item_access(), self.attrs()))
    }

    /// Iterate over all samples in index order.
    fn iter(&self) -> DatasetIter<'_, Self>
    where
        Self: Sized,
    {
        DatasetIter {
            dataset: self,
            pos: 0,
        }
    }
}

/// Default item access: return the sample the subset already holds.
pub fn stored_sample<A>(subset: &SubsetDataset<A>, index: usize) -> Result<Sample> {
    subset.sample(index).cloned()
}

/// Bounds-checked lookup shared by the in-memory datasets.
pub(crate) fn index_checked<T>(items: &[T], index: usize) -> Result<&T> {
    items.get(index).ok_or(Error::IndexOutOfRange {
        index,
        len: items.len(),
    })
}

/// Iterator over a dataset's samples, see [`Dataset::iter`].
pub struct DatasetIter<'a, D> {
    dataset: &'a D,
    pos: usize,
}

impl<D: Dataset> Iterator for DatasetIter<'_, D> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.dataset.len() {
            return None;
        }
        let item = self.dataset.get(self.pos);
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.dataset.len().saturating_sub(self.pos);
        (rest, Some(rest))
    }
}

impl<D: Dataset> ExactSizeIterator for DatasetIter<'_, D> {}
