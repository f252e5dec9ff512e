// Dataset combinators: subsets and splits

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use sluice_core::{Error, Result};

use crate::dataset::{index_checked, Dataset, ItemAccess};
use crate::sample::Sample;

// SubsetDataset: materialized selection of a parent's samples

/// A dataset holding a pre-extracted selection of another dataset's samples.
///
/// The samples were resolved through the parent's `get` when the subset was
/// built. Item access afterwards goes through the access logic inherited from
/// the parent, applied to the subset itself, and the parent's attributes
/// (loader, options, ID cache, ...) are carried along unchanged.
pub struct SubsetDataset<A> {
    data: Vec<Sample>,
    old_getitem: ItemAccess<A>,
    attrs: A,
}

impl<A> SubsetDataset<A> {
    pub fn new(data: Vec<Sample>, old_getitem: ItemAccess<A>, attrs: A) -> Self {
        Self {
            data,
            old_getitem,
            attrs,
        }
    }

    /// The materialized samples.
    pub fn data(&self) -> &[Sample] {
        &self.data
    }

    /// Borrow the stored sample at `index`.
    pub fn sample(&self, index: usize) -> Result<&Sample> {
        index_checked(&self.data, index)
    }

    /// Attributes inherited from the parent.
    pub fn attrs(&self) -> &A {
        &self.attrs
    }
}

impl<A> std::fmt::Debug for SubsetDataset<A>
where
    A: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsetDataset")
            .field("len", &self.data.len())
            .field("attrs", &self.attrs)
            .finish()
    }
}

impl<A> Dataset for SubsetDataset<A>
where
    A: Clone + Send + Sync + 'static,
{
    type Attrs = A;

    fn len(&self) -> usize {
        self.data.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        (self.old_getitem)(self, index)
    }

    fn name(&self) -> &str {
        "subset"
    }

    fn attrs(&self) -> A {
        self.attrs.clone()
    }

    fn item_access(&self) -> ItemAccess<A> {
        self.old_getitem
    }
}

// Train / validation / test split

/// Split a dataset into 2 or 3 subsets with the given ratios.
///
/// Indices are shuffled with a seeded generator, so the same seed always
/// yields the same split. The last subset takes the rounding remainder.
///
/// # Arguments
/// * `dataset`: the source dataset
/// * `ratios`: 2 or 3 floats summing to 1.0, e.g. `[0.8, 0.2]`
/// * `seed`: random seed for reproducible shuffling of indices
pub fn train_test_split<D: Dataset>(
    dataset: &D,
    ratios: &[f64],
    seed: u64,
) -> Result<Vec<SubsetDataset<D::Attrs>>> {
    if !(2..=3).contains(&ratios.len()) {
        return Err(Error::config("train_test_split: ratios must have 2 or 3 elements"));
    }
    let sum: f64 = ratios.iter().sum();
    if (sum - 1.0).abs() > 1e-6 || ratios.iter().any(|r| *r < 0.0) {
        return Err(Error::config(format!(
            "train_test_split: ratios must be non-negative and sum to 1.0, got {sum}"
        )));
    }

    let n = dataset.len();
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut splits = Vec::with_capacity(ratios.len());
    let mut offset = 0;
    for (i, &ratio) in ratios.iter().enumerate() {
        let count = if i == ratios.len() - 1 {
            n - offset
        } else {
            (n as f64 * ratio).round() as usize
        };
        let end = (offset + count).min(n);
        splits.push(dataset.get_subset(&indices[offset..end])?);
        offset = end;
    }

    Ok(splits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Value;

    /// Tiny in-memory dataset for testing.
    struct TinyDataset {
        n: usize,
        tag: &'static str,
    }

    impl Dataset for TinyDataset {
        type Attrs = &'static str;

        fn len(&self) -> usize {
            self.n
        }

        fn get(&self, idx: usize) -> Result<Sample> {
            if idx >= self.n {
                return Err(Error::IndexOutOfRange {
                    index: idx,
                    len: self.n,
                });
            }
            Ok(Sample::new().with("idx", idx as i64))
        }

        fn attrs(&self) -> &'static str {
            self.tag
        }
    }

    fn idx_of(sample: &Sample) -> i64 {
        match sample.get("idx") {
            Some(Value::Int(v)) => *v,
            other => panic!("unexpected idx field {other:?}"),
        }
    }

    #[test]
    fn subset_dataset() {
        let ds = TinyDataset { n: 10, tag: "tiny" };
        let sub = ds.get_subset(&[2, 5, 7]).unwrap();
        assert_eq!(sub.len(), 3);
        assert_eq!(idx_of(&sub.get(0).unwrap()), 2);
        assert_eq!(idx_of(&sub.get(1).unwrap()), 5);
        assert_eq!(idx_of(&sub.get(2).unwrap()), 7);
        assert_eq!(*sub.attrs(), "tiny");
    }

    #[test]
    fn subset_of_subset() {
        let ds = TinyDataset { n: 10, tag: "tiny" };
        let sub = ds.get_subset(&[9, 8, 7, 6]).unwrap();
        let subsub = sub.get_subset(&[3, 0]).unwrap();
        assert_eq!(idx_of(&subsub.get(0).unwrap()), 6);
        assert_eq!(idx_of(&subsub.get(1).unwrap()), 9);
        assert_eq!(*subsub.attrs(), "tiny");
    }

    #[test]
    fn subset_out_of_range_propagates_parent_error() {
        let ds = TinyDataset { n: 3, tag: "tiny" };
        let err = ds.get_subset(&[0, 3]).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 3, len: 3 }));
        let sub = ds.get_subset(&[1]).unwrap();
        assert!(matches!(sub.get(1), Err(Error::IndexOutOfRange { index: 1, len: 1 })));
    }

    #[test]
    fn train_test_split_two_way() {
        let ds = TinyDataset { n: 100, tag: "tiny" };
        let splits = train_test_split(&ds, &[0.8, 0.2], 42).unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].len(), 80);
        assert_eq!(splits[1].len(), 20);
    }

    #[test]
    fn train_test_split_three_way_covers_everything() {
        let ds = TinyDataset { n: 100, tag: "tiny" };
        let splits = train_test_split(&ds, &[0.7, 0.15, 0.15], 42).unwrap();
        let mut seen: Vec<i64> = splits
            .iter()
            .flat_map(|s| s.data().iter().map(idx_of))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn train_test_split_reproducible() {
        let ds = TinyDataset { n: 50, tag: "tiny" };
        let s1 = train_test_split(&ds, &[0.8, 0.2], 123).unwrap();
        let s2 = train_test_split(&ds, &[0.8, 0.2], 123).unwrap();
        assert_eq!(s1[0].data(), s2[0].data());
    }

    #[test]
    fn train_test_split_rejects_bad_ratios() {
        let ds = TinyDataset { n: 10, tag: "tiny" };
        assert!(train_test_split(&ds, &[1.0], 0).unwrap_err().is_config());
        assert!(train_test_split(&ds, &[0.5, 0.6], 0).unwrap_err().is_config());
    }
}
