// Collation: samples -> batch

use sluice_core::{Batch, Error, Result, Tensor};

use crate::sample::Sample;

/// Stack the tensor fields `keys` of `samples` along a new leading batch
/// dimension.
///
/// Every sample must carry every key as a tensor of the same shape. Non-tensor
/// fields (IDs, labels stored as text) are not collated.
pub fn collate(samples: &[Sample], keys: &[&str]) -> Result<Batch> {
    if samples.is_empty() {
        return Err(Error::msg("collate: need at least one sample"));
    }
    let mut batch = Batch::with_capacity(keys.len());
    for &key in keys {
        let parts = samples
            .iter()
            .map(|s| s.tensor(key).cloned())
            .collect::<Result<Vec<_>>>()?;
        batch.insert(key.to_string(), Tensor::stack(&parts, 0)?);
    }
    Ok(batch)
}

/// Collate every tensor field present in the first sample.
pub fn collate_all(samples: &[Sample]) -> Result<Batch> {
    let first = samples
        .first()
        .ok_or_else(|| Error::msg("collate: need at least one sample"))?;
    let keys: Vec<&str> = first
        .iter()
        .filter(|(_, v)| v.as_tensor().is_some())
        .map(|(k, _)| k)
        .collect();
    collate(samples, &keys)
}
