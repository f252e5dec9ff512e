// Spatial stages

use sluice_core::{Batch, Result};

use crate::context::Context;
use crate::functional;
use crate::transform::{key_list, map_keys, stage_options, Transform};

/// Flip the configured fields along spatial dimensions.
///
/// Dimension `0` is the first axis after `[batch, channel]`. Mirroring twice
/// along the same dimensions restores the input.
#[derive(Debug, Clone)]
pub struct Mirror {
    dims: Vec<usize>,
    keys: Vec<String>,
    grad: bool,
}

impl Mirror {
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: dims.to_vec(),
            keys: key_list(["data"]),
            grad: false,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }
}

stage_options!(Mirror);

impl Transform for Mirror {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        map_keys(batch, &self.keys, ctx, |t, _| functional::mirror(t, &self.dims))
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn name(&self) -> &str {
        "Mirror"
    }
}
