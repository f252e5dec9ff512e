// Channel stages

use sluice_core::{Batch, DType, Result};

use crate::context::Context;
use crate::functional;
use crate::transform::{key_list, map_keys, stage_options, Transform};

/// One-hot encode label maps, `"seg"` by default.
#[derive(Debug, Clone)]
pub struct OneHot {
    num_classes: Option<usize>,
    dtype: Option<DType>,
    keys: Vec<String>,
    grad: bool,
}

impl OneHot {
    /// Fixed number of classes.
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes: Some(num_classes),
            dtype: None,
            keys: key_list(["seg"]),
            grad: false,
        }
    }

    /// Number of classes taken from the largest label in each call.
    pub fn inferred() -> Self {
        Self {
            num_classes: None,
            ..Self::new(0)
        }
    }

    /// Output dtype; defaults to the input's.
    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }
}

stage_options!(OneHot);

impl Transform for OneHot {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        map_keys(batch, &self.keys, ctx, |t, _| {
            functional::one_hot(t, self.num_classes, self.dtype)
        })
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn name(&self) -> &str {
        "OneHot"
    }
}
