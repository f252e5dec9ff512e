// Intensity stages
//
// Random parameters are sampled once per call (and once per channel for the
// per-channel variants), then the same values are applied to every key.

use sluice_core::{Batch, DType, Device, Error, Result, Tensor};

use crate::context::Context;
use crate::functional::{self, NoiseKind};
use crate::params::{normal_dist, Param};
use crate::transform::{key_list, map_keys, stage_options, Transform};

fn default_keys() -> Vec<String> {
    key_list(["data"])
}

// Clamp

/// Clip values into `[min, max]`.
#[derive(Debug, Clone)]
pub struct Clamp {
    min: Param,
    max: Param,
    keys: Vec<String>,
    grad: bool,
}

impl Clamp {
    pub fn new(min: impl Into<Param>, max: impl Into<Param>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
            keys: default_keys(),
            grad: false,
        }
    }
}

stage_options!(Clamp);

impl Transform for Clamp {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        let min = self.min.sample(ctx.rng())?;
        let max = self.max.sample(ctx.rng())?;
        map_keys(batch, &self.keys, ctx, |t, _| functional::clamp(t, min, max))
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn name(&self) -> &str {
        "Clamp"
    }
}

// Normalisation

/// Rescale each sample (per channel by default) to `[min, max]`.
#[derive(Debug, Clone)]
pub struct NormRange {
    min: Param,
    max: Param,
    per_channel: bool,
    keys: Vec<String>,
    grad: bool,
}

impl NormRange {
    pub fn new(min: impl Into<Param>, max: impl Into<Param>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
            per_channel: true,
            keys: default_keys(),
            grad: false,
        }
    }

    pub fn per_channel(mut self, per_channel: bool) -> Self {
        self.per_channel = per_channel;
        self
    }
}

stage_options!(NormRange);

impl Transform for NormRange {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        let min = self.min.sample(ctx.rng())?;
        let max = self.max.sample(ctx.rng())?;
        map_keys(batch, &self.keys, ctx, |t, _| {
            functional::norm_range(t, min, max, self.per_channel)
        })
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn name(&self) -> &str {
        "NormRange"
    }
}

/// Rescale each sample (per channel by default) to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct NormMinMax {
    per_channel: bool,
    keys: Vec<String>,
    grad: bool,
}

impl NormMinMax {
    pub fn new() -> Self {
        Self {
            per_channel: true,
            keys: default_keys(),
            grad: false,
        }
    }

    pub fn per_channel(mut self, per_channel: bool) -> Self {
        self.per_channel = per_channel;
        self
    }
}

impl Default for NormMinMax {
    fn default() -> Self {
        Self::new()
    }
}

stage_options!(NormMinMax);

impl Transform for NormMinMax {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        map_keys(batch, &self.keys, ctx, |t, _| {
            functional::norm_min_max(t, self.per_channel)
        })
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn name(&self) -> &str {
        "NormMinMax"
    }
}

/// Standardise each sample (per channel by default).
#[derive(Debug, Clone)]
pub struct NormZeroMeanUnitStd {
    per_channel: bool,
    keys: Vec<String>,
    grad: bool,
}

impl NormZeroMeanUnitStd {
    pub fn new() -> Self {
        Self {
            per_channel: true,
            keys: default_keys(),
            grad: false,
        }
    }

    pub fn per_channel(mut self, per_channel: bool) -> Self {
        self.per_channel = per_channel;
        self
    }
}

impl Default for NormZeroMeanUnitStd {
    fn default() -> Self {
        Self::new()
    }
}

stage_options!(NormZeroMeanUnitStd);

impl Transform for NormZeroMeanUnitStd {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        map_keys(batch, &self.keys, ctx, |t, _| {
            functional::norm_zero_mean_unit_std(t, self.per_channel)
        })
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn name(&self) -> &str {
        "NormZeroMeanUnitStd"
    }
}

/// Normalise with fixed statistics: `(x - mean) / std`.
///
/// `mean` and `std` are owned buffers (one value, or one per channel) and
/// follow [`Transform::to_device`] / [`Transform::to_dtype`].
#[derive(Debug, Clone)]
pub struct NormMeanStd {
    mean: Tensor,
    std: Tensor,
    keys: Vec<String>,
    grad: bool,
}

impl NormMeanStd {
    pub fn new(mean: &[f64], std: &[f64]) -> Result<Self> {
        if mean.is_empty() || mean.len() != std.len() {
            return Err(Error::config(format!(
                "NormMeanStd: mean ({}) and std ({}) need the same, non-zero length",
                mean.len(),
                std.len()
            )));
        }
        Ok(Self {
            mean: Tensor::new(mean.to_vec(), [mean.len()], DType::F32, Device::Cpu)?,
            std: Tensor::new(std.to_vec(), [std.len()], DType::F32, Device::Cpu)?,
            keys: default_keys(),
            grad: false,
        })
    }

    pub fn mean(&self) -> &Tensor {
        &self.mean
    }

    pub fn std(&self) -> &Tensor {
        &self.std
    }
}

stage_options!(NormMeanStd);

impl Transform for NormMeanStd {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        map_keys(batch, &self.keys, ctx, |t, _| {
            functional::norm_mean_std(t, &self.mean, &self.std)
        })
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn visit_buffers_mut(&mut self, f: &mut dyn FnMut(&mut Tensor) -> Result<()>) -> Result<()> {
        f(&mut self.mean)?;
        f(&mut self.std)
    }

    fn name(&self) -> &str {
        "NormMeanStd"
    }
}

// Noise

/// Add random noise, drawn fresh for every call.
#[derive(Debug, Clone)]
pub struct Noise {
    kind: NoiseKind,
    keys: Vec<String>,
    grad: bool,
}

impl Noise {
    pub fn new(kind: NoiseKind) -> Result<Self> {
        match kind {
            NoiseKind::Gaussian { mean, std } => {
                normal_dist(mean, std, "gaussian noise")?;
            }
            NoiseKind::Exponential { lambda } => {
                if !(lambda.is_finite() && lambda > 0.0) {
                    return Err(Error::config(format!(
                        "exponential noise needs a finite lambda > 0, got {lambda}"
                    )));
                }
            }
        }
        Ok(Self {
            kind,
            keys: default_keys(),
            grad: false,
        })
    }

    pub fn gaussian(mean: f64, std: f64) -> Result<Self> {
        Self::new(NoiseKind::Gaussian { mean, std })
    }

    pub fn exponential(lambda: f64) -> Result<Self> {
        Self::new(NoiseKind::Exponential { lambda })
    }

    pub fn kind(&self) -> NoiseKind {
        self.kind
    }
}

stage_options!(Noise);

impl Transform for Noise {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        map_keys(batch, &self.keys, ctx, |t, ctx| {
            functional::add_noise(t, self.kind, ctx.rng())
        })
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn name(&self) -> &str {
        "Noise"
    }
}

// Gamma

/// `x ^ gamma` with a possibly random gamma.
#[derive(Debug, Clone)]
pub struct GammaCorrection {
    gamma: Param,
    keys: Vec<String>,
    grad: bool,
}

impl GammaCorrection {
    pub fn new(gamma: impl Into<Param>) -> Self {
        Self {
            gamma: gamma.into(),
            keys: default_keys(),
            grad: false,
        }
    }
}

stage_options!(GammaCorrection);

impl Transform for GammaCorrection {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        let gamma = self.gamma.sample(ctx.rng())?;
        map_keys(batch, &self.keys, ctx, |t, _| {
            Ok(functional::gamma_correction(t, gamma))
        })
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn name(&self) -> &str {
        "GammaCorrection"
    }
}

// Random value per channel

/// How [`RandomValuePerChannel`] combines the sampled value with the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOp {
    Add,
    Scale,
}

impl ValueOp {
    fn apply(self, t: &Tensor, value: f64) -> Tensor {
        match self {
            ValueOp::Add => functional::add_value(t, value),
            ValueOp::Scale => functional::scale_by_value(t, value),
        }
    }
}

/// Add or multiply a random value, sampled once per call or once per
/// channel.
#[derive(Debug, Clone)]
pub struct RandomValuePerChannel {
    op: ValueOp,
    value: Param,
    per_channel: bool,
    keys: Vec<String>,
    grad: bool,
}

impl RandomValuePerChannel {
    pub fn new(op: ValueOp, value: impl Into<Param>) -> Self {
        Self {
            op,
            value: value.into(),
            per_channel: false,
            keys: default_keys(),
            grad: false,
        }
    }

    /// Add a random offset.
    pub fn add(value: impl Into<Param>) -> Self {
        Self::new(ValueOp::Add, value)
    }

    /// Multiply by a random factor.
    pub fn scale(value: impl Into<Param>) -> Self {
        Self::new(ValueOp::Scale, value)
    }

    pub fn per_channel(mut self, per_channel: bool) -> Self {
        self.per_channel = per_channel;
        self
    }
}

stage_options!(RandomValuePerChannel);

impl Transform for RandomValuePerChannel {
    fn forward(&self, batch: Batch, ctx: &mut Context) -> Result<Batch> {
        if !self.per_channel {
            let value = self.value.sample(ctx.rng())?;
            return map_keys(batch, &self.keys, ctx, |t, _| Ok(self.op.apply(t, value)));
        }
        // one draw per channel, shared by every key
        let channels = self
            .keys
            .iter()
            .filter_map(|k| batch.get(k))
            .map(|t| t.dims().get(1).copied().unwrap_or(1))
            .max()
            .unwrap_or(0);
        let values = self.value.sample_n(channels, ctx.rng())?;
        map_keys(batch, &self.keys, ctx, |t, _| {
            functional::per_channel(t, |c, x| Ok(self.op.apply(x, values[c])))
        })
    }

    fn grad(&self) -> bool {
        self.grad
    }

    fn name(&self) -> &str {
        "RandomValuePerChannel"
    }
}
