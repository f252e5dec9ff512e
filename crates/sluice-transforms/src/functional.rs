// Functional kernels: (tensor, parameters) -> tensor
//
// Batched tensors are laid out as [batch, channel, *spatial]. Spatial
// dimension indices passed to these functions count from the first spatial
// axis, so `dims = [0]` is the axis right after the channel axis.
//
// These are plain reference implementations; the stage types in this crate
// are thin wrappers that sample parameters and pick keys.

use rand::Rng;
use rand_distr::{Distribution, Exp};

use sluice_core::{DType, Error, Result, Tensor};

use crate::params::normal_dist;

/// Number of leading non-spatial axes (batch, channel).
const LEADING_DIMS: usize = 2;

fn check_batched(t: &Tensor, what: &str) -> Result<()> {
    if t.rank() < LEADING_DIMS {
        return Err(Error::msg(format!(
            "{what}: expected a [batch, channel, ...] tensor, got shape {}",
            t.shape()
        )));
    }
    Ok(())
}

/// Apply `f` to each sample of the batch.
pub fn per_sample<F>(t: &Tensor, mut f: F) -> Result<Tensor>
where
    F: FnMut(&Tensor) -> Result<Tensor>,
{
    check_batched(t, "per_sample")?;
    t.map_slices(0, |_, sample| f(sample))
}

/// Apply `f` to each `[spatial...]` slice, passing the channel index.
pub fn per_channel<F>(t: &Tensor, mut f: F) -> Result<Tensor>
where
    F: FnMut(usize, &Tensor) -> Result<Tensor>,
{
    check_batched(t, "per_channel")?;
    t.map_slices(0, |_, sample| sample.map_slices(0, |c, channel| f(c, channel)))
}

// Spatial

/// Reverse `t` along the given spatial dimensions.
pub fn mirror(t: &Tensor, dims: &[usize]) -> Result<Tensor> {
    check_batched(t, "mirror")?;
    let axes: Vec<usize> = dims.iter().map(|d| d + LEADING_DIMS).collect();
    t.flip(&axes)
}

// Intensity

/// Clip every value into `[min, max]`.
pub fn clamp(t: &Tensor, min: f64, max: f64) -> Result<Tensor> {
    if min > max {
        return Err(Error::config(format!("clamp: min {min} exceeds max {max}")));
    }
    Ok(t.map(|v| v.clamp(min, max)))
}

fn min_max(t: &Tensor) -> Tensor {
    let (lo, hi) = (t.min(), t.max());
    let range = hi - lo;
    if range > 0.0 {
        t.map(|v| (v - lo) / range)
    } else {
        t.map(|_| 0.0)
    }
}

/// Linearly rescale every sample (or every channel of every sample) to
/// `[0, 1]`. Constant input maps to zeros.
pub fn norm_min_max(t: &Tensor, per_channel_stats: bool) -> Result<Tensor> {
    if per_channel_stats {
        per_channel(t, |_, c| Ok(min_max(c)))
    } else {
        per_sample(t, |x| Ok(min_max(x)))
    }
}

/// Linearly rescale every sample (or channel) to `[min, max]`.
pub fn norm_range(t: &Tensor, min: f64, max: f64, per_channel_stats: bool) -> Result<Tensor> {
    if min > max {
        return Err(Error::config(format!(
            "norm_range: min {min} exceeds max {max}"
        )));
    }
    let unit = norm_min_max(t, per_channel_stats)?;
    Ok(unit.map(|v| v * (max - min) + min))
}

fn zero_mean_unit_std(t: &Tensor) -> Tensor {
    let (mean, std) = (t.mean(), t.std());
    if std > 0.0 {
        t.map(|v| (v - mean) / std)
    } else {
        t.map(|v| v - mean)
    }
}

/// Shift every sample (or channel) to zero mean and scale it to unit
/// standard deviation.
///
/// A zero standard deviation only subtracts the mean.
pub fn norm_zero_mean_unit_std(t: &Tensor, per_channel_stats: bool) -> Result<Tensor> {
    if per_channel_stats {
        per_channel(t, |_, c| Ok(zero_mean_unit_std(c)))
    } else {
        per_sample(t, |x| Ok(zero_mean_unit_std(x)))
    }
}

/// `(t - mean) / std` with given statistics.
///
/// `mean` and `std` hold either one value (applied everywhere) or one value
/// per channel.
pub fn norm_mean_std(t: &Tensor, mean: &Tensor, std: &Tensor) -> Result<Tensor> {
    check_batched(t, "norm_mean_std")?;
    let channels = t.dims()[1];
    let pick = |stats: &Tensor, name: &str| -> Result<Vec<f64>> {
        match stats.elem_count() {
            1 => Ok(vec![stats.data()[0]; channels]),
            n if n == channels => Ok(stats.data().to_vec()),
            n => Err(Error::config(format!(
                "norm_mean_std: {name} has {n} values for {channels} channels"
            ))),
        }
    };
    let means = pick(mean, "mean")?;
    let stds = pick(std, "std")?;
    if stds.iter().any(|s| *s == 0.0) {
        return Err(Error::config("norm_mean_std: std must be non-zero"));
    }
    per_channel(t, |c, x| Ok(x.map(|v| (v - means[c]) / stds[c])))
}

/// Noise distribution for [`add_noise`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoiseKind {
    Gaussian { mean: f64, std: f64 },
    Exponential { lambda: f64 },
}

/// Add element-wise random noise.
pub fn add_noise<R: Rng + ?Sized>(t: &Tensor, kind: NoiseKind, rng: &mut R) -> Result<Tensor> {
    let noise: Vec<f64> = match kind {
        NoiseKind::Gaussian { mean, std } => {
            let dist = normal_dist(mean, std, "gaussian noise")?;
            (0..t.elem_count()).map(|_| dist.sample(rng)).collect()
        }
        NoiseKind::Exponential { lambda } => {
            let dist = Exp::new(lambda)
                .map_err(|e| Error::config_with_source("invalid exponential noise", e))?;
            (0..t.elem_count()).map(|_| dist.sample(rng)).collect()
        }
    };
    let noise = Tensor::new(noise, t.shape().clone(), DType::F64, t.device())?;
    t.zip_map(&noise, |v, n| v + n)
}

/// `t ^ gamma`, element-wise.
pub fn gamma_correction(t: &Tensor, gamma: f64) -> Tensor {
    t.map(|v| v.powf(gamma))
}

pub fn add_value(t: &Tensor, value: f64) -> Tensor {
    t.map(|v| v + value)
}

pub fn scale_by_value(t: &Tensor, value: f64) -> Tensor {
    t.map(|v| v * value)
}

// Channel

/// One-hot encode a `[batch, 1, *spatial]` label map into
/// `[batch, num_classes, *spatial]`.
///
/// `num_classes = None` uses the largest label plus one. The result keeps the
/// input dtype unless `dtype` is given.
pub fn one_hot(t: &Tensor, num_classes: Option<usize>, dtype: Option<DType>) -> Result<Tensor> {
    check_batched(t, "one_hot")?;
    if t.dims()[1] != 1 {
        return Err(Error::msg(format!(
            "one_hot: expected a single label channel, got shape {}",
            t.shape()
        )));
    }
    let mut labels = Vec::with_capacity(t.elem_count());
    for &v in t.data() {
        if v < 0.0 || v.fract() != 0.0 {
            return Err(Error::msg(format!(
                "one_hot: labels must be non-negative integers, got {v}"
            )));
        }
        labels.push(v as usize);
    }
    let max_label = labels.iter().copied().max().unwrap_or(0);
    let num_classes = num_classes.unwrap_or(max_label + 1);
    if max_label >= num_classes {
        return Err(Error::config(format!(
            "one_hot: label {max_label} does not fit into {num_classes} classes"
        )));
    }

    let batch = t.dims()[0];
    let spatial: usize = t.dims()[LEADING_DIMS..].iter().product();
    let mut data = vec![0.0; batch * num_classes * spatial];
    for b in 0..batch {
        for s in 0..spatial {
            let label = labels[b * spatial + s];
            data[(b * num_classes + label) * spatial + s] = 1.0;
        }
    }
    let mut dims = t.dims().to_vec();
    dims[1] = num_classes;
    Tensor::new(data, dims, dtype.unwrap_or(t.dtype()), t.device())
}
