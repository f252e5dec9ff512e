use std::collections::HashMap;
use std::sync::Arc;

use crate::device::Device;
use crate::dtype::{DType, WithDType};
use crate::error::{Error, Result};
use crate::shape::Shape;

// Tensor: the numeric buffer flowing through the pipeline
//
// A Tensor is an n-dimensional array of numbers that:
//
//   1. Has a shape (e.g. [batch, channels, height, width])
//   2. Has a dtype; values are quantised to it on every write
//   3. Has a device placement
//   4. Carries a `requires_grad` bit that transform stages set or clear
//      according to the gradient state they run under
//
// MEMORY MODEL:
//
//   Values live in an Arc<Vec<f64>>. Cloning a Tensor is cheap, which is what
//   lets a dataset hand the same sample to many consumers read-only. Writes go
//   through Arc::make_mut, so a stage that mutates a buffer it shares with a
//   dataset copies it first instead of changing the dataset's sample.

/// An n-dimensional array of numbers.
///
/// # Example
/// ```
/// use sluice_core::{DType, Device, Tensor};
///
/// let t = Tensor::full([1, 1, 2, 2], 0.5, DType::F32, Device::Cpu);
/// assert_eq!(t.dims(), &[1, 1, 2, 2]);
/// assert_eq!(t.to_vec::<f64>(), vec![0.5; 4]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Arc<Vec<f64>>,
    shape: Shape,
    dtype: DType,
    device: Device,
    requires_grad: bool,
}

impl Tensor {
    // Constructors

    /// Create a tensor from raw values. Values are rounded to `dtype`.
    pub fn new(
        data: Vec<f64>,
        shape: impl Into<Shape>,
        dtype: DType,
        device: Device,
    ) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.elem_count() {
            return Err(Error::ElementCountMismatch {
                expected: shape.elem_count(),
                got: data.len(),
                shape,
            });
        }
        let data = if dtype == DType::F64 {
            data
        } else {
            data.into_iter().map(|v| dtype.round(v)).collect()
        };
        Ok(Tensor {
            data: Arc::new(data),
            shape,
            dtype,
            device,
            requires_grad: false,
        })
    }

    /// F32 tensor on the CPU.
    pub fn from_vec(data: Vec<f64>, shape: impl Into<Shape>) -> Result<Self> {
        Self::new(data, shape, DType::F32, Device::Cpu)
    }

    /// Typed construction: the dtype follows `T`.
    pub fn from_slice<T: WithDType>(data: &[T], shape: impl Into<Shape>) -> Result<Self> {
        let values = data.iter().map(|v| v.to_f64()).collect();
        Self::new(values, shape, T::DTYPE, Device::Cpu)
    }

    /// Tensor filled with a single value.
    pub fn full(shape: impl Into<Shape>, value: f64, dtype: DType, device: Device) -> Self {
        let shape = shape.into();
        Tensor {
            data: Arc::new(vec![dtype.round(value); shape.elem_count()]),
            shape,
            dtype,
            device,
            requires_grad: false,
        }
    }

    pub fn zeros(shape: impl Into<Shape>, dtype: DType, device: Device) -> Self {
        Self::full(shape, 0.0, dtype, device)
    }

    /// Same shape, dtype and device as `self`, different values.
    fn with_data(&self, data: Vec<f64>, shape: Shape) -> Self {
        let dtype = self.dtype;
        let data = if dtype == DType::F64 {
            data
        } else {
            data.into_iter().map(|v| dtype.round(v)).collect()
        };
        Tensor {
            data: Arc::new(data),
            shape,
            dtype,
            device: self.device,
            requires_grad: self.requires_grad,
        }
    }

    // Accessors

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn elem_count(&self) -> usize {
        self.data.len()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Raw values in row-major order.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Values converted to `T`.
    pub fn to_vec<T: WithDType>(&self) -> Vec<T> {
        self.data.iter().map(|&v| T::from_f64(v)).collect()
    }

    /// Whether two tensors share the same underlying storage.
    pub fn shares_storage(&self, other: &Tensor) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    // Gradient tracking

    /// Same buffer, `requires_grad` set to `flag`.
    pub fn with_requires_grad(mut self, flag: bool) -> Self {
        self.requires_grad = flag;
        self
    }

    /// Same buffer, no gradient tracking.
    pub fn detach(&self) -> Self {
        self.clone().with_requires_grad(false)
    }

    // Placement and precision

    /// Move to a different device. A no-op clone when already there.
    pub fn to_device(&self, device: Device) -> Self {
        let mut out = self.clone();
        out.device = device;
        out
    }

    /// Cast to a different dtype, rounding every value.
    ///
    /// Integer targets are rejected for tensors that track gradients.
    pub fn to_dtype(&self, dtype: DType) -> Result<Self> {
        if self.dtype == dtype {
            return Ok(self.clone());
        }
        if self.requires_grad && !dtype.is_float() {
            return Err(Error::msg(format!(
                "cannot cast a gradient-tracking tensor to non-float dtype {dtype}"
            )));
        }
        let data = self.data.iter().map(|&v| dtype.round(v)).collect();
        Ok(Tensor {
            data: Arc::new(data),
            shape: self.shape.clone(),
            dtype,
            device: self.device,
            requires_grad: self.requires_grad,
        })
    }

    // Element-wise operations

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        let data = self.data.iter().map(|&v| f(v)).collect();
        self.with_data(data, self.shape.clone())
    }

    /// In-place variant of [`Tensor::map`]. Copies the storage first if it is shared.
    pub fn map_inplace(&mut self, f: impl Fn(f64) -> f64) {
        let dtype = self.dtype;
        for v in Arc::make_mut(&mut self.data).iter_mut() {
            *v = dtype.round(f(*v));
        }
    }

    /// Combine two same-shaped tensors element by element.
    pub fn zip_map(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        if self.shape != other.shape {
            return Err(Error::ShapeMismatch {
                expected: self.shape.clone(),
                got: other.shape.clone(),
            });
        }
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(self.with_data(data, self.shape.clone()))
    }

    // Reductions over all elements

    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return f64::NAN;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Unbiased (n - 1) standard deviation. Zero for fewer than two elements.
    pub fn std(&self) -> f64 {
        let n = self.data.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self.data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    }

    // Structural operations

    /// Reverse the order of elements along each of `dims`.
    pub fn flip(&self, dims: &[usize]) -> Result<Self> {
        for &d in dims {
            if d >= self.rank() {
                return Err(Error::DimOutOfRange {
                    dim: d,
                    rank: self.rank(),
                });
            }
        }
        let extents = self.dims();
        let strides = self.shape.stride_contiguous();
        let mut out = Vec::with_capacity(self.data.len());
        for dst in 0..self.data.len() {
            let mut src = 0;
            let mut rem = dst;
            for (axis, (&stride, &extent)) in strides.iter().zip(extents).enumerate() {
                let mut coord = rem / stride;
                rem %= stride;
                if dims.contains(&axis) {
                    coord = extent - 1 - coord;
                }
                src += coord * stride;
            }
            out.push(self.data[src]);
        }
        Ok(self.with_data(out, self.shape.clone()))
    }

    /// Split into the slices along `dim`, each with `dim` removed.
    pub fn unbind(&self, dim: usize) -> Result<Vec<Tensor>> {
        let (outer, size, inner) = self.shape.split_at_dim(dim)?;
        let mut slice_dims = self.dims().to_vec();
        slice_dims.remove(dim);
        let slice_shape = Shape::new(slice_dims);

        let mut parts = Vec::with_capacity(size);
        for i in 0..size {
            let mut data = Vec::with_capacity(outer * inner);
            for o in 0..outer {
                let start = o * size * inner + i * inner;
                data.extend_from_slice(&self.data[start..start + inner]);
            }
            parts.push(Tensor {
                data: Arc::new(data),
                shape: slice_shape.clone(),
                dtype: self.dtype,
                device: self.device,
                requires_grad: self.requires_grad,
            });
        }
        Ok(parts)
    }

    /// Join same-shaped tensors along a new dimension `dim`.
    ///
    /// The result takes its dtype and device from the first tensor and tracks
    /// gradients if any input does.
    pub fn stack(tensors: &[Tensor], dim: usize) -> Result<Tensor> {
        let first = tensors
            .first()
            .ok_or_else(|| Error::msg("stack: need at least one tensor"))?;
        if dim > first.rank() {
            return Err(Error::DimOutOfRange {
                dim,
                rank: first.rank() + 1,
            });
        }
        for t in &tensors[1..] {
            if t.shape != first.shape {
                return Err(Error::ShapeMismatch {
                    expected: first.shape.clone(),
                    got: t.shape.clone(),
                });
            }
        }
        let outer = first.dims()[..dim].iter().product::<usize>();
        let inner = first.dims()[dim..].iter().product::<usize>();

        let mut data = Vec::with_capacity(first.elem_count() * tensors.len());
        for o in 0..outer {
            for t in tensors {
                data.extend_from_slice(&t.data[o * inner..(o + 1) * inner]);
            }
        }
        let mut dims = first.dims().to_vec();
        dims.insert(dim, tensors.len());

        let mut out = first.with_data(data, Shape::new(dims));
        out.requires_grad = tensors.iter().any(|t| t.requires_grad);
        Ok(out)
    }

    /// Apply `f` to every slice along `dim` and put the results back together.
    pub fn map_slices<F>(&self, dim: usize, mut f: F) -> Result<Tensor>
    where
        F: FnMut(usize, &Tensor) -> Result<Tensor>,
    {
        let parts = self
            .unbind(dim)?
            .iter()
            .enumerate()
            .map(|(i, part)| f(i, part))
            .collect::<Result<Vec<_>>>()?;
        Tensor::stack(&parts, dim)
    }
}

/// A batch: named buffers, passed through every transform stage.
pub type Batch = HashMap<String, Tensor>;
