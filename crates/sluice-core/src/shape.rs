use std::fmt;

// Shape: N-dimensional shape representation
//
// A Shape describes the size of each dimension of a buffer.
//   - Scalar: Shape([])             0 dimensions, 1 element
//   - Image batch: Shape([N, C, H, W])
//
// Batches flowing through the pipeline are conventionally laid out
// batch-first then channel-first, so "per sample" means dim 0 and
// "per channel" means dim 1.

/// N-dimensional shape of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// Create a new shape from a vector of dimension sizes.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// The dimension sizes as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (product of all dimensions).
    /// A scalar shape [] has 1 element; any zero-sized dim gives 0.
    pub fn elem_count(&self) -> usize {
        self.0.iter().product::<usize>()
    }

    /// Contiguous (row-major) strides. For [2, 3, 4] this is [12, 4, 1].
    pub fn stride_contiguous(&self) -> Vec<usize> {
        let mut strides = vec![0usize; self.rank()];
        if self.rank() > 0 {
            strides[self.rank() - 1] = 1;
            for i in (0..self.rank() - 1).rev() {
                strides[i] = strides[i + 1] * self.0[i + 1];
            }
        }
        strides
    }

    /// Size of a specific dimension.
    pub fn dim(&self, d: usize) -> crate::Result<usize> {
        self.0.get(d).copied().ok_or(crate::Error::DimOutOfRange {
            dim: d,
            rank: self.rank(),
        })
    }

    /// Split the shape around `dim` into (outer, size, inner) element counts.
    ///
    /// `outer` is the product of the dims before `dim`, `inner` the product
    /// of the dims after it. Slicing along `dim` walks `outer` blocks of
    /// `size * inner` contiguous elements.
    pub fn split_at_dim(&self, dim: usize) -> crate::Result<(usize, usize, usize)> {
        let size = self.dim(dim)?;
        let outer = self.0[..dim].iter().product::<usize>();
        let inner = self.0[dim + 1..].iter().product::<usize>();
        Ok((outer, size, inner))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape(dims.to_vec())
    }
}

impl From<usize> for Shape {
    fn from(d: usize) -> Self {
        Shape(vec![d])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elem_count() {
        assert_eq!(Shape::new(vec![]).elem_count(), 1);
        assert_eq!(Shape::from([1, 1, 10, 10]).elem_count(), 100);
        assert_eq!(Shape::from([3, 0]).elem_count(), 0);
    }

    #[test]
    fn test_strides() {
        assert_eq!(Shape::from([2, 3, 4]).stride_contiguous(), vec![12, 4, 1]);
        assert!(Shape::new(vec![]).stride_contiguous().is_empty());
    }

    #[test]
    fn test_split_at_dim() {
        let s = Shape::from([2, 3, 4, 5]);
        assert_eq!(s.split_at_dim(1).unwrap(), (2, 3, 20));
        assert_eq!(s.split_at_dim(0).unwrap(), (1, 2, 60));
        assert!(s.split_at_dim(4).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape::from([1, 2]).to_string(), "[1, 2]");
    }
}
