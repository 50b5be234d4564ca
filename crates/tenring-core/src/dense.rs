//! Dense tensor implementation
//!
//! This module provides the core `DenseND<T>` type for dense N-dimensional
//! tensor storage. Storage is always C-contiguous so that flat offsets from
//! [`crate::LinearIndexer`] can address it directly.
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext`.

use scirs2_core::ndarray_ext::{Array, IxDyn};
use scirs2_core::numeric::{Float, Num};
use std::fmt;

/// Dense N-dimensional tensor backed by scirs2_core's ndarray
///
/// # Type Parameters
///
/// * `T` - The element type (typically `f64`)
///
/// # Examples
///
/// ```
/// use tenring_core::dense::DenseND;
///
/// let tensor = DenseND::<f64>::zeros(&[2, 3, 4]);
/// assert_eq!(tensor.shape(), &[2, 3, 4]);
/// assert_eq!(tensor.rank(), 3);
/// ```
#[derive(Clone)]
pub struct DenseND<T> {
    /// Underlying ndarray storage, always in standard layout
    pub(crate) data: Array<T, IxDyn>,
}

impl<T> DenseND<T>
where
    T: Clone + Num,
{
    /// Create a tensor from an existing ndarray
    ///
    /// Non-contiguous inputs (e.g. permuted views turned owned) are copied
    /// into row-major order.
    ///
    /// # Examples
    ///
    /// ```
    /// use scirs2_core::ndarray_ext::Array;
    /// use tenring_core::dense::DenseND;
    ///
    /// let arr = Array::<f64, _>::zeros(vec![2, 3]);
    /// let tensor = DenseND::from_array(arr);
    /// assert_eq!(tensor.shape(), &[2, 3]);
    /// ```
    pub fn from_array(array: Array<T, IxDyn>) -> Self {
        if array.is_standard_layout() {
            Self { data: array }
        } else {
            Self {
                data: array.as_standard_layout().into_owned(),
            }
        }
    }

    /// Create a tensor from a vector with given shape
    ///
    /// # Arguments
    ///
    /// * `vec` - Flattened data in row-major order
    /// * `shape` - Target shape
    ///
    /// # Examples
    ///
    /// ```
    /// use tenring_core::dense::DenseND;
    ///
    /// let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    /// let tensor = DenseND::from_vec(data, &[2, 3]).unwrap();
    /// assert_eq!(tensor.shape(), &[2, 3]);
    /// ```
    pub fn from_vec(vec: Vec<T>, shape: &[usize]) -> anyhow::Result<Self> {
        let len = vec.len();
        let data = Array::from_shape_vec(IxDyn(shape), vec).map_err(|_| {
            anyhow::anyhow!("{} elements cannot fill a tensor of shape {:?}", len, shape)
        })?;
        Ok(Self { data })
    }

    /// Create a tensor of zeros
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: Array::zeros(IxDyn(shape)),
        }
    }

    /// Create a tensor filled with a specific value
    pub fn from_elem(shape: &[usize], value: T) -> Self {
        Self {
            data: Array::from_elem(IxDyn(shape), value),
        }
    }

    /// Number of modes (dimensions)
    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    /// Shape of the tensor
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the tensor has zero elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat row-major storage
    ///
    /// # Examples
    ///
    /// ```
    /// use tenring_core::dense::DenseND;
    ///
    /// let tensor = DenseND::<f64>::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    /// assert_eq!(tensor.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    /// ```
    pub fn as_slice(&self) -> &[T] {
        self.data
            .as_slice()
            .expect("DenseND storage is always in standard layout")
    }

    /// Get an element, returning `None` when out of bounds or of wrong dimensionality
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.rank() {
            return None;
        }
        self.data.get(IxDyn(index))
    }
}

impl<T> DenseND<T>
where
    T: Float,
{
    /// Compute the Frobenius norm: ||X||_F = sqrt(Σ X²)
    ///
    /// # Examples
    ///
    /// ```
    /// use tenring_core::dense::DenseND;
    ///
    /// let tensor = DenseND::<f64>::from_elem(&[2, 3], 1.0);
    /// assert!((tensor.frobenius_norm() - 6.0_f64.sqrt()).abs() < 1e-12);
    /// ```
    pub fn frobenius_norm(&self) -> T {
        self.data
            .iter()
            .fold(T::zero(), |acc, &x| acc + x * x)
            .sqrt()
    }

    /// Relative Frobenius distance ||self - reference|| / ||reference||
    ///
    /// Returns an error when the shapes differ. A zero reference yields the
    /// absolute distance.
    pub fn relative_distance(&self, reference: &DenseND<T>) -> anyhow::Result<T> {
        if self.shape() != reference.shape() {
            anyhow::bail!(
                "Shape mismatch: {:?} vs reference {:?}",
                self.shape(),
                reference.shape()
            );
        }

        let mut diff_sq = T::zero();
        let mut ref_sq = T::zero();
        for (&a, &b) in self.data.iter().zip(reference.data.iter()) {
            let d = a - b;
            diff_sq = diff_sq + d * d;
            ref_sq = ref_sq + b * b;
        }

        if ref_sq == T::zero() {
            Ok(diff_sq.sqrt())
        } else {
            Ok((diff_sq / ref_sq).sqrt())
        }
    }
}

impl<T> std::ops::Index<&[usize]> for DenseND<T> {
    type Output = T;

    fn index(&self, index: &[usize]) -> &Self::Output {
        &self.data[IxDyn(index)]
    }
}

impl<T> fmt::Debug for DenseND<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenseND")
            .field("shape", &self.data.shape())
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_shape_mismatch() {
        let result = DenseND::<f64>::from_vec(vec![1.0, 2.0, 3.0], &[2, 2]);
        assert!(result.is_err());
    }

    #[test]
    fn test_row_major_storage() {
        let data: Vec<f64> = (0..6).map(|x| x as f64).collect();
        let tensor = DenseND::from_vec(data, &[2, 3]).unwrap();
        assert_eq!(tensor[&[1, 0][..]], 3.0);
        assert_eq!(tensor.as_slice()[4], 4.0);
    }

    #[test]
    fn test_from_array_normalises_layout() {
        let data: Vec<f64> = (0..6).map(|x| x as f64).collect();
        let arr = Array::from_shape_vec(IxDyn(&[2, 3]), data).unwrap();
        let transposed = arr.reversed_axes();
        let tensor = DenseND::from_array(transposed);
        assert_eq!(tensor.shape(), &[3, 2]);
        assert_eq!(tensor.as_slice(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
    }

    #[test]
    fn test_relative_distance() {
        let a = DenseND::<f64>::from_vec(vec![1.0, 0.0, 0.0, 1.0], &[2, 2]).unwrap();
        let b = DenseND::<f64>::from_vec(vec![1.0, 0.0, 0.0, 0.0], &[2, 2]).unwrap();
        let dist = b.relative_distance(&a).unwrap();
        assert!((dist - (0.5_f64).sqrt()).abs() < 1e-12);
        assert_eq!(a.relative_distance(&a).unwrap(), 0.0);
    }

    #[test]
    fn test_relative_distance_shape_mismatch() {
        let a = DenseND::<f64>::zeros(&[2, 2]);
        let b = DenseND::<f64>::zeros(&[4]);
        assert!(a.relative_distance(&b).is_err());
    }

    #[test]
    fn test_get_bounds() {
        let tensor = DenseND::<f64>::from_elem(&[3, 4], 5.0);
        assert_eq!(tensor.get(&[2, 3]), Some(&5.0));
        assert_eq!(tensor.get(&[3, 0]), None);
        assert_eq!(tensor.get(&[0]), None);
    }
}
