//! Decoded array values.
//!
//! A [`Tensor`] owns a contiguous row-major byte image together with the
//! [`TensorMeta`] describing how to interpret it. Every constructor checks
//! that the image length matches the shape, so a `Tensor` is always valid.

use bytes::Bytes;

use crate::dtype::{self, DType, Element};
use crate::error::{Result, TensorError};

/// Shape and element type of an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TensorMeta {
    /// Shape of the array (e.g., `[rows, cols]`)
    pub shape: Vec<usize>,
    /// Data type of array elements
    pub dtype: DType,
}

impl TensorMeta {
    /// Creates new metadata with the given shape and dtype.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unirpc_tensor::{DType, TensorMeta};
    ///
    /// let meta = TensorMeta::new(vec![32, 768], DType::Float32);
    /// assert_eq!(meta.numel(), 32 * 768);
    /// assert_eq!(meta.byte_size(), 32 * 768 * 4);
    /// ```
    pub fn new(shape: Vec<usize>, dtype: DType) -> Self {
        Self { shape, dtype }
    }

    /// Returns the total number of elements.
    #[inline]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns the total size in bytes of the array data.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.numel() * self.dtype.element_size()
    }

    /// Like [`byte_size`](Self::byte_size), but `None` when the shape is too
    /// large to address.
    pub fn checked_byte_size(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(self.dtype.element_size(), |acc, &dim| acc.checked_mul(dim))
    }

    /// Returns the number of dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Computes row-major (C-order) strides, in elements.
    pub fn default_strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.shape.len()];
        for i in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.shape[i + 1];
        }
        strides
    }

    /// Byte length the shape requires; an unaddressable shape is a
    /// [`TensorError::SizeMismatch`] against `actual`.
    fn required_len(&self, actual: usize) -> Result<usize> {
        self.checked_byte_size().ok_or(TensorError::SizeMismatch {
            expected: usize::MAX,
            actual,
        })
    }

    fn check_len(&self, actual: usize) -> Result<()> {
        let expected = self.required_len(actual)?;
        if expected != actual {
            return Err(TensorError::SizeMismatch { expected, actual });
        }
        Ok(())
    }
}

/// An array with owned data, stored little-endian in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    meta: TensorMeta,
    data: Bytes,
}

impl Tensor {
    /// Creates a tensor from metadata and a raw byte image.
    ///
    /// Fails with [`TensorError::SizeMismatch`] when the image does not
    /// hold exactly `product(shape) * element_size` bytes.
    pub fn new(meta: TensorMeta, data: Bytes) -> Result<Self> {
        meta.check_len(data.len())?;
        Ok(Self { meta, data })
    }

    /// Creates a tensor of `dtype` from a raw byte image.
    ///
    /// This is the only way to build a `longdouble` array, which has no
    /// native element type.
    pub fn from_raw(dtype: DType, shape: Vec<usize>, data: impl Into<Bytes>) -> Result<Self> {
        Self::new(TensorMeta::new(shape, dtype), data.into())
    }

    /// Creates a tensor from a slice of elements.
    ///
    /// When `shape` is `None` the tensor is one-dimensional with the slice
    /// length as its only dimension.
    ///
    /// ```rust
    /// use unirpc_tensor::Tensor;
    ///
    /// let t = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], Some(vec![2, 2])).unwrap();
    /// assert_eq!(t.shape(), &[2, 2]);
    /// assert_eq!(t.byte_size(), 16);
    /// ```
    pub fn from_slice<T: Element>(data: &[T], shape: Option<Vec<usize>>) -> Result<Self> {
        let shape = shape.unwrap_or_else(|| vec![data.len()]);
        let meta = TensorMeta::new(shape, T::DTYPE);
        let bytes = dtype::to_le_bytes(data);
        meta.check_len(bytes.len())?;
        Ok(Self {
            meta,
            data: Bytes::from(bytes),
        })
    }

    /// Creates a two-dimensional tensor whose shape is `[rows.len(), N]`.
    pub fn from_rows<T: Element, const N: usize>(rows: &[[T; N]]) -> Self {
        let flat: Vec<T> = rows.iter().flatten().copied().collect();
        Self {
            meta: TensorMeta::new(vec![rows.len(), N], T::DTYPE),
            data: Bytes::from(dtype::to_le_bytes(&flat)),
        }
    }

    /// Creates a tensor filled with zeros.
    ///
    /// Fails with [`TensorError::SizeMismatch`] when the shape is too large
    /// to address.
    pub fn zeros(meta: TensorMeta) -> Result<Self> {
        let len = meta.required_len(0)?;
        let data = Bytes::from(vec![0u8; len]);
        Ok(Self { meta, data })
    }

    /// Returns the tensor metadata.
    #[inline]
    pub fn meta(&self) -> &TensorMeta {
        &self.meta
    }

    /// Returns the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.meta.shape
    }

    /// Returns the data type of the tensor.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.meta.dtype
    }

    /// Returns the total number of elements.
    #[inline]
    pub fn numel(&self) -> usize {
        self.meta.numel()
    }

    /// Returns the number of dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.meta.ndim()
    }

    /// Returns the total size in bytes.
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    /// Returns the raw little-endian byte image.
    #[inline]
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Copies the elements out as `T`.
    ///
    /// Fails with [`TensorError::DtypeMismatch`] unless `T::DTYPE` is the
    /// tensor's dtype.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if T::DTYPE != self.meta.dtype {
            return Err(TensorError::DtypeMismatch {
                expected: T::DTYPE,
                found: self.meta.dtype,
            });
        }
        Ok(dtype::from_le_bytes(&self.data))
    }

    /// Row-major strides of this tensor, in elements.
    pub fn default_strides(&self) -> Vec<usize> {
        self.meta.default_strides()
    }

    /// Returns a copy with a different shape over the same elements.
    pub fn reshape(&self, shape: Vec<usize>) -> Result<Self> {
        Self::new(TensorMeta::new(shape, self.meta.dtype), self.data.clone())
    }
}

impl std::fmt::Display for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims: Vec<String> = self.meta.shape.iter().map(|d| d.to_string()).collect();
        write!(f, "{}[{}]", self.meta.dtype, dims.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_meta() {
        let meta = TensorMeta::new(vec![2, 3, 4], DType::Float32);
        assert_eq!(meta.numel(), 24);
        assert_eq!(meta.byte_size(), 96);
        assert_eq!(meta.checked_byte_size(), Some(96));
        assert_eq!(meta.ndim(), 3);
    }

    #[test]
    fn test_default_strides() {
        let meta = TensorMeta::new(vec![2, 3, 4], DType::Float32);
        assert_eq!(meta.default_strides(), vec![12, 4, 1]);
    }

    #[test]
    fn test_scalar_shape() {
        let meta = TensorMeta::new(vec![], DType::Int64);
        assert_eq!(meta.numel(), 1);
        assert_eq!(meta.byte_size(), 8);
        assert!(meta.default_strides().is_empty());
    }

    #[test]
    fn test_checked_byte_size_overflow() {
        let meta = TensorMeta::new(vec![usize::MAX, 2], DType::Int64);
        assert_eq!(meta.checked_byte_size(), None);
        assert!(matches!(
            Tensor::new(meta, Bytes::new()),
            Err(TensorError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_tensor_from_slice_default_shape() {
        let data = vec![6i64, 7, 8];
        let tensor = Tensor::from_slice(&data, None).unwrap();

        assert_eq!(tensor.shape(), &[3]);
        assert_eq!(tensor.dtype(), DType::Int64);
        assert_eq!(tensor.byte_size(), 24);
        assert_eq!(tensor.to_vec::<i64>().unwrap(), data);
    }

    #[test]
    fn test_tensor_from_slice_explicit_shape() {
        let data: Vec<u16> = (0..12).collect();
        let tensor = Tensor::from_slice(&data, Some(vec![3, 4])).unwrap();
        assert_eq!(tensor.ndim(), 2);
        assert_eq!(tensor.to_vec::<u16>().unwrap(), data);

        let err = Tensor::from_slice(&data, Some(vec![5, 5])).unwrap_err();
        assert_eq!(
            err,
            TensorError::SizeMismatch {
                expected: 50,
                actual: 24
            }
        );
    }

    #[test]
    fn test_tensor_from_rows() {
        let tensor = Tensor::from_rows(&[[1.0f64, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(tensor.shape(), &[2, 3]);
        assert_eq!(
            tensor.to_vec::<f64>().unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn test_dtype_mismatch() {
        let tensor = Tensor::from_slice(&[1i32, 2], None).unwrap();
        assert_eq!(
            tensor.to_vec::<f32>().unwrap_err(),
            TensorError::DtypeMismatch {
                expected: DType::Float32,
                found: DType::Int32
            }
        );
    }

    #[test]
    fn test_longdouble_from_raw() {
        let tensor = Tensor::from_raw(DType::LongDouble, vec![2], vec![0u8; 32]).unwrap();
        assert_eq!(tensor.numel(), 2);

        let err = Tensor::from_raw(DType::LongDouble, vec![2], vec![0u8; 16]).unwrap_err();
        assert!(matches!(err, TensorError::SizeMismatch { expected: 32, actual: 16 }));
    }

    #[test]
    fn test_zeros_and_reshape() {
        let tensor = Tensor::zeros(TensorMeta::new(vec![4, 4], DType::Float32)).unwrap();
        assert!(tensor.to_vec::<f32>().unwrap().iter().all(|&x| x == 0.0));

        let flat = tensor.reshape(vec![16]).unwrap();
        assert_eq!(flat.shape(), &[16]);
        assert!(tensor.reshape(vec![15]).is_err());
    }

    #[test]
    fn test_zeros_rejects_unaddressable_shape() {
        let err = Tensor::zeros(TensorMeta::new(vec![usize::MAX, 2], DType::Int64)).unwrap_err();
        assert_eq!(
            err,
            TensorError::SizeMismatch {
                expected: usize::MAX,
                actual: 0
            }
        );
    }

    #[test]
    fn test_display() {
        let tensor = Tensor::from_slice(&[0u8; 6], Some(vec![2, 3])).unwrap();
        assert_eq!(tensor.to_string(), "uint8[2, 3]");
    }
}
