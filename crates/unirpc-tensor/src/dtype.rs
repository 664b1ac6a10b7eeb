//! Data types for array elements.
//!
//! The wire names follow NumPy's canonical dtype names so that arrays
//! produced by a NumPy peer decode without translation.

use std::str::FromStr;

use crate::error::TensorError;

/// Data type for array elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DType {
    /// 8-bit signed integer
    Int8 = 1,
    /// 16-bit signed integer
    Int16 = 2,
    /// 32-bit signed integer
    Int32 = 3,
    /// 64-bit signed integer
    Int64 = 4,
    /// 8-bit unsigned integer
    UInt8 = 5,
    /// 16-bit unsigned integer
    UInt16 = 6,
    /// 32-bit unsigned integer
    UInt32 = 7,
    /// 64-bit unsigned integer
    UInt64 = 8,
    /// 32-bit IEEE 754 floating point
    Float32 = 9,
    /// 64-bit IEEE 754 floating point
    Float64 = 10,
    /// Platform extended precision, stored as 16 bytes.
    ///
    /// Not portable: the bit layout depends on the peer's C `long double`.
    LongDouble = 11,
}

impl DType {
    /// Every canonical dtype, in table order.
    pub const ALL: [DType; 11] = [
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
        DType::Float32,
        DType::Float64,
        DType::LongDouble,
    ];

    /// Returns the size in bytes of a single element of this data type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unirpc_tensor::DType;
    ///
    /// assert_eq!(DType::Float32.element_size(), 4);
    /// assert_eq!(DType::Int16.element_size(), 2);
    /// assert_eq!(DType::LongDouble.element_size(), 16);
    /// ```
    #[inline]
    pub const fn element_size(&self) -> usize {
        match self {
            DType::LongDouble => 16,
            DType::Float64 | DType::Int64 | DType::UInt64 => 8,
            DType::Float32 | DType::Int32 | DType::UInt32 => 4,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int8 | DType::UInt8 => 1,
        }
    }

    /// Returns the canonical wire name for this data type.
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::LongDouble => "longdouble",
        }
    }

    /// Looks up a dtype by its canonical wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dtype| dtype.name() == name)
    }

    /// Maps a Rust primitive type name (`"f32"`, `"u16"`, ...) to its dtype.
    ///
    /// Types without a canonical dtype, such as `bool`, `char` or `f16`,
    /// fail with [`TensorError::UnsupportedElementType`].
    pub fn from_type_name(type_name: &str) -> Result<Self, TensorError> {
        match type_name {
            "i8" => Ok(DType::Int8),
            "i16" => Ok(DType::Int16),
            "i32" => Ok(DType::Int32),
            "i64" => Ok(DType::Int64),
            "u8" => Ok(DType::UInt8),
            "u16" => Ok(DType::UInt16),
            "u32" => Ok(DType::UInt32),
            "u64" => Ok(DType::UInt64),
            "f32" => Ok(DType::Float32),
            "f64" => Ok(DType::Float64),
            other => Err(TensorError::UnsupportedElementType(other.to_string())),
        }
    }

    /// Returns whether this is a floating-point type.
    #[inline]
    pub const fn is_floating_point(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float64 | DType::LongDouble)
    }

    /// Returns whether this is a signed type.
    #[inline]
    pub const fn is_signed(&self) -> bool {
        !matches!(
            self,
            DType::UInt8 | DType::UInt16 | DType::UInt32 | DType::UInt64
        )
    }

    /// Returns whether the byte layout is identical on every platform.
    #[inline]
    pub const fn is_portable(&self) -> bool {
        !matches!(self, DType::LongDouble)
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| TensorError::UnknownDtype(s.to_string()))
    }
}

/// Trait for native types that can be used as array elements.
///
/// Elements travel little-endian regardless of the host byte order.
pub trait Element: Copy + Send + Sync + 'static {
    /// The DType corresponding to this element type.
    const DTYPE: DType;

    /// Appends the little-endian bytes of `self` to `out`.
    fn write_le(&self, out: &mut Vec<u8>);

    /// Reads one element from exactly `DTYPE.element_size()` bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;

            #[inline]
            fn write_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_le_bytes(raw)
            }
        }
    };
}

impl_element!(i8, DType::Int8);
impl_element!(i16, DType::Int16);
impl_element!(i32, DType::Int32);
impl_element!(i64, DType::Int64);
impl_element!(u8, DType::UInt8);
impl_element!(u16, DType::UInt16);
impl_element!(u32, DType::UInt32);
impl_element!(u64, DType::UInt64);
impl_element!(f32, DType::Float32);
impl_element!(f64, DType::Float64);

/// Encodes a slice of elements into its little-endian byte image.
pub fn to_le_bytes<T: Element>(data: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * T::DTYPE.element_size());
    for value in data {
        value.write_le(&mut out);
    }
    out
}

/// Decodes a little-endian byte image into elements.
///
/// Trailing bytes that do not form a whole element are ignored; callers
/// validate the length first.
pub fn from_le_bytes<T: Element>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(T::DTYPE.element_size())
        .map(T::read_le)
        .collect()
}
