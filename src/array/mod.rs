//! Typed n-dimensional arrays used for every numeric payload of a space
//! (Box bounds, MultiBinary sizes, MultiDiscrete counts).
//!
//! `NdArray` wraps an `ndarray::ArrayD<T>` for each supported element type so
//! that shape and dtype travel together through the wire codec.

pub mod serialization;

use std::fmt;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

pub use serialization::{SerializationFormat, deserialize_ndarray, serialize_ndarray};

/// Element type of an `NdArray`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Float32,
    Float64,
    Int8,
    Int32,
    Int64,
    Uint8,
}

impl DType {
    pub fn name(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Int8 => "int8",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Uint8 => "uint8",
        }
    }

    /// Size in bytes of one element.
    pub fn width(self) -> usize {
        match self {
            DType::Int8 | DType::Uint8 => 1,
            DType::Float32 | DType::Int32 => 4,
            DType::Float64 | DType::Int64 => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, DType::Float32 | DType::Float64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A dynamically-shaped array tagged with its element type.
#[derive(Clone, Debug, PartialEq)]
pub enum NdArray {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int8(ArrayD<i8>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Uint8(ArrayD<u8>),
}

/// Evaluate `$body` with `$arr` bound to the inner `ArrayD` of any variant.
macro_rules! with_array {
    ($value:expr, $arr:ident => $body:expr) => {
        match $value {
            NdArray::Float32($arr) => $body,
            NdArray::Float64($arr) => $body,
            NdArray::Int8($arr) => $body,
            NdArray::Int32($arr) => $body,
            NdArray::Int64($arr) => $body,
            NdArray::Uint8($arr) => $body,
        }
    };
}
pub(crate) use with_array;

impl NdArray {
    pub fn dtype(&self) -> DType {
        match self {
            NdArray::Float32(_) => DType::Float32,
            NdArray::Float64(_) => DType::Float64,
            NdArray::Int8(_) => DType::Int8,
            NdArray::Int32(_) => DType::Int32,
            NdArray::Int64(_) => DType::Int64,
            NdArray::Uint8(_) => DType::Uint8,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize { self.shape().len() }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        with_array!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Same dtype and same shape.
    pub fn same_layout(&self, other: &NdArray) -> bool {
        self.dtype() == other.dtype() && self.shape() == other.shape()
    }

    /// Elements in logical (row-major) order, widened to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_array!(self, a => a.iter().map(|&v| v as f64).collect())
    }

    /// Elements widened to i64, or `None` for floating-point arrays.
    pub fn to_i64_array(&self) -> Option<ArrayD<i64>> {
        match self {
            NdArray::Int8(a) => Some(a.mapv(i64::from)),
            NdArray::Int32(a) => Some(a.mapv(i64::from)),
            NdArray::Int64(a) => Some(a.clone()),
            NdArray::Uint8(a) => Some(a.mapv(i64::from)),
            NdArray::Float32(_) | NdArray::Float64(_) => None,
        }
    }

    /// Elements in logical order widened to i64, or `None` for floating-point arrays.
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        self.to_i64_array().map(|a| a.iter().copied().collect())
    }
}

macro_rules! impl_from_array {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<ArrayD<$t>> for NdArray {
                fn from(a: ArrayD<$t>) -> Self { NdArray::$variant(a) }
            }

            impl From<Vec<$t>> for NdArray {
                /// Builds a one-dimensional array.
                fn from(v: Vec<$t>) -> Self {
                    NdArray::$variant(ndarray::Array1::from_vec(v).into_dyn())
                }
            }
        )*
    };
}

impl_from_array!(
    f32 => Float32,
    f64 => Float64,
    i8 => Int8,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
);
