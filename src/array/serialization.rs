// Numeric-array codec: NdArray <-> wire::Array.

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use super::{DType, NdArray, with_array};
use crate::core::{Result, SpaceError};
use crate::wire;

/// How numeric payloads are laid out on the wire. Affects encoding only;
/// both formats decode to the same array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationFormat {
    /// Typed repeated fields (`double_data`, `int32_data`, ...).
    #[default]
    Structured,
    /// Little-endian element bytes in row-major order, in `raw_data`.
    Raw,
}

/// Encode an array with the selected format.
pub fn serialize_ndarray(array: &NdArray, format: SerializationFormat) -> wire::Array {
    let mut out = wire::Array {
        dtype: Some(array.dtype()),
        shape: array.shape().iter().map(|&d| d as u64).collect(),
        ..Default::default()
    };
    match format {
        SerializationFormat::Raw => {
            out.raw_data = with_array!(array, a => a.iter().flat_map(|v| v.to_le_bytes()).collect());
        }
        SerializationFormat::Structured => match array {
            NdArray::Float32(a) => out.double_data = a.iter().map(|&v| f64::from(v)).collect(),
            NdArray::Float64(a) => out.double_data = a.iter().copied().collect(),
            NdArray::Int8(a) => out.int32_data = a.iter().map(|&v| i32::from(v)).collect(),
            NdArray::Int32(a) => out.int32_data = a.iter().copied().collect(),
            NdArray::Int64(a) => out.int64_data = a.iter().copied().collect(),
            NdArray::Uint8(a) => out.uint32_data = a.iter().map(|&v| u32::from(v)).collect(),
        },
    }
    out
}

/// Decode an array. A non-empty `raw_data` selects raw decoding, otherwise the
/// typed fields are read.
pub fn deserialize_ndarray(array: &wire::Array) -> Result<NdArray> {
    let dtype = array
        .dtype
        .ok_or_else(|| SpaceError::UnsupportedDtype("<unset>".into()))?;
    let shape = array
        .shape
        .iter()
        .map(|&d| {
            usize::try_from(d)
                .map_err(|_| SpaceError::InvalidValue(format!("array dimension {d} does not fit in memory")))
        })
        .collect::<Result<Vec<usize>>>()?;
    if array.raw_data.is_empty() {
        from_structured(dtype, &shape, array)
    } else {
        from_raw(dtype, &shape, &array.raw_data)
    }
}

fn from_raw(dtype: DType, shape: &[usize], bytes: &[u8]) -> Result<NdArray> {
    let width = dtype.width();
    if bytes.len() % width != 0 {
        return Err(SpaceError::RawPayloadAlignment { len: bytes.len(), width });
    }

    macro_rules! decode {
        ($t:ty, $variant:ident) => {{
            let values: Vec<$t> = bytes
                .chunks_exact(width)
                .map(|chunk| {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    buf.copy_from_slice(chunk);
                    <$t>::from_le_bytes(buf)
                })
                .collect();
            NdArray::$variant(shaped(shape, values)?)
        }};
    }

    Ok(match dtype {
        DType::Float32 => decode!(f32, Float32),
        DType::Float64 => decode!(f64, Float64),
        DType::Int8 => decode!(i8, Int8),
        DType::Int32 => decode!(i32, Int32),
        DType::Int64 => decode!(i64, Int64),
        DType::Uint8 => decode!(u8, Uint8),
    })
}

fn from_structured(dtype: DType, shape: &[usize], array: &wire::Array) -> Result<NdArray> {
    Ok(match dtype {
        DType::Float32 => NdArray::Float32(shaped(
            shape,
            array.double_data.iter().map(|&v| v as f32).collect(),
        )?),
        DType::Float64 => NdArray::Float64(shaped(shape, array.double_data.clone())?),
        DType::Int8 => NdArray::Int8(shaped(shape, narrow(&array.int32_data, dtype)?)?),
        DType::Int32 => NdArray::Int32(shaped(shape, array.int32_data.clone())?),
        DType::Int64 => NdArray::Int64(shaped(shape, array.int64_data.clone())?),
        DType::Uint8 => NdArray::Uint8(shaped(shape, narrow(&array.uint32_data, dtype)?)?),
    })
}

/// Narrow the widened structured field back to the element type.
fn narrow<S, T>(values: &[S], dtype: DType) -> Result<Vec<T>>
where
    S: Copy + std::fmt::Display,
    T: TryFrom<S>,
{
    values
        .iter()
        .map(|&v| {
            T::try_from(v)
                .map_err(|_| SpaceError::InvalidValue(format!("{v} is out of range for {dtype}")))
        })
        .collect()
}

fn shaped<T>(shape: &[usize], values: Vec<T>) -> Result<ArrayD<T>> {
    let expected = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| SpaceError::InvalidValue(format!("array shape {shape:?} overflows the element count")))?;
    if values.len() != expected {
        return Err(SpaceError::PayloadLength {
            shape: shape.to_vec(),
            expected,
            found: values.len(),
        });
    }
    Ok(ArrayD::from_shape_vec(IxDyn(shape), values)?)
}
