use crate::dtype::{DType, DTypeError};
use crate::numeric_scalar::{NumericScalar, NumericScalarType};
use crate::value::ValueError;
use half::{bf16, f16};
use serde::{Deserialize, Serialize};

/// Element storage owned by the host. Interpreted values and the buffers of
/// compiled programs both live here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostBuffer {
    F64(Vec<f64>),
    F32(Vec<f32>),
    BF16(Vec<bf16>),
    F16(Vec<f16>),
    I64(Vec<i64>),
    I32(Vec<i32>),
}

macro_rules! for_each_buffer {
    ($buffer:expr, $v:ident => $body:expr) => {
        match $buffer {
            HostBuffer::F64($v) => $body,
            HostBuffer::F32($v) => $body,
            HostBuffer::BF16($v) => $body,
            HostBuffer::F16($v) => $body,
            HostBuffer::I64($v) => $body,
            HostBuffer::I32($v) => $body,
        }
    };
}

impl HostBuffer {
    pub fn zeros(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::F64 => HostBuffer::F64(vec![0.0; len]),
            DType::F32 => HostBuffer::F32(vec![0.0; len]),
            DType::BF16 => HostBuffer::BF16(vec![bf16::ZERO; len]),
            DType::F16 => HostBuffer::F16(vec![f16::ZERO; len]),
            DType::I64 => HostBuffer::I64(vec![0; len]),
            DType::I32 => HostBuffer::I32(vec![0; len]),
        }
    }

    pub fn from_vec<T: NumericScalarType>(values: Vec<T>) -> Self {
        T::into_host_buffer(values)
    }

    pub fn dtype(&self) -> DType {
        match self {
            HostBuffer::F64(_) => DType::F64,
            HostBuffer::F32(_) => DType::F32,
            HostBuffer::BF16(_) => DType::BF16,
            HostBuffer::F16(_) => DType::F16,
            HostBuffer::I64(_) => DType::I64,
            HostBuffer::I32(_) => DType::I32,
        }
    }

    pub fn len(&self) -> usize {
        for_each_buffer!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<NumericScalar> {
        for_each_buffer!(self, v => v.get(index).map(|x| x.to_numeric_scalar()))
    }

    pub fn set(&mut self, index: usize, value: NumericScalar) -> Result<(), ValueError> {
        let len = self.len();
        let slot = match (self, value) {
            (HostBuffer::F64(v), NumericScalar::F64(x)) => v.get_mut(index).map(|s| *s = x),
            (HostBuffer::F32(v), NumericScalar::F32(x)) => v.get_mut(index).map(|s| *s = x),
            (HostBuffer::BF16(v), NumericScalar::BF16(x)) => v.get_mut(index).map(|s| *s = x),
            (HostBuffer::F16(v), NumericScalar::F16(x)) => v.get_mut(index).map(|s| *s = x),
            (HostBuffer::I64(v), NumericScalar::I64(x)) => v.get_mut(index).map(|s| *s = x),
            (HostBuffer::I32(v), NumericScalar::I32(x)) => v.get_mut(index).map(|s| *s = x),
            (buffer, value) => {
                return Err(ValueError::TypeMismatch(buffer.dtype(), value.dtype()));
            }
        };
        slot.ok_or_else(|| {
            ValueError::InvalidArgument(format!("index {index} out of range for buffer of {len}"))
        })
    }

    /// Copies the contents out, casting each element to `T`.
    pub fn to_vec<T: NumericScalarType>(&self) -> Vec<T> {
        for_each_buffer!(self, v => v
            .iter()
            .map(|x| T::cast_from_numeric_scalar(&x.to_numeric_scalar()))
            .collect())
    }

    pub fn as_f32(&self) -> Result<&[f32], DTypeError> {
        match self {
            HostBuffer::F32(v) => Ok(v),
            other => Err(DTypeError::UnexpectedDType(DType::F32, other.dtype())),
        }
    }

    pub fn as_f64(&self) -> Result<&[f64], DTypeError> {
        match self {
            HostBuffer::F64(v) => Ok(v),
            other => Err(DTypeError::UnexpectedDType(DType::F64, other.dtype())),
        }
    }

    /// Raw view of the elements, for handing to host routines.
    pub fn as_bytes(&self) -> &[u8] {
        for_each_buffer!(self, v => bytemuck::cast_slice(v.as_slice()))
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.as_bytes().as_ptr()
    }
}

impl<T: NumericScalarType> From<Vec<T>> for HostBuffer {
    fn from(values: Vec<T>) -> Self {
        Self::from_vec(values)
    }
}
