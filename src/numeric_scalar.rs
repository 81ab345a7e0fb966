use crate::dtype::{DType, DTypeOfPrimitive};
use crate::host_buffer::HostBuffer;
use crate::value::ValueError;
use half::{bf16, f16};
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, Num, ToPrimitive};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn apply<T: Num + Copy>(&self, a: T, b: T) -> Result<T, ValueError> {
        Ok(match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        })
    }

    fn apply_integer<T>(&self, a: T, b: T) -> Result<T, ValueError>
    where
        T: Num + CheckedAdd + CheckedSub + CheckedMul + CheckedDiv + Copy,
    {
        if matches!(self, BinaryOp::Div) && b.is_zero() {
            return Err(ValueError::DivisionByZero);
        }
        let result = match self {
            BinaryOp::Add => a.checked_add(&b),
            BinaryOp::Sub => a.checked_sub(&b),
            BinaryOp::Mul => a.checked_mul(&b),
            BinaryOp::Div => a.checked_div(&b),
        };
        result.ok_or(ValueError::IntegerOverflow(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NumericScalar {
    F64(f64),
    F32(f32),
    BF16(bf16),
    F16(f16),
    I64(i64),
    I32(i32),
}

impl NumericScalar {
    pub fn dtype(&self) -> DType {
        match self {
            NumericScalar::F64(_) => DType::F64,
            NumericScalar::F32(_) => DType::F32,
            NumericScalar::BF16(_) => DType::BF16,
            NumericScalar::F16(_) => DType::F16,
            NumericScalar::I64(_) => DType::I64,
            NumericScalar::I32(_) => DType::I32,
        }
    }

    pub fn zero_of(dtype: DType) -> Self {
        match dtype {
            DType::F64 => NumericScalar::F64(0.0),
            DType::F32 => NumericScalar::F32(0.0),
            DType::BF16 => NumericScalar::BF16(bf16::ZERO),
            DType::F16 => NumericScalar::F16(f16::ZERO),
            DType::I64 => NumericScalar::I64(0),
            DType::I32 => NumericScalar::I32(0),
        }
    }

    /// Applies `op` with `self` on the left. Both sides must share a dtype.
    pub fn binary(&self, op: BinaryOp, rhs: &NumericScalar) -> Result<NumericScalar, ValueError> {
        Ok(match (self, rhs) {
            (NumericScalar::F64(a), NumericScalar::F64(b)) => NumericScalar::F64(op.apply(*a, *b)?),
            (NumericScalar::F32(a), NumericScalar::F32(b)) => NumericScalar::F32(op.apply(*a, *b)?),
            (NumericScalar::BF16(a), NumericScalar::BF16(b)) => {
                NumericScalar::BF16(op.apply(*a, *b)?)
            }
            (NumericScalar::F16(a), NumericScalar::F16(b)) => NumericScalar::F16(op.apply(*a, *b)?),
            (NumericScalar::I64(a), NumericScalar::I64(b)) => {
                NumericScalar::I64(op.apply_integer(*a, *b)?)
            }
            (NumericScalar::I32(a), NumericScalar::I32(b)) => {
                NumericScalar::I32(op.apply_integer(*a, *b)?)
            }
            (a, b) => return Err(ValueError::TypeMismatch(a.dtype(), b.dtype())),
        })
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            NumericScalar::F64(x) => *x,
            NumericScalar::F32(x) => *x as f64,
            NumericScalar::BF16(x) => f64::from(*x),
            NumericScalar::F16(x) => f64::from(*x),
            NumericScalar::I64(x) => *x as f64,
            NumericScalar::I32(x) => *x as f64,
        }
    }

    /// Interprets the scalar as a coordinate into a layout.
    pub fn as_index(&self) -> Result<u64, ValueError> {
        let index = match self {
            NumericScalar::I64(x) => x.to_u64(),
            NumericScalar::I32(x) => x.to_u64(),
            _ => None,
        };
        index.ok_or_else(|| ValueError::InvalidArgument(format!("{self:?} is not a valid index")))
    }

    pub fn cast(&self, dtype: DType) -> NumericScalar {
        let x = self.to_f64();
        match dtype {
            DType::F64 => NumericScalar::F64(x),
            DType::F32 => NumericScalar::F32(x as f32),
            DType::BF16 => NumericScalar::BF16(bf16::from_f64(x)),
            DType::F16 => NumericScalar::F16(f16::from_f64(x)),
            DType::I64 => match self {
                NumericScalar::I32(v) => NumericScalar::I64(*v as i64),
                NumericScalar::I64(v) => NumericScalar::I64(*v),
                _ => NumericScalar::I64(x as i64),
            },
            DType::I32 => match self {
                NumericScalar::I32(v) => NumericScalar::I32(*v),
                _ => NumericScalar::I32(x as i32),
            },
        }
    }
}

pub trait NumericScalarType: DTypeOfPrimitive + Copy {
    fn to_numeric_scalar(self) -> NumericScalar;
    fn cast_from_numeric_scalar(value: &NumericScalar) -> Self;
    fn into_host_buffer(values: Vec<Self>) -> HostBuffer;
}

macro_rules! impl_numeric_scalar_type {
    ($t:ty, $variant:ident) => {
        impl NumericScalarType for $t {
            fn to_numeric_scalar(self) -> NumericScalar {
                NumericScalar::$variant(self)
            }
            fn cast_from_numeric_scalar(value: &NumericScalar) -> Self {
                match value.cast(<$t as DTypeOfPrimitive>::DTYPE) {
                    NumericScalar::$variant(v) => v,
                    _ => unreachable!(),
                }
            }
            fn into_host_buffer(values: Vec<Self>) -> HostBuffer {
                HostBuffer::$variant(values)
            }
        }

        impl From<$t> for NumericScalar {
            fn from(value: $t) -> Self {
                NumericScalar::$variant(value)
            }
        }
    };
}

impl_numeric_scalar_type!(f64, F64);
impl_numeric_scalar_type!(f32, F32);
impl_numeric_scalar_type!(bf16, BF16);
impl_numeric_scalar_type!(f16, F16);
impl_numeric_scalar_type!(i64, I64);
impl_numeric_scalar_type!(i32, I32);
