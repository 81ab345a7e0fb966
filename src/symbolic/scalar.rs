use crate::context::get_context;
use crate::dtype::DType;
use crate::layout::Layout;
use crate::numeric_scalar::{BinaryOp, NumericScalar, NumericScalarType};
use crate::symbolic::AsValue;
use crate::symbolic::elementwise::{assign_binary, copy_value};
use crate::value::{Value, ValueData, ValueError};

/// A rank-0 value.
///
/// A scalar backed by storage (an element view, or the result of `copy` or
/// `allocate`) is written through by the compound assignments. An immediate
/// or register scalar is rebound to the result instead, so accumulators
/// updated inside a loop body must be given storage before the loop.
#[derive(Debug, Clone)]
pub struct Scalar {
    value: Value,
}

impl Scalar {
    pub fn from_value(value: Value) -> Result<Self, ValueError> {
        value.layout().ensure_rank(0)?;
        Ok(Self { value })
    }

    /// Zero-initialised storage from the active context.
    pub fn allocate(dtype: DType) -> Result<Self, ValueError> {
        let scalar = Self::from(NumericScalar::zero_of(dtype));
        let value = get_context()?.allocate(dtype, &Layout::scalar())?;
        let allocated = Self { value };
        allocated.set(&scalar)?;
        Ok(allocated)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn dtype(&self) -> DType {
        self.value.dtype()
    }

    /// The numeric contents, readable when the data lives on the host.
    pub fn get(&self) -> Result<NumericScalar, ValueError> {
        match self.value.data() {
            ValueData::Constant(x) => Ok(*x),
            ValueData::Host { buffer, offset } => buffer.borrow().get(*offset).ok_or_else(|| {
                ValueError::InvalidArgument(format!("host offset {offset} is out of range"))
            }),
            _ => Err(ValueError::InvalidArgument(
                "scalar is not resident on the host".to_string(),
            )),
        }
    }

    pub fn get_as<T: NumericScalarType>(&self) -> Result<T, ValueError> {
        Ok(T::cast_from_numeric_scalar(&self.get()?))
    }

    pub fn copy(&self) -> Result<Scalar, ValueError> {
        Ok(Self {
            value: copy_value(&self.value)?,
        })
    }

    /// Writes `source` into this scalar's storage.
    pub fn set(&self, source: &Scalar) -> Result<(), ValueError> {
        get_context()?.store(&self.value, &source.value)
    }

    /// `self op rhs` as a new rvalue, without allocating storage.
    pub fn combine(&self, op: BinaryOp, rhs: &Scalar) -> Result<Scalar, ValueError> {
        Self::from_value(get_context()?.binary(op, &self.value, &rhs.value)?)
    }

    fn compound(&mut self, op: BinaryOp, rhs: &Scalar) -> Result<&mut Self, ValueError> {
        if self.value.is_addressable() {
            assign_binary(op, &self.value, &rhs.value)?;
        } else {
            rhs.value.ensure_dtype(self.dtype())?;
            self.value = get_context()?.binary(op, &self.value, &rhs.value)?;
        }
        Ok(self)
    }

    pub fn add_assign(&mut self, rhs: &Scalar) -> Result<&mut Self, ValueError> {
        self.compound(BinaryOp::Add, rhs)
    }

    pub fn sub_assign(&mut self, rhs: &Scalar) -> Result<&mut Self, ValueError> {
        self.compound(BinaryOp::Sub, rhs)
    }

    pub fn mul_assign(&mut self, rhs: &Scalar) -> Result<&mut Self, ValueError> {
        self.compound(BinaryOp::Mul, rhs)
    }

    pub fn div_assign(&mut self, rhs: &Scalar) -> Result<&mut Self, ValueError> {
        self.compound(BinaryOp::Div, rhs)
    }

    pub fn add(&self, rhs: &Scalar) -> Result<Scalar, ValueError> {
        let mut copy = self.copy()?;
        copy.add_assign(rhs)?;
        Ok(copy)
    }

    pub fn sub(&self, rhs: &Scalar) -> Result<Scalar, ValueError> {
        let mut copy = self.copy()?;
        copy.sub_assign(rhs)?;
        Ok(copy)
    }

    pub fn mul(&self, rhs: &Scalar) -> Result<Scalar, ValueError> {
        let mut copy = self.copy()?;
        copy.mul_assign(rhs)?;
        Ok(copy)
    }

    pub fn div(&self, rhs: &Scalar) -> Result<Scalar, ValueError> {
        let mut copy = self.copy()?;
        copy.div_assign(rhs)?;
        Ok(copy)
    }
}

impl AsValue for Scalar {
    fn as_value(&self) -> &Value {
        &self.value
    }
}

impl<T: NumericScalarType> From<T> for Scalar {
    fn from(value: T) -> Self {
        Self {
            value: Value::constant(value.to_numeric_scalar()),
        }
    }
}

impl From<NumericScalar> for Scalar {
    fn from(value: NumericScalar) -> Self {
        Self {
            value: Value::constant(value),
        }
    }
}

impl From<&Scalar> for Scalar {
    fn from(value: &Scalar) -> Self {
        value.clone()
    }
}
