use crate::context::get_context;
use crate::dtype::DType;
use crate::layout::Layout;
use crate::numeric_scalar::{BinaryOp, NumericScalarType};
use crate::symbolic::elementwise::{assign_binary, assign_binary_reversed, copy_value};
use crate::symbolic::{AsValue, Scalar};
use crate::value::{Value, ValueError};

/// A rank-1 value.
#[derive(Debug, Clone)]
pub struct Vector {
    value: Value,
}

impl Vector {
    pub fn new(value: Value) -> Result<Self, ValueError> {
        value.layout().ensure_rank(1)?;
        Ok(Self { value })
    }

    pub fn from_vec<T: NumericScalarType>(values: Vec<T>) -> Self {
        Self {
            value: Value::from_vec(values),
        }
    }

    /// Storage for `size` elements from the active context.
    pub fn allocate(dtype: DType, size: u64) -> Result<Self, ValueError> {
        let value = get_context()?.allocate(dtype, &Layout::new([size]))?;
        Ok(Self { value })
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

    pub fn size(&self) -> u64 {
        self.value.size()
    }

    pub fn at(&self, index: impl Into<Scalar>) -> Result<Scalar, ValueError> {
        let element = get_context()?.element(&self.value, &[index.into()])?;
        Scalar::from_value(element)
    }

    pub fn to_vec<T: NumericScalarType>(&self) -> Result<Vec<T>, ValueError> {
        self.value.to_host_vec()
    }

    pub fn copy(&self) -> Result<Vector, ValueError> {
        Ok(Self {
            value: copy_value(&self.value)?,
        })
    }

    pub fn add_assign(&mut self, rhs: &impl AsValue) -> Result<&mut Self, ValueError> {
        assign_binary(BinaryOp::Add, &self.value, rhs.as_value())?;
        Ok(self)
    }

    pub fn sub_assign(&mut self, rhs: &impl AsValue) -> Result<&mut Self, ValueError> {
        assign_binary(BinaryOp::Sub, &self.value, rhs.as_value())?;
        Ok(self)
    }

    pub fn mul_assign(&mut self, rhs: &impl AsValue) -> Result<&mut Self, ValueError> {
        assign_binary(BinaryOp::Mul, &self.value, rhs.as_value())?;
        Ok(self)
    }

    pub fn div_assign(&mut self, rhs: &impl AsValue) -> Result<&mut Self, ValueError> {
        assign_binary(BinaryOp::Div, &self.value, rhs.as_value())?;
        Ok(self)
    }

    pub fn add(&self, rhs: &impl AsValue) -> Result<Vector, ValueError> {
        let mut copy = self.copy()?;
        copy.add_assign(rhs)?;
        Ok(copy)
    }

    pub fn sub(&self, rhs: &impl AsValue) -> Result<Vector, ValueError> {
        let mut copy = self.copy()?;
        copy.sub_assign(rhs)?;
        Ok(copy)
    }

    pub fn mul(&self, rhs: &impl AsValue) -> Result<Vector, ValueError> {
        let mut copy = self.copy()?;
        copy.mul_assign(rhs)?;
        Ok(copy)
    }

    pub fn div(&self, rhs: &impl AsValue) -> Result<Vector, ValueError> {
        let mut copy = self.copy()?;
        copy.div_assign(rhs)?;
        Ok(copy)
    }
}

impl AsValue for Vector {
    fn as_value(&self) -> &Value {
        &self.value
    }
}

pub fn scalar_add_vector(s: &Scalar, v: &Vector) -> Result<Vector, ValueError> {
    v.add(s)
}

pub fn scalar_mul_vector(s: &Scalar, v: &Vector) -> Result<Vector, ValueError> {
    v.mul(s)
}

/// `s - v`, element by element.
pub fn scalar_sub_vector(s: &Scalar, v: &Vector) -> Result<Vector, ValueError> {
    let copy = v.copy()?;
    assign_binary_reversed(BinaryOp::Sub, copy.value(), s.value())?;
    Ok(copy)
}

/// `s / v`, element by element.
pub fn scalar_div_vector(s: &Scalar, v: &Vector) -> Result<Vector, ValueError> {
    let copy = v.copy()?;
    assign_binary_reversed(BinaryOp::Div, copy.value(), s.value())?;
    Ok(copy)
}
