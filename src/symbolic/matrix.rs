use crate::context::get_context;
use crate::dtype::DType;
use crate::host_buffer::HostBuffer;
use crate::layout::Layout;
use crate::numeric_scalar::{BinaryOp, NumericScalarType};
use crate::symbolic::elementwise::{assign_binary, copy_value};
use crate::symbolic::{AsValue, Scalar, Vector};
use crate::value::{Value, ValueData, ValueError};

/// A rank-2 value, indexed `(row, column)`.
#[derive(Debug, Clone)]
pub struct Matrix {
    value: Value,
}

impl Matrix {
    pub fn new(value: Value) -> Result<Self, ValueError> {
        value.layout().ensure_rank(2)?;
        Ok(Self { value })
    }

    /// Row-major host matrix.
    pub fn from_vec<T: NumericScalarType>(
        rows: u64,
        columns: u64,
        values: Vec<T>,
    ) -> Result<Self, ValueError> {
        if values.len() as u64 != rows * columns {
            return Err(ValueError::SizeMismatch(rows * columns, values.len() as u64));
        }
        let value = Value::from_host(HostBuffer::from_vec(values), Layout::new([rows, columns]))?;
        Ok(Self { value })
    }

    pub fn allocate(dtype: DType, rows: u64, columns: u64) -> Result<Self, ValueError> {
        let value = get_context()?.allocate(dtype, &Layout::new([rows, columns]))?;
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

    pub fn rows(&self) -> u64 {
        self.value.layout().extents()[0]
    }

    pub fn columns(&self) -> u64 {
        self.value.layout().extents()[1]
    }

    pub fn size(&self) -> u64 {
        self.value.size()
    }

    pub fn at(
        &self,
        row: impl Into<Scalar>,
        column: impl Into<Scalar>,
    ) -> Result<Scalar, ValueError> {
        let element = get_context()?.element(&self.value, &[row.into(), column.into()])?;
        Scalar::from_value(element)
    }

    /// One row as a vector view sharing this matrix's storage.
    pub fn row(&self, row: u64) -> Result<Vector, ValueError> {
        let layout = self.value.layout();
        let start = layout.offset(&[row, 0])?;
        let row_layout =
            Layout::with_increments([self.columns()], [layout.cumulative_increment(1)?])?;
        let value = match self.value.host_buffer() {
            Some((buffer, offset)) => Value::new(
                self.dtype(),
                row_layout,
                ValueData::Host {
                    buffer: buffer.clone(),
                    offset: offset + start as usize,
                },
            )?,
            None => {
                return Err(ValueError::NotImplemented(
                    "row views of emitted storage".to_string(),
                ));
            }
        };
        Vector::new(value)
    }

    pub fn to_vec<T: NumericScalarType>(&self) -> Result<Vec<T>, ValueError> {
        self.value.to_host_vec()
    }

    pub fn copy(&self) -> Result<Matrix, ValueError> {
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

    pub fn add(&self, rhs: &impl AsValue) -> Result<Matrix, ValueError> {
        let mut copy = self.copy()?;
        copy.add_assign(rhs)?;
        Ok(copy)
    }

    pub fn sub(&self, rhs: &impl AsValue) -> Result<Matrix, ValueError> {
        let mut copy = self.copy()?;
        copy.sub_assign(rhs)?;
        Ok(copy)
    }

    pub fn mul(&self, rhs: &impl AsValue) -> Result<Matrix, ValueError> {
        let mut copy = self.copy()?;
        copy.mul_assign(rhs)?;
        Ok(copy)
    }

    pub fn div(&self, rhs: &impl AsValue) -> Result<Matrix, ValueError> {
        let mut copy = self.copy()?;
        copy.div_assign(rhs)?;
        Ok(copy)
    }
}

impl AsValue for Matrix {
    fn as_value(&self) -> &Value {
        &self.value
    }
}

pub fn scalar_add_matrix(s: &Scalar, m: &Matrix) -> Result<Matrix, ValueError> {
    m.add(s)
}

pub fn scalar_mul_matrix(s: &Scalar, m: &Matrix) -> Result<Matrix, ValueError> {
    m.mul(s)
}
