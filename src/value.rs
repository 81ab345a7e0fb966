use crate::context::ContextKind;
use crate::dtype::{DType, DTypeError};
use crate::emitted::{BufferId, Operand, RegisterId};
use crate::host_buffer::HostBuffer;
use crate::layout::{Layout, LayoutError};
use crate::numeric_scalar::{BinaryOp, NumericScalar, NumericScalarType};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("Size mismatch: {0} vs {1}")]
    SizeMismatch(u64, u64),
    #[error("Type mismatch: {0} vs {1}")]
    TypeMismatch(DType, DType),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Not implemented: {0}")]
    NotImplemented(String),
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
    #[error("No execution context is active")]
    NoActiveContext,
    #[error("Value cannot be used from the {0} context")]
    ForeignValue(ContextKind),
    #[error("Integer division by zero")]
    DivisionByZero,
    #[error("Integer overflow in {0}")]
    IntegerOverflow(BinaryOp),
    #[error("Unresolved symbol: {0}")]
    UnresolvedSymbol(String),
    #[error(transparent)]
    LayoutError(#[from] LayoutError),
    #[error(transparent)]
    DTypeError(#[from] DTypeError),
}

/// Where the data of a [`Value`] lives.
#[derive(Debug, Clone)]
pub enum ValueData {
    /// An immediate, usable from every context.
    Constant(NumericScalar),
    /// Storage on the host, read and written directly by the compute context.
    Host {
        buffer: Rc<RefCell<HostBuffer>>,
        offset: usize,
    },
    /// Storage declared in a program being emitted.
    Buffer { buffer: BufferId, offset: Operand },
    /// The result of an emitted instruction.
    Register(RegisterId),
}

/// A typed handle: an element type bound to a layout and the data behind it.
#[derive(Debug, Clone)]
pub struct Value {
    dtype: DType,
    layout: Layout,
    data: ValueData,
}

impl Value {
    pub fn new(dtype: DType, layout: Layout, data: ValueData) -> Result<Self, ValueError> {
        match &data {
            ValueData::Constant(x) => {
                if x.dtype() != dtype {
                    return Err(ValueError::TypeMismatch(dtype, x.dtype()));
                }
                layout.ensure_rank(0)?;
            }
            ValueData::Register(_) => layout.ensure_rank(0)?,
            ValueData::Host { buffer, offset } => {
                let buffer = buffer.borrow();
                if buffer.dtype() != dtype {
                    return Err(ValueError::TypeMismatch(dtype, buffer.dtype()));
                }
                let needed = *offset as u64 + layout.memory_size();
                if needed > buffer.len() as u64 {
                    return Err(ValueError::SizeMismatch(buffer.len() as u64, needed));
                }
            }
            ValueData::Buffer { .. } => {}
        }
        Ok(Self {
            dtype,
            layout,
            data,
        })
    }

    pub fn constant(value: impl Into<NumericScalar>) -> Self {
        let value = value.into();
        Self {
            dtype: value.dtype(),
            layout: Layout::scalar(),
            data: ValueData::Constant(value),
        }
    }

    /// Wraps host data of the given shape. The buffer length must cover the layout.
    pub fn from_host(buffer: HostBuffer, layout: Layout) -> Result<Self, ValueError> {
        let dtype = buffer.dtype();
        Self::new(
            dtype,
            layout,
            ValueData::Host {
                buffer: Rc::new(RefCell::new(buffer)),
                offset: 0,
            },
        )
    }

    pub fn from_vec<T: NumericScalarType>(values: Vec<T>) -> Self {
        let layout = Layout::new(vec![values.len() as u64]);
        Self {
            dtype: T::DTYPE,
            layout,
            data: ValueData::Host {
                buffer: Rc::new(RefCell::new(HostBuffer::from_vec(values))),
                offset: 0,
            },
        }
    }

    pub(crate) fn register(dtype: DType, register: RegisterId) -> Self {
        Self {
            dtype,
            layout: Layout::scalar(),
            data: ValueData::Register(register),
        }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn data(&self) -> &ValueData {
        &self.data
    }

    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    pub fn size(&self) -> u64 {
        self.layout.num_elements()
    }

    pub fn is_addressable(&self) -> bool {
        matches!(self.data, ValueData::Host { .. } | ValueData::Buffer { .. })
    }

    /// 1 for values that refer to storage, 0 for immediates and registers.
    pub fn pointer_level(&self) -> u8 {
        if self.is_addressable() { 1 } else { 0 }
    }

    /// Same data, viewed through another layout.
    pub fn with_layout(&self, layout: Layout) -> Result<Self, ValueError> {
        Self::new(self.dtype, layout, self.data.clone())
    }

    pub fn host_buffer(&self) -> Option<(&Rc<RefCell<HostBuffer>>, usize)> {
        match &self.data {
            ValueData::Host { buffer, offset } => Some((buffer, *offset)),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<NumericScalar> {
        match &self.data {
            ValueData::Constant(x) => Some(*x),
            _ => None,
        }
    }

    /// Reads a host or constant value element by element in layout order.
    pub fn to_host_vec<T: NumericScalarType>(&self) -> Result<Vec<T>, ValueError> {
        match &self.data {
            ValueData::Constant(x) => Ok(vec![T::cast_from_numeric_scalar(x)]),
            ValueData::Host { buffer, offset } => {
                let buffer = buffer.borrow();
                let mut out = Vec::with_capacity(self.size() as usize);
                for coordinate in self.layout.coordinates() {
                    let index = *offset + self.layout.offset(&coordinate)? as usize;
                    let element = buffer.get(index).ok_or_else(|| {
                        ValueError::InvalidArgument(format!("index {index} out of range"))
                    })?;
                    out.push(T::cast_from_numeric_scalar(&element));
                }
                Ok(out)
            }
            _ => Err(ValueError::ForeignValue(ContextKind::Compute)),
        }
    }

    pub fn ensure_dtype(&self, dtype: DType) -> Result<(), ValueError> {
        if self.dtype != dtype {
            return Err(ValueError::TypeMismatch(dtype, self.dtype));
        }
        Ok(())
    }
}
