use crate::context::{ContextKind, ExecutionContext, ForEachBody};
use crate::dtype::DType;
use crate::function::{FunctionDeclaration, HostArgument};
use crate::host_buffer::HostBuffer;
use crate::layout::Layout;
use crate::numeric_scalar::{BinaryOp, NumericScalar};
use crate::symbolic::Scalar;
use crate::value::{Value, ValueData, ValueError};

/// Interprets every operation immediately against host buffers.
#[derive(Debug, Default)]
pub struct ComputeContext {}

impl ComputeContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, value: &Value) -> Result<NumericScalar, ValueError> {
        value.layout().ensure_rank(0)?;
        match value.data() {
            ValueData::Constant(x) => Ok(*x),
            ValueData::Host { buffer, offset } => buffer.borrow().get(*offset).ok_or_else(|| {
                ValueError::InvalidArgument(format!("host offset {offset} is out of range"))
            }),
            _ => Err(ValueError::ForeignValue(ContextKind::Compute)),
        }
    }

    fn host_argument(&self, value: &Value) -> Result<HostArgument, ValueError> {
        match value.data() {
            ValueData::Constant(x) => Ok(HostArgument::Scalar(*x)),
            ValueData::Host { buffer, offset } => Ok(HostArgument::Buffer {
                buffer: buffer.clone(),
                offset: *offset,
            }),
            _ => Err(ValueError::ForeignValue(ContextKind::Compute)),
        }
    }
}

impl ExecutionContext for ComputeContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Compute
    }

    fn allocate(&self, dtype: DType, layout: &Layout) -> Result<Value, ValueError> {
        let buffer = HostBuffer::zeros(dtype, layout.memory_size() as usize);
        Value::from_host(buffer, layout.clone())
    }

    fn element(&self, value: &Value, coordinates: &[Scalar]) -> Result<Value, ValueError> {
        value.layout().ensure_rank(coordinates.len())?;
        let mut indices = Vec::with_capacity(coordinates.len());
        for coordinate in coordinates {
            indices.push(self.read(coordinate.value())?.as_index()?);
        }
        match value.data() {
            ValueData::Host { buffer, offset } => {
                let element_offset = offset + value.layout().offset(&indices)? as usize;
                Value::new(
                    value.dtype(),
                    Layout::scalar(),
                    ValueData::Host {
                        buffer: buffer.clone(),
                        offset: element_offset,
                    },
                )
            }
            ValueData::Constant(_) => Ok(value.clone()),
            _ => Err(ValueError::ForeignValue(ContextKind::Compute)),
        }
    }

    fn load(&self, value: &Value) -> Result<Value, ValueError> {
        Ok(Value::constant(self.read(value)?))
    }

    fn store(&self, destination: &Value, source: &Value) -> Result<(), ValueError> {
        destination.layout().ensure_rank(0)?;
        source.ensure_dtype(destination.dtype())?;
        let x = self.read(source)?;
        match destination.data() {
            ValueData::Host { buffer, offset } => buffer.borrow_mut().set(*offset, x),
            ValueData::Constant(_) => Err(ValueError::InvalidArgument(
                "cannot store into an immediate".to_string(),
            )),
            _ => Err(ValueError::ForeignValue(ContextKind::Compute)),
        }
    }

    fn binary(&self, op: BinaryOp, a: &Value, b: &Value) -> Result<Value, ValueError> {
        Ok(Value::constant(self.read(a)?.binary(op, &self.read(b)?)?))
    }

    fn for_each(&self, layout: &Layout, body: &mut ForEachBody<'_>) -> Result<(), ValueError> {
        for coordinate in layout.coordinates() {
            let scalars: Vec<Scalar> = coordinate.iter().map(|&c| Scalar::from(c as i64)).collect();
            body(&scalars)?;
        }
        Ok(())
    }

    fn call(
        &self,
        function: &FunctionDeclaration,
        args: &[Value],
    ) -> Result<Option<Value>, ValueError> {
        let definition = function.get_host_definition().ok_or_else(|| {
            ValueError::NotImplemented(format!("{} has no host definition", function.get_name()))
        })?;
        let host_args = args
            .iter()
            .map(|x| self.host_argument(x))
            .collect::<Result<Vec<_>, _>>()?;
        log::trace!("Calling host function {}", function.get_name());
        Ok(definition(&host_args)?.map(Value::constant))
    }
}
