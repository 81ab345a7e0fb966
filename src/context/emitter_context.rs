use crate::context::{ContextKind, ExecutionContext, ForEachBody, enter_context};
use crate::dtype::DType;
use crate::emitted::{
    BufferDeclaration, BufferId, BufferSource, CallArgument, EmittedFunction, EmittedModule,
    Instruction, Operand, ParameterBinding, RegisterId,
};
use crate::function::{FunctionDeclaration, ValueType};
use crate::layout::Layout;
use crate::numeric_scalar::{BinaryOp, NumericScalar};
use crate::symbolic::Scalar;
use crate::value::{Value, ValueData, ValueError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Static storage budget of the programs an emitter may produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    pub max_buffers: usize,
    pub max_storage_bytes: u64,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            max_buffers: 256,
            max_storage_bytes: 1 << 20,
        }
    }
}

struct FunctionBuilder {
    name: String,
    symbol: String,
    parameters: Vec<ValueType>,
    bindings: Vec<ParameterBinding>,
    return_type: Option<ValueType>,
    buffers: Vec<BufferDeclaration>,
    blocks: Vec<Vec<Instruction>>,
    next_register: usize,
}

impl FunctionBuilder {
    fn new_register(&mut self) -> RegisterId {
        let register = RegisterId::new(self.next_register);
        self.next_register += 1;
        register
    }

    fn new_buffer(&mut self, dtype: DType, len: u64, source: BufferSource) -> BufferId {
        let id = BufferId::new(self.buffers.len());
        self.buffers.push(BufferDeclaration {
            id,
            dtype,
            len,
            source,
        });
        id
    }

    fn emit(&mut self, instruction: Instruction) {
        if let Some(block) = self.blocks.last_mut() {
            block.push(instruction);
        }
    }

    fn local_buffers(&self) -> impl Iterator<Item = &BufferDeclaration> {
        self.buffers
            .iter()
            .filter(|x| x.source == BufferSource::Local)
    }
}

#[derive(Default)]
struct EmitterState {
    functions: Vec<EmittedFunction>,
    current: Option<FunctionBuilder>,
    scope: u64,
}

/// Records operations as an instruction program instead of running them.
pub struct EmitterContext {
    module_name: String,
    config: EmitterConfig,
    state: RefCell<EmitterState>,
}

impl EmitterContext {
    pub fn new(module_name: impl Into<String>, config: EmitterConfig) -> Self {
        Self {
            module_name: module_name.into(),
            config,
            state: RefCell::new(EmitterState::default()),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    fn with_builder<R>(
        &self,
        f: impl FnOnce(&mut FunctionBuilder) -> Result<R, ValueError>,
    ) -> Result<R, ValueError> {
        let mut state = self.state.borrow_mut();
        let builder = state.current.as_mut().ok_or_else(|| {
            ValueError::InvalidArgument("no function is being emitted".to_string())
        })?;
        f(builder)
    }

    fn emit_binary(&self, op: BinaryOp, a: Operand, b: Operand) -> Result<Operand, ValueError> {
        if let (Operand::Constant(x), Operand::Constant(y)) = (&a, &b) {
            return Ok(Operand::Constant(x.binary(op, y)?));
        }
        self.with_builder(|builder| {
            let output = builder.new_register();
            builder.emit(Instruction::Binary { output, op, a, b });
            Ok(Operand::Register(output))
        })
    }

    /// Reads a rank-0 value into an operand, loading from storage if needed.
    fn operand(&self, value: &Value) -> Result<Operand, ValueError> {
        value.layout().ensure_rank(0)?;
        match value.data() {
            ValueData::Constant(x) => Ok(Operand::Constant(*x)),
            ValueData::Register(r) => Ok(Operand::Register(*r)),
            ValueData::Buffer { buffer, offset } => self.with_builder(|builder| {
                let output = builder.new_register();
                builder.emit(Instruction::Load {
                    output,
                    buffer: *buffer,
                    offset: offset.clone(),
                });
                Ok(Operand::Register(output))
            }),
            ValueData::Host { .. } => Err(ValueError::ForeignValue(ContextKind::Emitter)),
        }
    }

    fn operand_value(dtype: DType, operand: Operand) -> Value {
        match operand {
            Operand::Constant(x) => Value::constant(x),
            Operand::Register(r) => Value::register(dtype, r),
        }
    }

    fn index_operand(&self, coordinate: &Scalar, extent: u64) -> Result<Operand, ValueError> {
        let value = coordinate.value();
        if let Some(x) = value.as_constant() {
            let index = x.as_index()?;
            if index >= extent {
                return Err(ValueError::InvalidArgument(format!(
                    "index {index} is out of bounds for extent {extent}"
                )));
            }
            return Ok(Operand::Constant(NumericScalar::I64(index as i64)));
        }
        value.ensure_dtype(DType::I64)?;
        self.operand(value)
    }

    /// Emits the body of `declaration`. Parameters are handed to `body` as
    /// values bound to the caller's arguments; the returned value becomes the
    /// function result.
    pub fn define_function(
        self: &Rc<Self>,
        declaration: &FunctionDeclaration,
        body: impl FnOnce(&[Value]) -> Result<Option<Value>, ValueError>,
    ) -> Result<(), ValueError> {
        let parameters = {
            let mut state = self.state.borrow_mut();
            if state.current.is_some() {
                return Err(ValueError::InvalidArgument(
                    "functions cannot be defined while another is being emitted".to_string(),
                ));
            }
            let mut builder = FunctionBuilder {
                name: declaration.get_name().to_string(),
                symbol: declaration.symbol(&self.module_name),
                parameters: declaration.get_parameters().to_vec(),
                bindings: vec![],
                return_type: declaration.get_return_type().cloned(),
                buffers: vec![],
                blocks: vec![vec![]],
                next_register: 0,
            };
            let mut parameters = vec![];
            for (i, parameter) in declaration.get_parameters().iter().enumerate() {
                if parameter.pointer_level == 0 {
                    parameter.layout.ensure_rank(0)?;
                    let register = builder.new_register();
                    builder.bindings.push(ParameterBinding::Register(register));
                    parameters.push(Value::register(parameter.dtype, register));
                } else {
                    let id = builder.new_buffer(
                        parameter.dtype,
                        parameter.layout.memory_size(),
                        BufferSource::Parameter(i),
                    );
                    builder.bindings.push(ParameterBinding::Buffer(id));
                    parameters.push(Value::new(
                        parameter.dtype,
                        parameter.layout.clone(),
                        ValueData::Buffer {
                            buffer: id,
                            offset: Operand::Constant(NumericScalar::I64(0)),
                        },
                    )?);
                }
            }
            state.current = Some(builder);
            state.scope += 1;
            parameters
        };
        log::debug!(
            "Emitting function {} in module {}",
            declaration.get_name(),
            self.module_name
        );

        let outcome = (|| -> Result<Option<Operand>, ValueError> {
            let _guard = enter_context(self.clone());
            let result = body(&parameters)?;
            match (result, declaration.get_return_type()) {
                (Some(value), Some(return_type)) => {
                    value.ensure_dtype(return_type.dtype)?;
                    Ok(Some(self.operand(&value)?))
                }
                (None, None) => Ok(None),
                (Some(_), None) => Err(ValueError::InvalidArgument(format!(
                    "{} returns a value but declares no result",
                    declaration.get_name()
                ))),
                (None, Some(_)) => Err(ValueError::InvalidArgument(format!(
                    "{} declares a result but returns none",
                    declaration.get_name()
                ))),
            }
        })();

        let mut state = self.state.borrow_mut();
        let builder = state.current.take().ok_or_else(|| {
            ValueError::InvalidArgument("function builder vanished during emission".to_string())
        })?;
        let result = outcome?;
        let FunctionBuilder {
            name,
            symbol,
            parameters,
            bindings,
            return_type,
            buffers,
            mut blocks,
            ..
        } = builder;
        if blocks.len() != 1 {
            return Err(ValueError::InvalidArgument(format!(
                "{name} finished with {} open blocks",
                blocks.len()
            )));
        }
        let body = blocks.pop().unwrap_or_default();
        log::debug!("Emitted {symbol} with {} top-level instructions", body.len());
        state.functions.push(EmittedFunction {
            name,
            symbol,
            parameters,
            bindings,
            return_type,
            buffers,
            body,
            result,
        });
        Ok(())
    }

    pub fn finish(&self) -> Result<EmittedModule, ValueError> {
        let state = self.state.borrow();
        if state.current.is_some() {
            return Err(ValueError::InvalidArgument(
                "cannot finish a module while a function is being emitted".to_string(),
            ));
        }
        Ok(EmittedModule {
            name: self.module_name.clone(),
            functions: state.functions.clone(),
        })
    }
}

impl ExecutionContext for EmitterContext {
    fn kind(&self) -> ContextKind {
        ContextKind::Emitter
    }

    fn storage_scope(&self) -> u64 {
        self.state.borrow().scope
    }

    fn allocate(&self, dtype: DType, layout: &Layout) -> Result<Value, ValueError> {
        let config = &self.config;
        let id = self.with_builder(|builder| {
            let count = builder.local_buffers().count();
            if count >= config.max_buffers {
                return Err(ValueError::ResourceExhausted(format!(
                    "{} already declares {count} buffers",
                    builder.name
                )));
            }
            let used: u64 = builder
                .local_buffers()
                .map(|x| x.len * x.dtype.size() as u64)
                .sum();
            let requested = layout.memory_size() * dtype.size() as u64;
            if used + requested > config.max_storage_bytes {
                return Err(ValueError::ResourceExhausted(format!(
                    "{} needs {} bytes of storage, budget is {}",
                    builder.name,
                    used + requested,
                    config.max_storage_bytes
                )));
            }
            Ok(builder.new_buffer(dtype, layout.memory_size(), BufferSource::Local))
        })?;
        log::trace!("Declared buffer {id:?} of {dtype} for {layout:?}");
        Value::new(
            dtype,
            layout.clone(),
            ValueData::Buffer {
                buffer: id,
                offset: Operand::Constant(NumericScalar::I64(0)),
            },
        )
    }

    fn element(&self, value: &Value, coordinates: &[Scalar]) -> Result<Value, ValueError> {
        let layout = value.layout();
        layout.ensure_rank(coordinates.len())?;
        match value.data() {
            ValueData::Buffer { buffer, offset } => {
                let mut offset = offset.clone();
                for (dim, coordinate) in coordinates.iter().enumerate() {
                    let index = self.index_operand(coordinate, layout.extent(dim)?)?;
                    let increment = NumericScalar::I64(layout.cumulative_increment(dim)? as i64);
                    let term =
                        self.emit_binary(BinaryOp::Mul, index, Operand::Constant(increment))?;
                    offset = self.emit_binary(BinaryOp::Add, offset, term)?;
                }
                Value::new(
                    value.dtype(),
                    Layout::scalar(),
                    ValueData::Buffer {
                        buffer: *buffer,
                        offset,
                    },
                )
            }
            ValueData::Constant(_) | ValueData::Register(_) => Ok(value.clone()),
            ValueData::Host { .. } => Err(ValueError::ForeignValue(ContextKind::Emitter)),
        }
    }

    fn load(&self, value: &Value) -> Result<Value, ValueError> {
        Ok(Self::operand_value(value.dtype(), self.operand(value)?))
    }

    fn store(&self, destination: &Value, source: &Value) -> Result<(), ValueError> {
        destination.layout().ensure_rank(0)?;
        source.ensure_dtype(destination.dtype())?;
        match destination.data() {
            ValueData::Buffer { buffer, offset } => {
                let value = self.operand(source)?;
                self.with_builder(|builder| {
                    builder.emit(Instruction::Store {
                        buffer: *buffer,
                        offset: offset.clone(),
                        value,
                    });
                    Ok(())
                })
            }
            ValueData::Host { .. } => Err(ValueError::ForeignValue(ContextKind::Emitter)),
            _ => Err(ValueError::InvalidArgument(
                "cannot store into an immediate".to_string(),
            )),
        }
    }

    fn binary(&self, op: BinaryOp, a: &Value, b: &Value) -> Result<Value, ValueError> {
        b.ensure_dtype(a.dtype())?;
        let a_operand = self.operand(a)?;
        let b_operand = self.operand(b)?;
        let result = self.emit_binary(op, a_operand, b_operand)?;
        Ok(Self::operand_value(a.dtype(), result))
    }

    fn for_each(&self, layout: &Layout, body: &mut ForEachBody<'_>) -> Result<(), ValueError> {
        let mut inductions = Vec::with_capacity(layout.rank());
        for _ in 0..layout.rank() {
            inductions.push(self.with_builder(|builder| {
                let induction = builder.new_register();
                builder.blocks.push(vec![]);
                Ok(induction)
            })?);
        }
        let coordinates: Vec<Scalar> = inductions
            .iter()
            .map(|r| Scalar::from_value(Value::register(DType::I64, *r)))
            .collect::<Result<_, _>>()?;
        let result = body(&coordinates);
        // Close the loop nest innermost first, even if the body failed.
        for (dim, induction) in inductions.iter().enumerate().rev() {
            let extent = layout.extent(dim)?;
            self.with_builder(|builder| {
                let body = builder.blocks.pop().unwrap_or_default();
                builder.emit(Instruction::Loop {
                    induction: *induction,
                    extent,
                    body,
                });
                Ok(())
            })?;
        }
        result
    }

    fn call(
        &self,
        function: &FunctionDeclaration,
        args: &[Value],
    ) -> Result<Option<Value>, ValueError> {
        let symbol = function.symbol(&self.module_name);
        let mut call_args = Vec::with_capacity(args.len());
        for arg in args {
            call_args.push(match arg.data() {
                ValueData::Buffer { buffer, offset } => CallArgument::Buffer {
                    buffer: *buffer,
                    offset: offset.clone(),
                },
                ValueData::Constant(_) | ValueData::Register(_) => {
                    CallArgument::Scalar(self.operand(arg)?)
                }
                ValueData::Host { .. } => {
                    return Err(ValueError::ForeignValue(ContextKind::Emitter));
                }
            });
        }
        let return_type = function.get_return_type().cloned();
        log::trace!("Emitting call to {symbol}");
        self.with_builder(|builder| {
            let output = return_type.as_ref().map(|_| builder.new_register());
            builder.emit(Instruction::Call {
                symbol,
                args: call_args,
                output,
            });
            Ok(output
                .zip(return_type)
                .map(|(r, t)| Value::register(t.dtype, r)))
        })
    }
}
