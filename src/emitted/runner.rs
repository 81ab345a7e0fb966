use crate::emitted::{
    BufferId, BufferSource, CallArgument, EmittedFunction, EmittedModule, Instruction, Operand,
    ParameterBinding, RegisterId,
};
use crate::function::{HostArgument, HostFunction};
use crate::host_buffer::HostBuffer;
use crate::numeric_scalar::NumericScalar;
use crate::value::ValueError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// External symbols a compiled module may call into.
#[derive(Default, Clone)]
pub struct SymbolTable {
    symbols: HashMap<String, HostFunction>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        symbol: impl Into<String>,
        function: impl Fn(&[HostArgument]) -> Result<Option<NumericScalar>, ValueError> + 'static,
    ) {
        self.symbols.insert(symbol.into(), Rc::new(function));
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&HostFunction> {
        self.symbols.get(symbol)
    }
}

struct Frame {
    registers: HashMap<RegisterId, NumericScalar>,
    buffers: HashMap<BufferId, (Rc<RefCell<HostBuffer>>, usize)>,
}

impl Frame {
    fn operand(&self, operand: &Operand) -> Result<NumericScalar, ValueError> {
        match operand {
            Operand::Constant(x) => Ok(*x),
            Operand::Register(r) => self.registers.get(r).copied().ok_or_else(|| {
                ValueError::InvalidArgument(format!("register {r:?} read before assignment"))
            }),
        }
    }

    fn address(
        &self,
        buffer: &BufferId,
        offset: &Operand,
    ) -> Result<(Rc<RefCell<HostBuffer>>, usize), ValueError> {
        let (storage, base) = self.buffers.get(buffer).ok_or_else(|| {
            ValueError::InvalidArgument(format!("buffer {buffer:?} is not bound"))
        })?;
        let offset = self.operand(offset)?.as_index()? as usize;
        Ok((storage.clone(), base + offset))
    }
}

/// An emitted module whose call targets have all been resolved.
pub struct CompiledModule {
    module: EmittedModule,
    symbols: SymbolTable,
}

impl CompiledModule {
    pub(crate) fn new(module: EmittedModule, symbols: SymbolTable) -> Self {
        Self { module, symbols }
    }

    pub fn module(&self) -> &EmittedModule {
        &self.module
    }

    pub fn invoke(
        &self,
        name: &str,
        args: &[HostArgument],
    ) -> Result<Option<NumericScalar>, ValueError> {
        let function = self
            .module
            .get_function(name)
            .ok_or_else(|| ValueError::UnresolvedSymbol(name.to_string()))?;
        self.call_function(function, args)
    }

    fn call_function(
        &self,
        function: &EmittedFunction,
        args: &[HostArgument],
    ) -> Result<Option<NumericScalar>, ValueError> {
        if args.len() != function.parameters.len() {
            return Err(ValueError::InvalidArgument(format!(
                "{} takes {} arguments, {} were given",
                function.name,
                function.parameters.len(),
                args.len()
            )));
        }
        let mut frame = Frame {
            registers: HashMap::new(),
            buffers: HashMap::new(),
        };
        let bound = function.bindings.iter().zip(&function.parameters);
        for ((binding, parameter), arg) in bound.zip(args) {
            match (binding, arg) {
                (ParameterBinding::Register(register), HostArgument::Scalar(x)) => {
                    if x.dtype() != parameter.dtype {
                        return Err(ValueError::TypeMismatch(parameter.dtype, x.dtype()));
                    }
                    frame.registers.insert(*register, *x);
                }
                (ParameterBinding::Buffer(id), HostArgument::Buffer { buffer, offset }) => {
                    {
                        let storage = buffer.borrow();
                        if storage.dtype() != parameter.dtype {
                            return Err(ValueError::TypeMismatch(parameter.dtype, storage.dtype()));
                        }
                        let needed = *offset as u64 + parameter.layout.memory_size();
                        if (storage.len() as u64) < needed {
                            return Err(ValueError::SizeMismatch(needed, storage.len() as u64));
                        }
                    }
                    frame.buffers.insert(*id, (buffer.clone(), *offset));
                }
                _ => {
                    return Err(ValueError::InvalidArgument(format!(
                        "argument kind does not match parameter of {}",
                        function.name
                    )));
                }
            }
        }
        for declaration in &function.buffers {
            if declaration.source == BufferSource::Local {
                let storage = HostBuffer::zeros(declaration.dtype, declaration.len as usize);
                frame
                    .buffers
                    .insert(declaration.id, (Rc::new(RefCell::new(storage)), 0));
            }
        }
        self.execute(&mut frame, &function.body)?;
        match &function.result {
            Some(operand) => Ok(Some(frame.operand(operand)?)),
            None => Ok(None),
        }
    }

    fn execute(&self, frame: &mut Frame, instructions: &[Instruction]) -> Result<(), ValueError> {
        for instruction in instructions {
            match instruction {
                Instruction::Binary { output, op, a, b } => {
                    let value = frame.operand(a)?.binary(*op, &frame.operand(b)?)?;
                    frame.registers.insert(*output, value);
                }
                Instruction::Load {
                    output,
                    buffer,
                    offset,
                } => {
                    let (storage, index) = frame.address(buffer, offset)?;
                    let value = storage.borrow().get(index).ok_or_else(|| {
                        ValueError::InvalidArgument(format!(
                            "load from {buffer:?} at {index} is out of range"
                        ))
                    })?;
                    frame.registers.insert(*output, value);
                }
                Instruction::Store {
                    buffer,
                    offset,
                    value,
                } => {
                    let (storage, index) = frame.address(buffer, offset)?;
                    let value = frame.operand(value)?;
                    storage.borrow_mut().set(index, value)?;
                }
                Instruction::Loop {
                    induction,
                    extent,
                    body,
                } => {
                    for i in 0..*extent {
                        frame
                            .registers
                            .insert(*induction, NumericScalar::I64(i as i64));
                        self.execute(frame, body)?;
                    }
                }
                Instruction::Call {
                    symbol,
                    args,
                    output,
                } => {
                    let mut host_args = Vec::with_capacity(args.len());
                    for arg in args {
                        host_args.push(match arg {
                            CallArgument::Scalar(operand) => {
                                HostArgument::Scalar(frame.operand(operand)?)
                            }
                            CallArgument::Buffer { buffer, offset } => {
                                let (storage, index) = frame.address(buffer, offset)?;
                                HostArgument::Buffer {
                                    buffer: storage,
                                    offset: index,
                                }
                            }
                        });
                    }
                    let result = if let Some(function) =
                        self.module.functions.iter().find(|f| &f.symbol == symbol)
                    {
                        self.call_function(function, &host_args)?
                    } else {
                        let function = self
                            .symbols
                            .get(symbol)
                            .ok_or_else(|| ValueError::UnresolvedSymbol(symbol.clone()))?;
                        function(&host_args)?
                    };
                    if let Some(output) = output {
                        let value = result.ok_or_else(|| {
                            ValueError::InvalidArgument(format!("{symbol} returned no value"))
                        })?;
                        frame.registers.insert(*output, value);
                    }
                }
            }
        }
        Ok(())
    }
}
