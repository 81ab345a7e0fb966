//! Instruction program produced by the emitter context.
use crate::dtype::DType;
use crate::function::ValueType;
use crate::numeric_scalar::{BinaryOp, NumericScalar};
use crate::value::ValueError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

mod runner;

pub use runner::{CompiledModule, SymbolTable};

#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegisterId {
    inner: usize,
}

impl RegisterId {
    pub(crate) fn new(inner: usize) -> Self {
        Self { inner }
    }
}

#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct BufferId {
    inner: usize,
}

impl BufferId {
    pub(crate) fn new(inner: usize) -> Self {
        Self { inner }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Constant(NumericScalar),
    Register(RegisterId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CallArgument {
    Scalar(Operand),
    Buffer { buffer: BufferId, offset: Operand },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Binary {
        output: RegisterId,
        op: BinaryOp,
        a: Operand,
        b: Operand,
    },
    Load {
        output: RegisterId,
        buffer: BufferId,
        offset: Operand,
    },
    Store {
        buffer: BufferId,
        offset: Operand,
        value: Operand,
    },
    /// Runs `body` with `induction` bound to 0..extent.
    Loop {
        induction: RegisterId,
        extent: u64,
        body: Vec<Instruction>,
    },
    Call {
        symbol: String,
        args: Vec<CallArgument>,
        output: Option<RegisterId>,
    },
}

impl Instruction {
    fn collect_symbols<'a>(&'a self, symbols: &mut HashSet<&'a str>) {
        match self {
            Instruction::Call { symbol, .. } => {
                symbols.insert(symbol);
            }
            Instruction::Loop { body, .. } => {
                for instruction in body {
                    instruction.collect_symbols(symbols);
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferSource {
    Parameter(usize),
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferDeclaration {
    pub id: BufferId,
    pub dtype: DType,
    pub len: u64,
    pub source: BufferSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterBinding {
    Buffer(BufferId),
    Register(RegisterId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedFunction {
    pub name: String,
    pub symbol: String,
    pub parameters: Vec<ValueType>,
    pub bindings: Vec<ParameterBinding>,
    pub return_type: Option<ValueType>,
    pub buffers: Vec<BufferDeclaration>,
    pub body: Vec<Instruction>,
    pub result: Option<Operand>,
}

impl EmittedFunction {
    pub fn referenced_symbols(&self) -> HashSet<&str> {
        let mut symbols = HashSet::new();
        for instruction in &self.body {
            instruction.collect_symbols(&mut symbols);
        }
        symbols
    }

    pub fn local_storage_bytes(&self) -> u64 {
        self.buffers
            .iter()
            .filter(|x| x.source == BufferSource::Local)
            .map(|x| x.len * x.dtype.size() as u64)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedModule {
    pub name: String,
    pub functions: Vec<EmittedFunction>,
}

impl EmittedModule {
    /// Looks a function up by its declared name or its emitted symbol.
    pub fn get_function(&self, name: &str) -> Option<&EmittedFunction> {
        self.functions
            .iter()
            .find(|f| f.symbol == name)
            .or_else(|| self.functions.iter().find(|f| f.name == name))
    }

    /// Resolves every call target and produces an invocable module.
    pub fn compile(self, symbols: SymbolTable) -> Result<CompiledModule, ValueError> {
        for function in &self.functions {
            for symbol in function.referenced_symbols() {
                let internal = self.functions.iter().any(|f| f.symbol == symbol);
                if !internal && !symbols.contains(symbol) {
                    return Err(ValueError::UnresolvedSymbol(symbol.to_string()));
                }
            }
        }
        log::debug!(
            "Compiled module {} with {} functions",
            self.name,
            self.functions.len()
        );
        Ok(CompiledModule::new(self, symbols))
    }
}
