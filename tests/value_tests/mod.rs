use std::rc::Rc;
use valueflow::blas;
use valueflow::context::{ComputeContext, EmitterConfig, EmitterContext, with_context};
use valueflow::dtype::DType;
use valueflow::emitted::{EmittedModule, SymbolTable};
use valueflow::function::{FunctionDeclaration, HostArgument, ValueType};
use valueflow::numeric_scalar::NumericScalar;
use valueflow::symbolic::Scalar;
use valueflow::value::{Value, ValueError};

pub mod elementwise;
pub mod iteration;
pub mod reductions;

/// How a test program is executed.
pub enum Runner {
    /// Directly, under the compute context.
    Compute,
    /// Emitted, serialised and reloaded, compiled, then invoked on the host.
    Emit,
}

impl Runner {
    /// Runs `program` over `inputs`, which must be host values. Outputs are
    /// observed by writing into the inputs; a rank-0 result of dtype
    /// `result` may also be returned.
    pub fn run(
        &self,
        inputs: &[Value],
        result: Option<DType>,
        program: impl FnOnce(&[Value]) -> Result<Option<Value>, ValueError>,
    ) -> Result<Option<NumericScalar>, ValueError> {
        let _ = env_logger::builder().is_test(true).try_init();
        match self {
            Runner::Compute => with_context(Rc::new(ComputeContext::new()), || {
                match program(inputs)? {
                    Some(value) => Ok(Some(Scalar::from_value(value)?.get()?)),
                    None => Ok(None),
                }
            }),
            Runner::Emit => {
                let mut declaration = FunctionDeclaration::new("program")
                    .parameters(inputs.iter().map(ValueType::of));
                if let Some(dtype) = result {
                    declaration = declaration.returns(ValueType::scalar(dtype));
                }
                let emitter = Rc::new(EmitterContext::new("test", EmitterConfig::default()));
                emitter.define_function(&declaration, program)?;
                let module = emitter.finish()?;

                let json = serde_json::to_string(&module).unwrap();
                let module: EmittedModule = serde_json::from_str(&json).unwrap();

                let mut symbols = SymbolTable::new();
                blas::register_symbols(&mut symbols);
                let compiled = module.compile(symbols)?;
                let args: Vec<_> = inputs
                    .iter()
                    .map(|x| {
                        let (buffer, offset) = x.host_buffer().unwrap();
                        HostArgument::Buffer {
                            buffer: buffer.clone(),
                            offset,
                        }
                    })
                    .collect();
                compiled.invoke("program", &args)
            }
        }
    }
}

pub fn assert_close(value: &[f64], correct: &[f64]) {
    assert_eq!(value.len(), correct.len());
    for (a, b) in value.iter().zip(correct) {
        let err = (a - b).abs();
        let limit = 1e-6 + 1e-5 * a.abs().max(b.abs());
        assert!(err < limit, "{a} != {b}: {err} < {limit}");
    }
}

pub fn scalar_f64(value: Option<NumericScalar>) -> f64 {
    value.expect("program returned no result").to_f64()
}
