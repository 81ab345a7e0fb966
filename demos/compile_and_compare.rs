use std::rc::Rc;
use valueflow::blas;
use valueflow::context::{ComputeContext, EmitterConfig, EmitterContext, with_context};
use valueflow::dtype::DType;
use valueflow::emitted::SymbolTable;
use valueflow::function::{FunctionDeclaration, HostArgument, ValueType};
use valueflow::layout::Layout;
use valueflow::symbolic::{Scalar, Vector, dot, dot_generic};
use valueflow::value::{Value, ValueError};

const SIZE: u64 = 1000;

/// `dot(a, b) + dot_generic(a, b)`, written once and run both ways.
fn program(params: &[Value]) -> Result<Option<Value>, ValueError> {
    let a = Vector::new(params[0].clone())?;
    let b = Vector::new(params[1].clone())?;
    let vendor = dot(&a, &b)?;
    let looped = dot_generic(&a, &b)?;
    Ok(Some(vendor.add(&looped)?.into_value()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let a = Value::from_vec((0..SIZE).map(|i| i as f64 * 0.5).collect::<Vec<_>>());
    let b = Value::from_vec((0..SIZE).map(|i| 1.0 / (i as f64 + 1.0)).collect::<Vec<_>>());

    let computed = with_context(Rc::new(ComputeContext::new()), || {
        let result = program(&[a.clone(), b.clone()])?;
        let result = result.ok_or_else(|| ValueError::InvalidArgument("no result".to_string()))?;
        Scalar::from_value(result)?.get()
    })?;
    println!("compute context: {}", computed.to_f64());

    let emitter = Rc::new(EmitterContext::new("demo", EmitterConfig::default()));
    let declaration = FunctionDeclaration::new("dots")
        .returns(ValueType::scalar(DType::F64))
        .parameters([
            ValueType::pointer(DType::F64, Layout::new([SIZE])),
            ValueType::pointer(DType::F64, Layout::new([SIZE])),
        ]);
    emitter.define_function(&declaration, program)?;
    let module = emitter.finish()?;
    println!(
        "emitted {} with {} bytes of local storage",
        module.functions[0].symbol,
        module.functions[0].local_storage_bytes()
    );

    let mut symbols = SymbolTable::new();
    blas::register_symbols(&mut symbols);
    let compiled = module.compile(symbols)?;
    let args = [&a, &b]
        .iter()
        .map(|x| {
            let (buffer, offset) = x
                .host_buffer()
                .ok_or_else(|| anyhow::anyhow!("inputs must be host values"))?;
            Ok(HostArgument::Buffer {
                buffer: buffer.clone(),
                offset,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let emitted = compiled
        .invoke("dots", &args)?
        .ok_or_else(|| anyhow::anyhow!("dots returned nothing"))?;
    println!("emitted program: {}", emitted.to_f64());

    let difference = (computed.to_f64() - emitted.to_f64()).abs();
    println!("difference: {difference}");
    Ok(())
}
