use crate::blas;
use crate::context::{ContextKind, invoke_for_context};
use crate::dtype::DType;
use crate::function::{Decoration, FunctionDeclaration, HostArgument, ValueType};
use crate::numeric_scalar::{BinaryOp, NumericScalar};
use crate::symbolic::{Matrix, Scalar, Vector, for_matrix, for_vector};
use crate::value::{Value, ValueError};

/// `initial` plus every element of `vector`.
pub fn accumulate(vector: &Vector, initial: &Scalar) -> Result<Scalar, ValueError> {
    let mut result = initial.copy()?;
    for_vector(vector, |index| {
        result.add_assign(&vector.at(index)?)?;
        Ok(())
    })?;
    Ok(result)
}

pub fn sum_vector(vector: &Vector) -> Result<Scalar, ValueError> {
    let mut result = Scalar::allocate(vector.dtype())?;
    for_vector(vector, |index| {
        result.add_assign(&vector.at(index)?)?;
        Ok(())
    })?;
    Ok(result)
}

pub fn sum(matrix: &Matrix) -> Result<Scalar, ValueError> {
    let mut result = Scalar::allocate(matrix.dtype())?;
    for_matrix(matrix, |row, column| {
        result.add_assign(&matrix.at(row, column)?)?;
        Ok(())
    })?;
    Ok(result)
}

/// Inner product. Single and double precision go to the vendor kernels;
/// every other element type is reduced with a loop.
pub fn dot(v1: &Vector, v2: &Vector) -> Result<Scalar, ValueError> {
    if v1.size() != v2.size() {
        return Err(ValueError::SizeMismatch(v1.size(), v2.size()));
    }
    if v1.dtype() != v2.dtype() {
        return Err(ValueError::TypeMismatch(v1.dtype(), v2.dtype()));
    }
    match v1.dtype() {
        DType::F32 => vendor_dot(v1, v2, blas::SDOT, blas::cblas_sdot),
        DType::F64 => vendor_dot(v1, v2, blas::DDOT, blas::cblas_ddot),
        _ => dot_generic(v1, v2),
    }
}

/// Inner product as an explicit multiply-accumulate loop.
pub fn dot_generic(v1: &Vector, v2: &Vector) -> Result<Scalar, ValueError> {
    if v1.size() != v2.size() {
        return Err(ValueError::SizeMismatch(v1.size(), v2.size()));
    }
    let mut result = Scalar::allocate(v1.dtype())?;
    for_vector(v1, |index| {
        let product = v1.at(&index)?.combine(BinaryOp::Mul, &v2.at(&index)?)?;
        result.add_assign(&product)?;
        Ok(())
    })?;
    Ok(result)
}

fn int_constant(x: u64) -> Result<Value, ValueError> {
    let x = i32::try_from(x)
        .map_err(|_| ValueError::InvalidArgument(format!("{x} does not fit a 32-bit count")))?;
    Ok(Value::constant(x))
}

fn vendor_dot(
    v1: &Vector,
    v2: &Vector,
    symbol: &str,
    host: fn(&[HostArgument]) -> Result<Option<NumericScalar>, ValueError>,
) -> Result<Scalar, ValueError> {
    let dtype = v1.dtype();
    let declaration = FunctionDeclaration::new(symbol)
        .returns(ValueType::scalar(dtype))
        .parameters([
            ValueType::scalar(DType::I32),
            ValueType::pointer(dtype, v1.value().layout().clone()),
            ValueType::scalar(DType::I32),
            ValueType::pointer(dtype, v2.value().layout().clone()),
            ValueType::scalar(DType::I32),
        ]);
    let args = [
        int_constant(v1.size())?,
        v1.value().clone(),
        int_constant(v1.value().layout().cumulative_increment(0)?)?,
        v2.value().clone(),
        int_constant(v2.value().layout().cumulative_increment(0)?)?,
    ];
    let missing_result = || ValueError::InvalidArgument(format!("{symbol} produced no result"));

    if let Some(result) = invoke_for_context(ContextKind::Compute, |context| {
        declaration.clone().define(host).call_in(context, &args)
    })? {
        return Scalar::from_value(result.ok_or_else(missing_result)?);
    }
    if let Some(result) = invoke_for_context(ContextKind::Emitter, |context| {
        declaration
            .clone()
            .decorated(Decoration::Undecorated)
            .call_in(context, &args)
    })? {
        return Scalar::from_value(result.ok_or_else(missing_result)?);
    }
    Err(ValueError::NotImplemented(format!(
        "{symbol} is not available in the active context"
    )))
}

pub fn gemm(_m1: &Matrix, _m2: &Matrix) -> Result<Matrix, ValueError> {
    Err(ValueError::NotImplemented("GEMM".to_string()))
}

pub fn gemv(_m: &Matrix, _v: &Vector) -> Result<Vector, ValueError> {
    Err(ValueError::NotImplemented("GEMV".to_string()))
}
