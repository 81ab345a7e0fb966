//! Host implementations of the vendor dot kernels, bound under their
//! undecorated `cblas_*` names.
use crate::dtype::{DType, DTypeError};
use crate::emitted::SymbolTable;
use crate::function::HostArgument;
use crate::host_buffer::HostBuffer;
use crate::numeric_scalar::NumericScalar;
use crate::value::ValueError;
use ndarray::{ArrayView1, LinalgScalar, ShapeBuilder};

pub const SDOT: &str = "cblas_sdot";
pub const DDOT: &str = "cblas_ddot";

fn strided<T>(n: i32, data: &[T], inc: i32) -> Result<ArrayView1<'_, T>, ValueError> {
    if n < 0 {
        return Err(ValueError::InvalidArgument(format!("negative element count {n}")));
    }
    if inc <= 0 {
        return Err(ValueError::NotImplemented(format!("dot with increment {inc}")));
    }
    ArrayView1::from_shape((n as usize,).strides((inc as usize,)), data)
        .map_err(|e| ValueError::InvalidArgument(e.to_string()))
}

pub fn sdot(n: i32, x: &[f32], incx: i32, y: &[f32], incy: i32) -> Result<f32, ValueError> {
    Ok(strided(n, x, incx)?.dot(&strided(n, y, incy)?))
}

pub fn ddot(n: i32, x: &[f64], incx: i32, y: &[f64], incy: i32) -> Result<f64, ValueError> {
    Ok(strided(n, x, incx)?.dot(&strided(n, y, incy)?))
}

fn int_argument(arg: &HostArgument) -> Result<i32, ValueError> {
    match arg.as_scalar()? {
        NumericScalar::I32(x) => Ok(x),
        other => Err(ValueError::TypeMismatch(DType::I32, other.dtype())),
    }
}

type Kernel<T> = fn(i32, &[T], i32, &[T], i32) -> Result<T, ValueError>;

fn host_dot<T: LinalgScalar>(
    args: &[HostArgument],
    slice: fn(&HostBuffer) -> Result<&[T], DTypeError>,
    kernel: Kernel<T>,
) -> Result<T, ValueError> {
    let [n, x, incx, y, incy] = args else {
        return Err(ValueError::InvalidArgument(format!(
            "dot takes 5 arguments, {} were given",
            args.len()
        )));
    };
    let (x_buffer, x_offset) = x.as_buffer()?;
    let (y_buffer, y_offset) = y.as_buffer()?;
    let x_buffer = x_buffer.borrow();
    let y_buffer = y_buffer.borrow();
    let x_data = slice(&x_buffer)?
        .get(x_offset..)
        .ok_or_else(|| ValueError::InvalidArgument(format!("offset {x_offset} is out of range")))?;
    let y_data = slice(&y_buffer)?
        .get(y_offset..)
        .ok_or_else(|| ValueError::InvalidArgument(format!("offset {y_offset} is out of range")))?;
    kernel(
        int_argument(n)?,
        x_data,
        int_argument(incx)?,
        y_data,
        int_argument(incy)?,
    )
}

pub fn cblas_sdot(args: &[HostArgument]) -> Result<Option<NumericScalar>, ValueError> {
    Ok(Some(NumericScalar::F32(host_dot(args, HostBuffer::as_f32, sdot)?)))
}

pub fn cblas_ddot(args: &[HostArgument]) -> Result<Option<NumericScalar>, ValueError> {
    Ok(Some(NumericScalar::F64(host_dot(args, HostBuffer::as_f64, ddot)?)))
}

/// Makes the kernels resolvable by compiled modules.
pub fn register_symbols(symbols: &mut SymbolTable) {
    symbols.insert(SDOT, cblas_sdot);
    symbols.insert(DDOT, cblas_ddot);
}
