use crate::value_tests::{Runner, scalar_f64};
use half::f16;
use valueflow::dtype::DType;
use valueflow::host_buffer::HostBuffer;
use valueflow::layout::Layout;
use valueflow::symbolic::{Matrix, Scalar, Vector, accumulate, dot, dot_generic, sum, sum_vector};
use valueflow::value::{Value, ValueError};

fn run_dot(runner: &Runner, a: Value, b: Value, dtype: DType) -> Result<f64, ValueError> {
    let result = runner.run(&[a, b], Some(dtype), |params| {
        let product = dot(&Vector::new(params[0].clone())?, &Vector::new(params[1].clone())?)?;
        Ok(Some(product.into_value()))
    })?;
    Ok(scalar_f64(result))
}

pub fn test_dot_fp32(runner: &Runner) {
    let a = Value::from_vec(vec![1.0f32, 2.0, 3.0]);
    let b = Value::from_vec(vec![4.0f32, 5.0, 6.0]);
    assert_eq!(run_dot(runner, a, b, DType::F32).unwrap(), 32.0);
}

pub fn test_dot_fp64(runner: &Runner) {
    let a = Value::from_vec(vec![0.5f64, -1.5, 2.0, 4.0]);
    let b = Value::from_vec(vec![2.0f64, 2.0, 0.25, -1.0]);
    assert_eq!(run_dot(runner, a, b, DType::F64).unwrap(), -5.5);
}

pub fn test_dot_i32(runner: &Runner) {
    let a = Value::from_vec(vec![1i32, -2, 3]);
    let b = Value::from_vec(vec![4i32, 5, 6]);
    assert_eq!(run_dot(runner, a, b, DType::I32).unwrap(), 12.0);
}

pub fn test_dot_f16(runner: &Runner) {
    let a = Value::from_vec(vec![f16::from_f32(0.5), f16::from_f32(2.0)]);
    let b = Value::from_vec(vec![f16::from_f32(3.0), f16::from_f32(0.25)]);
    assert_eq!(run_dot(runner, a, b, DType::F16).unwrap(), 2.0);
}

pub fn test_dot_strided_fp32(runner: &Runner) {
    // Every other element of a six element buffer.
    let a = Value::from_host(
        HostBuffer::from_vec(vec![1.0f32, 100.0, 2.0, 100.0, 3.0, 100.0]),
        Layout::with_increments([3], [2]).unwrap(),
    )
    .unwrap();
    let b = Value::from_vec(vec![1.0f32, 1.0, 1.0]);
    assert_eq!(run_dot(runner, a, b, DType::F32).unwrap(), 6.0);
}

pub fn test_dot_matches_dot_generic(runner: &Runner) {
    let a = Value::from_vec(vec![0.25f64, 1.0, -3.0, 7.5]);
    let b = Value::from_vec(vec![4.0f64, -1.0, 0.5, 2.0]);
    let result = runner
        .run(&[a, b], Some(DType::F64), |params| {
            let a = Vector::new(params[0].clone())?;
            let b = Vector::new(params[1].clone())?;
            let difference = dot(&a, &b)?.sub(&dot_generic(&a, &b)?)?;
            Ok(Some(difference.into_value()))
        })
        .unwrap();
    assert_eq!(scalar_f64(result), 0.0);
}

pub fn test_dot_size_mismatch(runner: &Runner) {
    let a = Value::from_vec(vec![1.0f32, 2.0, 3.0]);
    let b = Value::from_vec(vec![1.0f32, 2.0]);
    assert!(matches!(
        run_dot(runner, a, b, DType::F32),
        Err(ValueError::SizeMismatch(3, 2))
    ));
}

pub fn test_dot_type_mismatch(runner: &Runner) {
    let a = Value::from_vec(vec![1.0f32, 2.0]);
    let b = Value::from_vec(vec![1.0f64, 2.0]);
    assert!(matches!(
        run_dot(runner, a, b, DType::F32),
        Err(ValueError::TypeMismatch(DType::F32, DType::F64))
    ));
}

pub fn test_sum_matrix_i64(runner: &Runner) {
    let m = Matrix::from_vec(2, 2, vec![1i64, 2, 3, 4]).unwrap().into_value();
    let result = runner
        .run(&[m], Some(DType::I64), |params| {
            Ok(Some(sum(&Matrix::new(params[0].clone())?)?.into_value()))
        })
        .unwrap();
    assert_eq!(scalar_f64(result), 10.0);
}

pub fn test_sum_vector_fp32(runner: &Runner) {
    let v = Value::from_vec(vec![0.5f32, 0.25, 4.0]);
    let result = runner
        .run(&[v], Some(DType::F32), |params| {
            Ok(Some(sum_vector(&Vector::new(params[0].clone())?)?.into_value()))
        })
        .unwrap();
    assert_eq!(scalar_f64(result), 4.75);
}

pub fn test_accumulate_fp64(runner: &Runner) {
    let v = Value::from_vec(vec![1.0f64, 2.0, 3.0]);
    let result = runner
        .run(&[v], Some(DType::F64), |params| {
            let total = accumulate(&Vector::new(params[0].clone())?, &Scalar::from(0.5f64))?;
            Ok(Some(total.into_value()))
        })
        .unwrap();
    assert_eq!(scalar_f64(result), 6.5);
}

pub fn test_accumulate_empty(runner: &Runner) {
    let v = Value::from_vec(Vec::<f64>::new());
    let result = runner
        .run(&[v], Some(DType::F64), |params| {
            let total = accumulate(&Vector::new(params[0].clone())?, &Scalar::from(0.5f64))?;
            Ok(Some(total.into_value()))
        })
        .unwrap();
    assert_eq!(scalar_f64(result), 0.5);
}
