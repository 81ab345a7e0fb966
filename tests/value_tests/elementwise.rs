use crate::value_tests::{Runner, assert_close};
use half::{bf16, f16};
use valueflow::dtype::DType;
use valueflow::numeric_scalar::BinaryOp;
use valueflow::symbolic::{
    Matrix, Scalar, Vector, copy_into, scalar_add_vector, scalar_div_vector, scalar_mul_matrix,
    scalar_sub_vector,
};
use valueflow::value::{Value, ValueError};

fn matrix_value(rows: u64, columns: u64, values: Vec<f32>) -> Value {
    Matrix::from_vec(rows, columns, values).unwrap().into_value()
}

pub fn test_add_vector_fp32(runner: &Runner) {
    let a = Value::from_vec(vec![0.15163845f32, 0.31361532, 5.393808]);
    let b = Value::from_vec(vec![1.3424649f32, 0.004955234, 6.920299]);
    let out = Value::from_vec(vec![0.0f32; 3]);
    runner
        .run(&[a.clone(), b, out.clone()], None, |params| {
            let a = Vector::new(params[0].clone())?;
            let b = Vector::new(params[1].clone())?;
            let sum = a.add(&b)?;
            copy_into(&params[2], sum.value())?;
            Ok(None)
        })
        .unwrap();
    let result: Vec<f64> = out.to_host_vec::<f32>().unwrap().into_iter().map(f64::from).collect();
    assert_close(&result, &[1.4941034, 0.31857055, 12.314107]);
    assert_eq!(
        a.to_host_vec::<f32>().unwrap(),
        vec![0.15163845f32, 0.31361532, 5.393808]
    );
}

pub fn test_add_vector_f16(runner: &Runner) {
    let a = Value::from_vec(vec![f16::from_f32(1.5), f16::from_f32(-0.25), f16::from_f32(8.0)]);
    let b = Value::from_vec(vec![f16::from_f32(2.25), f16::from_f32(0.5), f16::from_f32(0.125)]);
    let out = Value::from_vec(vec![f16::ZERO; 3]);
    runner
        .run(&[a, b, out.clone()], None, |params| {
            let sum = Vector::new(params[0].clone())?.add(&Vector::new(params[1].clone())?)?;
            copy_into(&params[2], sum.value())?;
            Ok(None)
        })
        .unwrap();
    assert_eq!(
        out.to_host_vec::<f16>().unwrap(),
        vec![f16::from_f32(3.75), f16::from_f32(0.25), f16::from_f32(8.125)]
    );
}

pub fn test_mul_vector_bf16(runner: &Runner) {
    let a = Value::from_vec(vec![bf16::from_f32(1.5), bf16::from_f32(-3.0)]);
    let out = Value::from_vec(vec![bf16::ZERO; 2]);
    runner
        .run(&[a, out.clone()], None, |params| {
            let product = Vector::new(params[0].clone())?.mul(&Scalar::from(bf16::from_f32(2.0)))?;
            copy_into(&params[1], product.value())?;
            Ok(None)
        })
        .unwrap();
    assert_eq!(
        out.to_host_vec::<bf16>().unwrap(),
        vec![bf16::from_f32(3.0), bf16::from_f32(-6.0)]
    );
}

pub fn test_sub_scalar_i32(runner: &Runner) {
    let v = Value::from_vec(vec![5i32, 0, -3]);
    let out = Value::from_vec(vec![0i32; 3]);
    runner
        .run(&[v.clone(), out.clone()], None, |params| {
            let difference = Vector::new(params[0].clone())?.sub(&Scalar::from(1i32))?;
            copy_into(&params[1], difference.value())?;
            Ok(None)
        })
        .unwrap();
    assert_eq!(out.to_host_vec::<i32>().unwrap(), vec![4, -1, -4]);
    assert_eq!(v.to_host_vec::<i32>().unwrap(), vec![5, 0, -3]);
}

pub fn test_scalar_first_forms_f64(runner: &Runner) {
    let v = Value::from_vec(vec![1.0f64, 2.0, 4.0]);
    let added = Value::from_vec(vec![0.0f64; 3]);
    let subtracted = Value::from_vec(vec![0.0f64; 3]);
    let divided = Value::from_vec(vec![0.0f64; 3]);
    runner
        .run(
            &[v.clone(), added.clone(), subtracted.clone(), divided.clone()],
            None,
            |params| {
                let v = Vector::new(params[0].clone())?;
                let s = Scalar::from(8.0f64);
                copy_into(&params[1], scalar_add_vector(&s, &v)?.value())?;
                copy_into(&params[2], scalar_sub_vector(&s, &v)?.value())?;
                copy_into(&params[3], scalar_div_vector(&s, &v)?.value())?;
                Ok(None)
            },
        )
        .unwrap();
    assert_eq!(added.to_host_vec::<f64>().unwrap(), vec![9.0, 10.0, 12.0]);
    assert_eq!(subtracted.to_host_vec::<f64>().unwrap(), vec![7.0, 6.0, 4.0]);
    assert_eq!(divided.to_host_vec::<f64>().unwrap(), vec![8.0, 4.0, 2.0]);
    assert_eq!(v.to_host_vec::<f64>().unwrap(), vec![1.0, 2.0, 4.0]);
}

pub fn test_compound_assign_in_place_i64(runner: &Runner) {
    let v = Value::from_vec(vec![1i64, -2, 3]);
    let w = Value::from_vec(vec![10i64, 20, 30]);
    runner
        .run(&[v.clone(), w], None, |params| {
            let mut v = Vector::new(params[0].clone())?;
            let w = Vector::new(params[1].clone())?;
            v.mul_assign(&Scalar::from(3i64))?.add_assign(&w)?;
            Ok(None)
        })
        .unwrap();
    assert_eq!(v.to_host_vec::<i64>().unwrap(), vec![13, 14, 39]);
}

pub fn test_matrix_ops_fp32(runner: &Runner) {
    let a = matrix_value(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let b = matrix_value(2, 3, vec![0.5, 0.5, 0.5, 1.0, 1.0, 1.0]);
    let summed = matrix_value(2, 3, vec![0.0; 6]);
    let scaled = matrix_value(2, 3, vec![0.0; 6]);
    runner
        .run(&[a, b, summed.clone(), scaled.clone()], None, |params| {
            let a = Matrix::new(params[0].clone())?;
            let b = Matrix::new(params[1].clone())?;
            copy_into(&params[2], a.add(&b)?.value())?;
            copy_into(&params[3], scalar_mul_matrix(&Scalar::from(2.0f32), &a)?.value())?;
            Ok(None)
        })
        .unwrap();
    assert_eq!(
        summed.to_host_vec::<f32>().unwrap(),
        vec![1.5, 2.5, 3.5, 5.0, 6.0, 7.0]
    );
    assert_eq!(
        scaled.to_host_vec::<f32>().unwrap(),
        vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]
    );
}

pub fn test_element_access(runner: &Runner) {
    let m = matrix_value(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
    let result = runner
        .run(&[m], Some(DType::F32), |params| {
            let m = Matrix::new(params[0].clone())?;
            let corner = m.at(1i64, 0i64)?.add(&m.at(0i64, 1i64)?)?;
            Ok(Some(corner.into_value()))
        })
        .unwrap();
    assert_eq!(result.unwrap().to_f64(), 5.0);
}

pub fn test_size_mismatch(runner: &Runner) {
    let a = Value::from_vec(vec![1.0f32, 2.0, 3.0]);
    let b = Value::from_vec(vec![1.0f32, 2.0]);
    let result = runner.run(&[a.clone(), b], None, |params| {
        Vector::new(params[0].clone())?.add(&Vector::new(params[1].clone())?)?;
        Ok(None)
    });
    assert!(matches!(result, Err(ValueError::SizeMismatch(3, 2))));
    assert_eq!(a.to_host_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0]);
}

pub fn test_type_mismatch(runner: &Runner) {
    let a = Value::from_vec(vec![1.0f32, 2.0]);
    let result = runner.run(&[a], None, |params| {
        let mut a = Vector::new(params[0].clone())?;
        a.add_assign(&Scalar::from(1i32))?;
        Ok(None)
    });
    assert!(matches!(
        result,
        Err(ValueError::TypeMismatch(DType::F32, DType::I32))
    ));
}

pub fn test_integer_overflow_is_an_error(runner: &Runner) {
    let v = Value::from_vec(vec![i32::MAX, 1]);
    let result = runner.run(&[v.clone()], None, |params| {
        Vector::new(params[0].clone())?.add(&Scalar::from(1i32))?;
        Ok(None)
    });
    assert!(matches!(
        result,
        Err(ValueError::IntegerOverflow(BinaryOp::Add))
    ));
    assert_eq!(v.to_host_vec::<i32>().unwrap(), vec![i32::MAX, 1]);

    let v = Value::from_vec(vec![i32::MIN]);
    let result = runner.run(&[v], None, |params| {
        Vector::new(params[0].clone())?.div(&Scalar::from(-1i32))?;
        Ok(None)
    });
    assert!(matches!(
        result,
        Err(ValueError::IntegerOverflow(BinaryOp::Div))
    ));
}
