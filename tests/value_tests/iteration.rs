use crate::value_tests::Runner;
use valueflow::numeric_scalar::BinaryOp;
use valueflow::symbolic::{Matrix, Scalar, Vector, for_matrix, for_vector, gemm, gemv};
use valueflow::value::{Value, ValueError};

pub fn test_for_vector_indices(runner: &Runner) {
    let out = Value::from_vec(vec![0i64; 4]);
    runner
        .run(&[out.clone()], None, |params| {
            let out = Vector::new(params[0].clone())?;
            for_vector(&out, |i| {
                let doubled = i.combine(BinaryOp::Mul, &Scalar::from(2i64))?;
                out.at(&i)?.set(&doubled)
            })?;
            Ok(None)
        })
        .unwrap();
    assert_eq!(out.to_host_vec::<i64>().unwrap(), vec![0, 2, 4, 6]);
}

pub fn test_for_matrix_row_major(runner: &Runner) {
    let out = Matrix::from_vec(2, 3, vec![0i64; 6]).unwrap().into_value();
    runner
        .run(&[out.clone()], None, |params| {
            let out = Matrix::new(params[0].clone())?;
            for_matrix(&out, |row, column| {
                let tens = row.combine(BinaryOp::Mul, &Scalar::from(10i64))?;
                out.at(&row, &column)?
                    .set(&tens.combine(BinaryOp::Add, &column)?)
            })?;
            Ok(None)
        })
        .unwrap();
    assert_eq!(out.to_host_vec::<i64>().unwrap(), vec![0, 1, 2, 10, 11, 12]);
}

pub fn test_for_vector_rejects_matrix(runner: &Runner) {
    let m = Matrix::from_vec(2, 2, vec![1i32, 2, 3, 4]).unwrap().into_value();
    let mut calls = 0;
    let result = runner.run(&[m], None, |params| {
        let m = Matrix::new(params[0].clone())?;
        for_vector(&m, |_| {
            calls += 1;
            Ok(())
        })?;
        Ok(None)
    });
    assert!(matches!(result, Err(ValueError::InvalidArgument(_))));
    assert_eq!(calls, 0);
}

pub fn test_gemm_and_gemv_not_implemented(runner: &Runner) {
    let m = Matrix::from_vec(2, 2, vec![1.0f32, 2.0, 3.0, 4.0]).unwrap().into_value();
    let v = Value::from_vec(vec![1.0f32, 1.0]);
    let gemm_result = runner.run(&[m.clone()], None, |params| {
        let m = Matrix::new(params[0].clone())?;
        gemm(&m, &m)?;
        Ok(None)
    });
    assert!(matches!(gemm_result, Err(ValueError::NotImplemented(_))));
    let gemv_result = runner.run(&[m, v], None, |params| {
        gemv(&Matrix::new(params[0].clone())?, &Vector::new(params[1].clone())?)?;
        Ok(None)
    });
    assert!(matches!(gemv_result, Err(ValueError::NotImplemented(_))));
}
