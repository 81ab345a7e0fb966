//! Scalar, vector and matrix builders over [`Value`]s.
//!
//! Every operation goes through the active execution context, so the same
//! expression either computes immediately or is emitted as a program.
//!
//! Binary operators (`add`, `sub`, `mul`, `div`) never touch their operands:
//! they copy the left-hand side and apply the compound assignment to the
//! copy. `Clone` on a builder clones the handle and aliases the storage; use
//! `copy` for independent storage.
use crate::value::Value;

mod elementwise;
mod iteration;
mod matrix;
mod reduce;
mod scalar;
mod vector;

pub use elementwise::{assign_binary, assign_binary_reversed, copy_into, copy_value};
pub use iteration::{for_matrix, for_vector};
pub use matrix::{Matrix, scalar_add_matrix, scalar_mul_matrix};
pub use reduce::{accumulate, dot, dot_generic, gemm, gemv, sum, sum_vector};
pub use scalar::Scalar;
pub use vector::{
    Vector, scalar_add_vector, scalar_div_vector, scalar_mul_vector, scalar_sub_vector,
};

/// Anything backed by a [`Value`].
pub trait AsValue {
    fn as_value(&self) -> &Value;
}

impl AsValue for Value {
    fn as_value(&self) -> &Value {
        self
    }
}
