pub mod blas;
pub mod context;
pub mod dataflow;
pub mod dtype;
pub mod emitted;
pub mod function;
pub mod host_buffer;
pub mod layout;
pub mod numeric_scalar;
pub mod symbolic;
pub mod value;

pub use context::{ComputeContext, ContextKind, EmitterConfig, EmitterContext};
pub use dtype::DType;
pub use layout::Layout;
pub use numeric_scalar::{BinaryOp, NumericScalar};
pub use symbolic::{Matrix, Scalar, Vector};
pub use value::{Value, ValueError};
