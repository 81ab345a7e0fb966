use crate::context::get_context;
use crate::layout::Layout;
use crate::symbolic::{AsValue, Scalar};
use crate::value::ValueError;

/// Runs `body` once per index of a one-dimensional value. Under the emitter
/// context the body is emitted once inside a loop.
pub fn for_vector(
    vector: &impl AsValue,
    mut body: impl FnMut(Scalar) -> Result<(), ValueError>,
) -> Result<(), ValueError> {
    let layout = vector.as_value().layout();
    if layout.rank() != 1 {
        return Err(ValueError::InvalidArgument(format!(
            "Layout being looped over must be one-dimensional, got rank {}",
            layout.rank()
        )));
    }
    let extent = layout.extent(0)?;
    get_context()?.for_each(&Layout::new([extent]), &mut |coordinates| {
        body(coordinates[0].clone())
    })
}

/// Runs `body` once per `(row, column)` of a two-dimensional value, row-major.
pub fn for_matrix(
    matrix: &impl AsValue,
    mut body: impl FnMut(Scalar, Scalar) -> Result<(), ValueError>,
) -> Result<(), ValueError> {
    let layout = matrix.as_value().layout();
    if layout.rank() != 2 {
        return Err(ValueError::InvalidArgument(format!(
            "Layout being looped over must be two-dimensional, got rank {}",
            layout.rank()
        )));
    }
    let extents = Layout::new(layout.extents().to_vec());
    get_context()?.for_each(&extents, &mut |coordinates| {
        body(coordinates[0].clone(), coordinates[1].clone())
    })
}
