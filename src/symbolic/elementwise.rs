use crate::context::get_context;
use crate::numeric_scalar::BinaryOp;
use crate::value::{Value, ValueError};

/// Checks operand compatibility. Returns true when `source` is broadcast.
fn check_operands(destination: &Value, source: &Value) -> Result<bool, ValueError> {
    source.ensure_dtype(destination.dtype())?;
    if source.rank() == 0 {
        return Ok(true);
    }
    if source.layout().extents() != destination.layout().extents() {
        return Err(ValueError::SizeMismatch(destination.size(), source.size()));
    }
    Ok(false)
}

/// `destination[c] = destination[c] op source[c]` for every coordinate.
pub fn assign_binary(op: BinaryOp, destination: &Value, source: &Value) -> Result<(), ValueError> {
    apply(op, destination, source, false)
}

/// `destination[c] = source[c] op destination[c]` for every coordinate.
pub fn assign_binary_reversed(
    op: BinaryOp,
    destination: &Value,
    source: &Value,
) -> Result<(), ValueError> {
    apply(op, destination, source, true)
}

fn apply(
    op: BinaryOp,
    destination: &Value,
    source: &Value,
    reversed: bool,
) -> Result<(), ValueError> {
    let broadcast = check_operands(destination, source)?;
    if !destination.is_addressable() {
        return Err(ValueError::InvalidArgument(
            "elementwise destination must refer to storage".to_string(),
        ));
    }
    let context = get_context()?;
    context.for_each(destination.layout(), &mut |coordinates| {
        let target = context.element(destination, coordinates)?;
        let other = if broadcast {
            source.clone()
        } else {
            context.element(source, coordinates)?
        };
        let result = if reversed {
            context.binary(op, &other, &target)?
        } else {
            context.binary(op, &target, &other)?
        };
        context.store(&target, &result)
    })
}

/// Fresh, densely packed storage holding the contents of `value`.
pub fn copy_value(value: &Value) -> Result<Value, ValueError> {
    let copy = get_context()?.allocate(value.dtype(), &value.layout().contiguous())?;
    copy_into(&copy, value)?;
    Ok(copy)
}

/// Element-by-element copy between values of equal dtype and extents.
pub fn copy_into(destination: &Value, source: &Value) -> Result<(), ValueError> {
    source.ensure_dtype(destination.dtype())?;
    if source.layout().extents() != destination.layout().extents() {
        return Err(ValueError::SizeMismatch(destination.size(), source.size()));
    }
    let context = get_context()?;
    context.for_each(source.layout(), &mut |coordinates| {
        let from = context.element(source, coordinates)?;
        let to = context.element(destination, coordinates)?;
        let loaded = context.load(&from)?;
        context.store(&to, &loaded)
    })
}
