use crate::dataflow::allocator::{Variable, VariableAllocator};
use crate::dataflow::{DataFlowError, DataFlowNode, DataFlowNodeId};
use crate::layout::Layout;
use crate::numeric_scalar::BinaryOp;
use crate::symbolic::{assign_binary, copy_into};
use crate::value::ValueError;

/// A leaf producing a fixed variable.
#[derive(Debug)]
pub struct LiteralNode {
    value: Variable,
}

impl LiteralNode {
    pub fn new(value: Variable) -> Self {
        Self { value }
    }

    /// Panics on `None`: a literal without a value is a construction bug.
    pub fn from_optional(value: Option<Variable>) -> Self {
        match value {
            Some(value) => Self::new(value),
            None => panic!("a literal node needs a value"),
        }
    }
}

impl DataFlowNode for LiteralNode {
    fn get_name(&self) -> String {
        "Literal".to_string()
    }

    fn on_process(
        &mut self,
        _source: Option<DataFlowNodeId>,
        input: Option<&Variable>,
        _allocator: &mut dyn VariableAllocator,
    ) -> Result<Option<Variable>, DataFlowError> {
        if input.is_some() {
            return Err(DataFlowError::UnexpectedInput(self.get_name()));
        }
        Ok(Some(self.value.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lhs,
    Rhs,
}

/// `lhs op rhs` over two upstream results.
///
/// The first operand to arrive is copied into a slot of this node so its
/// producer can release its own slot right away. The result goes into a
/// fresh slot with the lhs dtype and extents.
#[derive(Debug)]
pub struct BinaryNode {
    op: BinaryOp,
    lhs: DataFlowNodeId,
    rhs: DataFlowNodeId,
    held: Option<(Side, Variable)>,
}

impl BinaryNode {
    pub fn new(op: BinaryOp, lhs: DataFlowNodeId, rhs: DataFlowNodeId) -> Self {
        Self {
            op,
            lhs,
            rhs,
            held: None,
        }
    }

    pub fn get_op(&self) -> BinaryOp {
        self.op
    }

    fn side_of(&self, source: DataFlowNodeId) -> Option<Side> {
        let pending_lhs = matches!(self.held, Some((Side::Lhs, _)));
        if source == self.lhs && !(source == self.rhs && pending_lhs) {
            Some(Side::Lhs)
        } else if source == self.rhs {
            Some(Side::Rhs)
        } else {
            None
        }
    }

    fn compute(
        &self,
        lhs: &Variable,
        rhs: &Variable,
        allocator: &mut dyn VariableAllocator,
    ) -> Result<Variable, DataFlowError> {
        if lhs.dtype() != rhs.dtype() {
            return Err(ValueError::TypeMismatch(lhs.dtype(), rhs.dtype()).into());
        }
        if rhs.layout().rank() != 0 && rhs.layout().extents() != lhs.layout().extents() {
            return Err(ValueError::SizeMismatch(lhs.value().size(), rhs.value().size()).into());
        }
        let layout = Layout::new(lhs.layout().extents().to_vec());
        let output = allocator.allocate(lhs.dtype(), &layout)?;
        let filled = copy_into(output.value(), lhs.value())
            .and_then(|_| assign_binary(self.op, output.value(), rhs.value()));
        if let Err(err) = filled {
            allocator.free(&output)?;
            return Err(err.into());
        }
        Ok(output)
    }
}

impl DataFlowNode for BinaryNode {
    fn get_name(&self) -> String {
        format!("Binary {}", self.op)
    }

    fn on_process(
        &mut self,
        source: Option<DataFlowNodeId>,
        input: Option<&Variable>,
        allocator: &mut dyn VariableAllocator,
    ) -> Result<Option<Variable>, DataFlowError> {
        let (Some(source), Some(input)) = (source, input) else {
            return Err(DataFlowError::UnexpectedInput(self.get_name()));
        };
        let side = self
            .side_of(source)
            .ok_or_else(|| DataFlowError::UnexpectedInput(self.get_name()))?;

        match self.held.take() {
            None => {
                let held = allocator.allocate(input.dtype(), &input.layout().contiguous())?;
                if let Err(err) = copy_into(held.value(), input.value()) {
                    allocator.free(&held)?;
                    return Err(err.into());
                }
                self.held = Some((side, held));
                Ok(None)
            }
            Some((held_side, held)) if held_side != side => {
                let result = match side {
                    Side::Rhs => self.compute(&held, input, allocator),
                    Side::Lhs => self.compute(input, &held, allocator),
                };
                allocator.free(&held)?;
                result.map(Some)
            }
            Some(held) => {
                self.held = Some(held);
                Err(DataFlowError::UnexpectedInput(self.get_name()))
            }
        }
    }

    fn reset(&mut self, allocator: &mut dyn VariableAllocator) -> Result<(), DataFlowError> {
        if let Some((_, held)) = self.held.take() {
            allocator.free(&held)?;
        }
        Ok(())
    }
}
