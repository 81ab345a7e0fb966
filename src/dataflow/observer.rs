use crate::dataflow::DataFlowNodeId;
use crate::dataflow::allocator::Variable;

pub trait DataFlowObserver {
    fn on_node_processed(&mut self, node: DataFlowNodeId, result: &Variable);
    fn on_variable_released(&mut self, node: DataFlowNodeId, result: &Variable);
    fn on_output_retained(&mut self, node: DataFlowNodeId, result: &Variable);
}

impl DataFlowObserver for () {
    fn on_node_processed(&mut self, _node: DataFlowNodeId, _result: &Variable) {}
    fn on_variable_released(&mut self, _node: DataFlowNodeId, _result: &Variable) {}
    fn on_output_retained(&mut self, _node: DataFlowNodeId, _result: &Variable) {}
}
