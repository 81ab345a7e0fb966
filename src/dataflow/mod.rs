//! Data-flow graph of computation nodes.
//!
//! Nodes live in an arena owned by [`DataFlowGraph`]. Processing a node hands
//! its result to every recorded dependent, depth first, before the node's
//! completion runs. By the time a result is released, everything downstream
//! that needed it has already consumed it.
use crate::dataflow::allocator::{AllocatorError, Variable, VariableAllocator};
use crate::dataflow::observer::DataFlowObserver;
use crate::value::ValueError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod allocator;
pub mod nodes;
pub mod observer;

#[derive(Debug, thiserror::Error)]
pub enum DataFlowError {
    #[error("Node {0} received an unexpected input")]
    UnexpectedInput(String),
    #[error("Unknown node {0:?}")]
    UnknownNode(DataFlowNodeId),
    #[error(transparent)]
    ValueError(#[from] ValueError),
    #[error(transparent)]
    AllocatorError(#[from] AllocatorError),
}

#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
pub struct DataFlowNodeId {
    inner: usize,
}

/// What happens to a node's result once its dependents have been notified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Retention {
    /// Released through the node's completion hook.
    #[default]
    Free,
    /// Kept and returned from [`DataFlowGraph::run`].
    Output,
}

pub trait DataFlowNode {
    fn get_name(&self) -> String;

    /// Handles one incoming value. Leaves are processed with no source and no
    /// input. Returning a variable notifies the dependents.
    fn on_process(
        &mut self,
        source: Option<DataFlowNodeId>,
        input: Option<&Variable>,
        allocator: &mut dyn VariableAllocator,
    ) -> Result<Option<Variable>, DataFlowError>;

    fn on_process_complete(
        &mut self,
        result: &Variable,
        allocator: &mut dyn VariableAllocator,
    ) -> Result<(), DataFlowError> {
        allocator.free(result)?;
        Ok(())
    }

    /// Clears per-run state, returning any storage the node still holds.
    fn reset(&mut self, _allocator: &mut dyn VariableAllocator) -> Result<(), DataFlowError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct DataFlowGraph {
    nodes: Vec<Box<dyn DataFlowNode>>,
    dependents: Vec<Vec<DataFlowNodeId>>,
    retention: Vec<Retention>,
    outputs: HashMap<DataFlowNodeId, Variable>,
}

impl DataFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_node(&mut self, node: impl DataFlowNode + 'static) -> DataFlowNodeId {
        let id = DataFlowNodeId {
            inner: self.nodes.len(),
        };
        self.nodes.push(Box::new(node));
        self.dependents.push(Vec::new());
        self.retention.push(Retention::Free);
        id
    }

    fn check(&self, node: DataFlowNodeId) -> Result<(), DataFlowError> {
        if node.inner < self.nodes.len() {
            Ok(())
        } else {
            Err(DataFlowError::UnknownNode(node))
        }
    }

    /// Records that `consumer` takes the result of `producer`. Recording the
    /// same edge twice notifies the consumer twice.
    pub fn add_dependent(
        &mut self,
        producer: DataFlowNodeId,
        consumer: DataFlowNodeId,
    ) -> Result<(), DataFlowError> {
        self.check(producer)?;
        self.check(consumer)?;
        self.dependents[producer.inner].push(consumer);
        Ok(())
    }

    pub fn set_retention(
        &mut self,
        node: DataFlowNodeId,
        retention: Retention,
    ) -> Result<(), DataFlowError> {
        self.check(node)?;
        self.retention[node.inner] = retention;
        Ok(())
    }

    pub fn get_dependents(&self, node: DataFlowNodeId) -> &[DataFlowNodeId] {
        self.dependents
            .get(node.inner)
            .map(|x| x.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_node_name(&self, node: DataFlowNodeId) -> Option<String> {
        self.nodes.get(node.inner).map(|x| x.get_name())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn process<T: DataFlowObserver>(
        &mut self,
        node: DataFlowNodeId,
        source: Option<DataFlowNodeId>,
        input: Option<&Variable>,
        allocator: &mut dyn VariableAllocator,
        observer: &mut T,
    ) -> Result<(), DataFlowError> {
        self.check(node)?;
        let Some(result) = self.nodes[node.inner].on_process(source, input, allocator)? else {
            return Ok(());
        };
        log::trace!(
            "Processed {} ({:?}), notifying {} dependents",
            self.nodes[node.inner].get_name(),
            node,
            self.dependents[node.inner].len()
        );
        observer.on_node_processed(node, &result);

        // The result is released even when a dependent fails.
        let dependents = self.dependents[node.inner].clone();
        let mut notified = Ok(());
        for dependent in dependents {
            notified = self.process(dependent, Some(node), Some(&result), allocator, observer);
            if notified.is_err() {
                break;
            }
        }

        match self.retention[node.inner] {
            Retention::Output => {
                observer.on_output_retained(node, &result);
                self.outputs.insert(node, result);
            }
            Retention::Free => {
                self.nodes[node.inner].on_process_complete(&result, allocator)?;
                observer.on_variable_released(node, &result);
            }
        }
        notified
    }

    /// Processes every node that is nobody's dependent, in insertion order,
    /// and returns the retained results.
    pub fn run<T: DataFlowObserver>(
        &mut self,
        allocator: &mut dyn VariableAllocator,
        observer: &mut T,
    ) -> Result<HashMap<DataFlowNodeId, Variable>, DataFlowError> {
        let mut has_producer = vec![false; self.nodes.len()];
        for dependents in &self.dependents {
            for dependent in dependents {
                has_producer[dependent.inner] = true;
            }
        }
        let leaves: Vec<_> = (0..self.nodes.len())
            .filter(|&i| !has_producer[i])
            .map(|inner| DataFlowNodeId { inner })
            .collect();
        log::debug!(
            "Running data-flow graph of {} nodes from {} leaves",
            self.nodes.len(),
            leaves.len()
        );
        for leaf in leaves {
            self.process(leaf, None, None, allocator, observer)?;
        }
        Ok(std::mem::take(&mut self.outputs))
    }

    /// Returns storage left behind by an interrupted run and clears per-node
    /// state so the graph can run again.
    pub fn reset(&mut self, allocator: &mut dyn VariableAllocator) -> Result<(), DataFlowError> {
        for (_, output) in self.outputs.drain() {
            allocator.free(&output)?;
        }
        for node in &mut self.nodes {
            node.reset(allocator)?;
        }
        Ok(())
    }
}
