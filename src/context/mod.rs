//! The active execution context.
//!
//! Every operation on a [`Value`] is routed through whichever context sits on
//! top of the calling thread's context stack. The compute context performs
//! the work immediately on host buffers; the emitter context records it as a
//! program to be compiled and run later.
use crate::dtype::DType;
use crate::function::FunctionDeclaration;
use crate::layout::Layout;
use crate::numeric_scalar::BinaryOp;
use crate::symbolic::Scalar;
use crate::value::{Value, ValueError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

mod compute_context;
mod emitter_context;

pub use compute_context::ComputeContext;
pub use emitter_context::{EmitterConfig, EmitterContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum ContextKind {
    Compute,
    Emitter,
}

pub type ForEachBody<'a> = dyn FnMut(&[Scalar]) -> Result<(), ValueError> + 'a;

pub trait ExecutionContext {
    fn kind(&self) -> ContextKind;

    /// Storage returned by `allocate` stays addressable while this value is
    /// unchanged. The emitter starts a new scope with every function.
    fn storage_scope(&self) -> u64 {
        0
    }

    /// Fresh storage for `layout`. Compute storage is zero initialised.
    fn allocate(&self, dtype: DType, layout: &Layout) -> Result<Value, ValueError>;

    /// Rank-0 view of the element of `value` at `coordinates`.
    fn element(&self, value: &Value, coordinates: &[Scalar]) -> Result<Value, ValueError>;

    /// The current contents of a rank-0 value, as an immediate or register.
    fn load(&self, value: &Value) -> Result<Value, ValueError>;

    fn store(&self, destination: &Value, source: &Value) -> Result<(), ValueError>;

    fn binary(&self, op: BinaryOp, a: &Value, b: &Value) -> Result<Value, ValueError>;

    /// Runs `body` for every coordinate of `layout`, row-major.
    fn for_each(&self, layout: &Layout, body: &mut ForEachBody<'_>) -> Result<(), ValueError>;

    fn call(
        &self,
        function: &FunctionDeclaration,
        args: &[Value],
    ) -> Result<Option<Value>, ValueError>;
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Rc<dyn ExecutionContext>>> =
        const { RefCell::new(Vec::new()) };
}

/// Keeps a context active until dropped.
#[must_use = "the context is popped as soon as the guard is dropped"]
pub struct ContextGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth, "context guards dropped out of order");
            stack.pop();
        });
    }
}

pub fn enter_context(context: Rc<dyn ExecutionContext>) -> ContextGuard {
    let depth = CONTEXT_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        log::trace!("Entering {} context", context.kind());
        stack.push(context);
        stack.len()
    });
    ContextGuard {
        depth,
        _not_send: PhantomData,
    }
}

pub fn with_context<R>(
    context: Rc<dyn ExecutionContext>,
    f: impl FnOnce() -> Result<R, ValueError>,
) -> Result<R, ValueError> {
    let _guard = enter_context(context);
    f()
}

pub fn get_context() -> Result<Rc<dyn ExecutionContext>, ValueError> {
    CONTEXT_STACK.with(|stack| stack.borrow().last().cloned().ok_or(ValueError::NoActiveContext))
}

pub fn context_depth() -> usize {
    CONTEXT_STACK.with(|stack| stack.borrow().len())
}

/// Runs `f` against the active context only if it is of the requested kind.
pub fn invoke_for_context<R>(
    kind: ContextKind,
    f: impl FnOnce(&dyn ExecutionContext) -> Result<R, ValueError>,
) -> Result<Option<R>, ValueError> {
    let context = get_context()?;
    if context.kind() != kind {
        return Ok(None);
    }
    f(context.as_ref()).map(Some)
}
