use crate::context::{ExecutionContext, get_context};
use crate::dtype::DType;
use crate::host_buffer::HostBuffer;
use crate::layout::Layout;
use crate::numeric_scalar::NumericScalar;
use crate::value::{Value, ValueError};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Element type and indirection of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueType {
    pub dtype: DType,
    pub pointer_level: u8,
    pub layout: Layout,
}

impl ValueType {
    pub fn scalar(dtype: DType) -> Self {
        Self {
            dtype,
            pointer_level: 0,
            layout: Layout::scalar(),
        }
    }

    pub fn pointer(dtype: DType, layout: Layout) -> Self {
        Self {
            dtype,
            pointer_level: 1,
            layout,
        }
    }

    pub fn of(value: &Value) -> Self {
        Self {
            dtype: value.dtype(),
            pointer_level: value.pointer_level(),
            layout: value.layout().clone(),
        }
    }

    fn check(&self, value: &Value) -> Result<(), ValueError> {
        value.ensure_dtype(self.dtype)?;
        if value.pointer_level() != self.pointer_level {
            return Err(ValueError::InvalidArgument(format!(
                "expected pointer level {}, got {}",
                self.pointer_level,
                value.pointer_level()
            )));
        }
        if self.layout.extents() != value.layout().extents() {
            return Err(ValueError::SizeMismatch(
                self.layout.num_elements(),
                value.size(),
            ));
        }
        Ok(())
    }
}

/// Argument handed to a host implementation.
#[derive(Debug, Clone)]
pub enum HostArgument {
    Scalar(NumericScalar),
    Buffer {
        buffer: Rc<RefCell<HostBuffer>>,
        offset: usize,
    },
}

impl HostArgument {
    pub fn buffer(buffer: HostBuffer) -> Self {
        HostArgument::Buffer {
            buffer: Rc::new(RefCell::new(buffer)),
            offset: 0,
        }
    }

    pub fn as_scalar(&self) -> Result<NumericScalar, ValueError> {
        match self {
            HostArgument::Scalar(x) => Ok(*x),
            HostArgument::Buffer { .. } => Err(ValueError::InvalidArgument(
                "expected a scalar argument, got a buffer".to_string(),
            )),
        }
    }

    pub fn as_buffer(&self) -> Result<(&Rc<RefCell<HostBuffer>>, usize), ValueError> {
        match self {
            HostArgument::Buffer { buffer, offset } => Ok((buffer, *offset)),
            HostArgument::Scalar(_) => Err(ValueError::InvalidArgument(
                "expected a buffer argument, got a scalar".to_string(),
            )),
        }
    }
}

pub type HostFunction = Rc<dyn Fn(&[HostArgument]) -> Result<Option<NumericScalar>, ValueError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decoration {
    /// Symbol is prefixed with the module name.
    Decorated,
    /// Symbol is used verbatim, for binding to precompiled libraries.
    Undecorated,
}

/// A named callable. Under the compute context it runs its host definition;
/// under the emitter context calling it emits a call to its symbol.
#[derive(Clone)]
pub struct FunctionDeclaration {
    name: String,
    return_type: Option<ValueType>,
    parameters: Vec<ValueType>,
    decoration: Decoration,
    host_definition: Option<HostFunction>,
}

impl Debug for FunctionDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDeclaration")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("parameters", &self.parameters)
            .field("decoration", &self.decoration)
            .field("defined", &self.host_definition.is_some())
            .finish()
    }
}

impl FunctionDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            return_type: None,
            parameters: vec![],
            decoration: Decoration::Decorated,
            host_definition: None,
        }
    }

    pub fn returns(mut self, return_type: ValueType) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn parameters(mut self, parameters: impl IntoIterator<Item = ValueType>) -> Self {
        self.parameters = parameters.into_iter().collect();
        self
    }

    pub fn decorated(mut self, decoration: Decoration) -> Self {
        self.decoration = decoration;
        self
    }

    pub fn define(
        mut self,
        definition: impl Fn(&[HostArgument]) -> Result<Option<NumericScalar>, ValueError> + 'static,
    ) -> Self {
        self.host_definition = Some(Rc::new(definition));
        self
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_return_type(&self) -> Option<&ValueType> {
        self.return_type.as_ref()
    }

    pub fn get_parameters(&self) -> &[ValueType] {
        &self.parameters
    }

    pub fn get_decoration(&self) -> Decoration {
        self.decoration
    }

    pub fn get_host_definition(&self) -> Option<&HostFunction> {
        self.host_definition.as_ref()
    }

    pub fn symbol(&self, module_name: &str) -> String {
        match self.decoration {
            Decoration::Decorated => format!("{module_name}_{}", self.name),
            Decoration::Undecorated => self.name.clone(),
        }
    }

    pub fn check_arguments(&self, args: &[Value]) -> Result<(), ValueError> {
        if args.len() != self.parameters.len() {
            return Err(ValueError::InvalidArgument(format!(
                "{} takes {} arguments, {} were given",
                self.name,
                self.parameters.len(),
                args.len()
            )));
        }
        for (parameter, arg) in self.parameters.iter().zip(args) {
            parameter.check(arg)?;
        }
        Ok(())
    }

    /// Calls through the active context.
    pub fn call(&self, args: &[Value]) -> Result<Option<Value>, ValueError> {
        let context = get_context()?;
        self.call_in(context.as_ref(), args)
    }

    pub fn call_in(
        &self,
        context: &dyn ExecutionContext,
        args: &[Value],
    ) -> Result<Option<Value>, ValueError> {
        self.check_arguments(args)?;
        let result = context.call(self, args)?;
        match (&self.return_type, &result) {
            (Some(return_type), Some(value)) => value.ensure_dtype(return_type.dtype)?,
            (Some(_), None) => {
                return Err(ValueError::InvalidArgument(format!(
                    "{} did not produce its declared result",
                    self.name
                )));
            }
            (None, _) => {}
        }
        Ok(result)
    }
}
