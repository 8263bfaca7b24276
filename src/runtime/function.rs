use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDef;
use crate::builtins::BuiltinMethod;
use crate::interpreter::Scope;
use crate::runtime::error::RuntimeError;
use crate::runtime::value::Value;

/// User-defined function: its definition plus a copy of every scope frame
/// that enclosed it when the `def` executed.
pub struct FunctionValue {
    pub def: Rc<FunctionDef>,
    pub closure: Rc<[Scope]>,
}

impl FunctionValue {
    pub fn new(def: Rc<FunctionDef>, closure: Rc<[Scope]>) -> Self {
        Self { def, closure }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.def.name)
            .field("closure_frames", &self.closure.len())
            .finish()
    }
}

pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, RuntimeError>;

/// Callable supplied by the embedding program through
/// [`Interpreter::register_builtin`](crate::interpreter::Interpreter::register_builtin).
pub struct NativeFunction {
    pub name: String,
    pub function: Box<NativeFn>,
}

impl NativeFunction {
    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.function)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// A callable attribute read through a receiver; calling it passes the
/// receiver as the first argument.
#[derive(Debug)]
pub enum BoundMethod {
    Function {
        receiver: Value,
        function: Rc<FunctionValue>,
    },
    Builtin {
        receiver: Value,
        method: BuiltinMethod,
    },
}

impl BoundMethod {
    pub fn receiver(&self) -> &Value {
        match self {
            BoundMethod::Function { receiver, .. } | BoundMethod::Builtin { receiver, .. } => {
                receiver
            }
        }
    }

    pub fn name(&self) -> &str {
        match self {
            BoundMethod::Function { function, .. } => function.name(),
            BoundMethod::Builtin { method, .. } => method.name(),
        }
    }

    pub(crate) fn same_as(&self, other: &BoundMethod) -> bool {
        match (self, other) {
            (
                BoundMethod::Function {
                    receiver,
                    function,
                },
                BoundMethod::Function {
                    receiver: other_receiver,
                    function: other_function,
                },
            ) => Rc::ptr_eq(function, other_function) && receiver.equals(other_receiver),
            (
                BoundMethod::Builtin { receiver, method },
                BoundMethod::Builtin {
                    receiver: other_receiver,
                    method: other_method,
                },
            ) => method == other_method && receiver.equals(other_receiver),
            _ => false,
        }
    }
}
