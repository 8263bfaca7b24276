use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::ast::Program;
use crate::builtins::{BuiltinFunction, Output};
use crate::parser::parse_program;
use crate::runtime::error::RuntimeError;
use crate::runtime::function::{FunctionValue, NativeFunction};
use crate::runtime::value::Value;

mod call;
mod environment;
mod error;
mod runtime;
mod stack;

use environment::Environment;
pub use error::InterpreterError;
use runtime::ExecResult;

/// One scope frame: name to value.
pub type Scope = FxHashMap<String, Value>;

/// Resource ceilings enforced while executing a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Iterations a single `while`/`for` statement may run.
    pub max_loop_iterations: usize,
    /// Nested user-function calls allowed at once.
    pub max_recursion_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: 100_000,
            max_recursion_depth: 1_000,
        }
    }
}

impl InterpreterConfig {
    pub fn with_max_loop_iterations(mut self, limit: usize) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    pub fn with_max_recursion_depth(mut self, limit: usize) -> Self {
        self.max_recursion_depth = limit;
        self
    }
}

/// Tree-walking interpreter.
///
/// An instance owns its global scope, function table, host-registered
/// builtins and call-depth counter, so separate instances never share state.
/// Successive [`evaluate`](Self::evaluate) calls on one instance behave like
/// REPL input: globals, functions and classes persist between them.
pub struct Interpreter {
    config: InterpreterConfig,
    environment: Environment,
    functions: FxHashMap<String, Rc<FunctionValue>>,
    natives: FxHashMap<String, Rc<NativeFunction>>,
    depth: usize,
    output: Output,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

impl Interpreter {
    /// Interpreter whose `print` writes to stdout.
    pub fn new(config: InterpreterConfig) -> Self {
        Self::with_output(config, Output::Stdout)
    }

    /// Interpreter whose `print` output is buffered; see [`take_output`](Self::take_output).
    pub fn capturing(config: InterpreterConfig) -> Self {
        Self::with_output(config, Output::Captured(String::new()))
    }

    fn with_output(config: InterpreterConfig, output: Output) -> Self {
        Self {
            config,
            environment: Environment::default(),
            functions: FxHashMap::default(),
            natives: FxHashMap::default(),
            depth: 0,
            output,
        }
    }

    pub fn take_output(&mut self) -> String {
        self.output.take()
    }

    /// Adds a host callable to the builtins table. It shadows a fixed
    /// builtin of the same name but never a program binding.
    pub fn register_builtin(
        &mut self,
        name: &str,
        function: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static,
    ) {
        self.natives.insert(
            name.to_string(),
            Rc::new(NativeFunction {
                name: name.to_string(),
                function: Box::new(function),
            }),
        );
    }

    /// Reads a binding from the global scope.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.environment.globals().get(name).cloned()
    }

    /// Parses and runs `source`, returning the value of its last statement.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, InterpreterError> {
        let program = parse_program(source)?;
        self.run(&program)
    }

    pub fn run(&mut self, program: &Program) -> Result<Value, InterpreterError> {
        let mut last = Value::None;
        for statement in &program.statements {
            trace!(statement = statement.kind_name(), "executing top-level statement");
            match self.exec_statement(statement)? {
                ExecResult::Continue(value) => last = value,
                ExecResult::Return(_) => return Err(RuntimeError::ReturnOutsideFunction.into()),
            }
        }
        Ok(last)
    }

    /// Resolves a name: scope chain, then builtins, then the function table.
    fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = self.environment.lookup(name) {
            return Ok(value);
        }
        if let Some(native) = self.natives.get(name) {
            return Ok(Value::Native(native.clone()));
        }
        if let Some(builtin) = BuiltinFunction::from_name(name) {
            return Ok(Value::Builtin(builtin));
        }
        if let Some(function) = self.functions.get(name) {
            return Ok(Value::Function(function.clone()));
        }
        Err(RuntimeError::UndefinedName {
            name: name.to_string(),
        })
    }
}
