pub mod ast;
pub mod builtins;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod token;

pub use interpreter::{Interpreter, InterpreterConfig, InterpreterError};
pub use runtime::value::Value;

/// Evaluates `source` in a fresh interpreter with default limits; `print`
/// writes to stdout.
pub fn evaluate(source: &str) -> Result<Value, InterpreterError> {
    Interpreter::default().evaluate(source)
}
