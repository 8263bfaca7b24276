use thiserror::Error;

use crate::parser::ParseError;
use crate::runtime::error::{ErrorKind, RuntimeError};

/// Failure of one `evaluate` call: either the source did not parse or a
/// statement raised while executing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("SyntaxError: {0}")]
    Syntax(#[from] ParseError),
    #[error("{kind}: {0}", kind = .0.kind())]
    Runtime(#[from] RuntimeError),
}

impl InterpreterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InterpreterError::Syntax(_) => ErrorKind::SyntaxError,
            InterpreterError::Runtime(error) => error.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_the_error_kind() {
        let error: InterpreterError = RuntimeError::DivisionByZero {
            operation: "division",
        }
        .into();
        assert_eq!(error.kind(), ErrorKind::ZeroDivisionError);
        assert_eq!(error.to_string(), "ZeroDivisionError: division by zero");

        let error: InterpreterError = ParseError::new("expected ':'", 3).into();
        assert_eq!(error.kind(), ErrorKind::SyntaxError);
        assert_eq!(error.to_string(), "SyntaxError: expected ':' (line 3)");
    }
}
