use std::fmt;

use thiserror::Error;

/// User-facing error category, printed as the prefix of every reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SyntaxError,
    NameError,
    TypeError,
    ZeroDivisionError,
    ValueError,
    AttributeError,
    IndexError,
    KeyError,
    OverflowError,
    OSError,
    ResourceExhausted,
    RecursionError,
    NotSupported,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::SyntaxError => "SyntaxError",
            Self::NameError => "NameError",
            Self::TypeError => "TypeError",
            Self::ZeroDivisionError => "ZeroDivisionError",
            Self::ValueError => "ValueError",
            Self::AttributeError => "AttributeError",
            Self::IndexError => "IndexError",
            Self::KeyError => "KeyError",
            Self::OverflowError => "OverflowError",
            Self::OSError => "OSError",
            Self::ResourceExhausted => "ResourceExhausted",
            Self::RecursionError => "RecursionError",
            Self::NotSupported => "NotSupported",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while executing a parsed program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("name '{name}' is not defined")]
    UndefinedName { name: String },
    #[error("no binding for nonlocal '{name}' found")]
    NonlocalNotFound { name: String },
    #[error("'{type_name}' object is not callable")]
    NotCallable { type_name: String },
    #[error("{function}() got unexpected keyword arguments: {}", quoted_list(.keys))]
    UnexpectedKeywords { function: String, keys: Vec<String> },
    #[error("{function}() does not accept keyword arguments")]
    KeywordsNotAccepted { function: String },
    #[error("unsupported operand type(s) for {operation}: '{left}' and '{right}'")]
    UnsupportedOperands {
        operation: &'static str,
        left: String,
        right: String,
    },
    #[error("bad operand type for unary {operation}: '{type_name}'")]
    BadUnaryOperand {
        operation: &'static str,
        type_name: String,
    },
    #[error("'{operation}' not supported between instances of '{left}' and '{right}'")]
    Unorderable {
        operation: &'static str,
        left: String,
        right: String,
    },
    #[error("'{type_name}' object is not iterable")]
    NotIterable { type_name: String },
    #[error("'{type_name}' object is not subscriptable")]
    NotSubscriptable { type_name: String },
    #[error("'{type_name}' object does not support item assignment")]
    NoItemAssignment { type_name: String },
    #[error("{container} indices must be integers or slices, not {type_name}")]
    InvalidIndexType {
        container: String,
        type_name: String,
    },
    #[error("unhashable type: '{type_name}'")]
    Unhashable { type_name: String },
    #[error("{message}")]
    InvalidArgument { message: String },
    #[error("{message}")]
    InvalidValue { message: String },
    #[error("{operation} by zero")]
    DivisionByZero { operation: &'static str },
    #[error("integer overflow in '{operation}'")]
    Overflow { operation: &'static str },
    #[error("{container} index out of range")]
    IndexOutOfRange { container: &'static str },
    #[error("{key}")]
    MissingKey { key: String },
    #[error("'{type_name}' object has no attribute '{attribute}'")]
    UnknownAttribute {
        type_name: String,
        attribute: String,
    },
    #[error("cannot set attribute '{attribute}' on '{type_name}' object")]
    ReadOnlyAttribute {
        type_name: String,
        attribute: String,
    },
    #[error("too many values to unpack (expected {expected})")]
    TooManyValues { expected: usize },
    #[error("not enough values to unpack (expected {expected}, got {got})")]
    NotEnoughValues { expected: usize, got: usize },
    #[error("slice step cannot be zero")]
    ZeroSliceStep,
    #[error("attempt to assign sequence of size {got} to extended slice of size {expected}")]
    ExtendedSliceSize { expected: usize, got: usize },
    #[error("failed to write output: {message}")]
    OutputFailed { message: String },
    #[error("loop exceeded the limit of {limit} iterations")]
    LoopLimitExceeded { limit: usize },
    #[error("maximum recursion depth of {limit} exceeded")]
    RecursionLimitExceeded { limit: usize },
    #[error("'return' outside function")]
    ReturnOutsideFunction,
    #[error("'{statement}' statement is not supported in the body of class '{class}'")]
    UnsupportedClassStatement {
        class: String,
        statement: &'static str,
    },
    #[error("{message}")]
    Native { kind: ErrorKind, message: String },
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UndefinedName { .. } | Self::NonlocalNotFound { .. } => ErrorKind::NameError,
            Self::NotCallable { .. }
            | Self::UnexpectedKeywords { .. }
            | Self::KeywordsNotAccepted { .. }
            | Self::UnsupportedOperands { .. }
            | Self::BadUnaryOperand { .. }
            | Self::Unorderable { .. }
            | Self::NotIterable { .. }
            | Self::NotSubscriptable { .. }
            | Self::NoItemAssignment { .. }
            | Self::InvalidIndexType { .. }
            | Self::Unhashable { .. }
            | Self::InvalidArgument { .. } => ErrorKind::TypeError,
            Self::InvalidValue { .. }
            | Self::TooManyValues { .. }
            | Self::NotEnoughValues { .. }
            | Self::ZeroSliceStep
            | Self::ExtendedSliceSize { .. } => ErrorKind::ValueError,
            Self::DivisionByZero { .. } => ErrorKind::ZeroDivisionError,
            Self::Overflow { .. } => ErrorKind::OverflowError,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexError,
            Self::MissingKey { .. } => ErrorKind::KeyError,
            Self::UnknownAttribute { .. } | Self::ReadOnlyAttribute { .. } => {
                ErrorKind::AttributeError
            }
            Self::OutputFailed { .. } => ErrorKind::OSError,
            Self::LoopLimitExceeded { .. } => ErrorKind::ResourceExhausted,
            Self::RecursionLimitExceeded { .. } => ErrorKind::RecursionError,
            Self::ReturnOutsideFunction => ErrorKind::SyntaxError,
            Self::UnsupportedClassStatement { .. } => ErrorKind::NotSupported,
            Self::Native { kind, .. } => *kind,
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    /// Checks the positional argument count of a builtin or builtin method.
    pub(crate) fn expect_arity(
        function: &str,
        min: usize,
        max: usize,
        found: usize,
    ) -> Result<(), Self> {
        if (min..=max).contains(&found) {
            return Ok(());
        }
        let message = if min == max {
            match min {
                0 => format!("{function}() takes no arguments ({found} given)"),
                1 => format!("{function}() takes exactly one argument ({found} given)"),
                _ => format!("{function}() takes exactly {min} arguments ({found} given)"),
            }
        } else if found < min {
            format!("{function}() expected at least {min} arguments, got {found}")
        } else {
            format!("{function}() expected at most {max} arguments, got {found}")
        };
        Err(Self::invalid_argument(message))
    }
}

fn quoted_list(keys: &[String]) -> String {
    keys.iter()
        .map(|key| format!("'{key}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_kinds() {
        let cases = [
            (
                RuntimeError::UndefinedName {
                    name: "x".to_string(),
                },
                ErrorKind::NameError,
            ),
            (
                RuntimeError::DivisionByZero {
                    operation: "division",
                },
                ErrorKind::ZeroDivisionError,
            ),
            (RuntimeError::ZeroSliceStep, ErrorKind::ValueError),
            (
                RuntimeError::LoopLimitExceeded { limit: 3 },
                ErrorKind::ResourceExhausted,
            ),
            (RuntimeError::ReturnOutsideFunction, ErrorKind::SyntaxError),
        ];
        for (error, kind) in cases {
            assert_eq!(error.kind(), kind, "{error}");
        }
    }

    #[test]
    fn lists_unexpected_keywords() {
        let error = RuntimeError::UnexpectedKeywords {
            function: "f".to_string(),
            keys: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "f() got unexpected keyword arguments: 'a', 'b'"
        );
    }

    #[test]
    fn formats_arity_messages() {
        let error = RuntimeError::expect_arity("len", 1, 1, 2).expect_err("arity");
        assert_eq!(error.to_string(), "len() takes exactly one argument (2 given)");
        assert!(RuntimeError::expect_arity("pop", 0, 1, 1).is_ok());
    }
}
