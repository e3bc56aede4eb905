//! Script errors.

use thiserror::Error;

/// Anything that can go wrong lexing, parsing, binding or evaluating a script.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("lex error at {pos}: {message}")]
    Lex { pos: usize, message: String },

    #[error("parse error at {pos}: {message}")]
    Parse { pos: usize, message: String },

    #[error("name '{0}' is not defined")]
    UnknownName(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("value error: {0}")]
    Value(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {0}")]
    Overflow(&'static str),

    #[error("{name}() takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("index error: {0}")]
    Index(String),

    #[error("call depth exceeded (max {0})")]
    RecursionLimit(usize),

    #[error("cannot bind '{name}': {reason}")]
    Binding { name: String, reason: String },

    #[error("result is not representable as data: {0}")]
    NotRepresentable(String),
}

impl ScriptError {
    pub fn parse(pos: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            pos,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::Value(message.into())
    }

    pub fn arity(name: &str, expected: impl Into<String>, got: usize) -> Self {
        Self::Arity {
            name: name.to_string(),
            expected: expected.into(),
            got,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
