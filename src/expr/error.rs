// ABOUTME: Error types for interpolation expression parsing and evaluation
// ABOUTME: Every failure inside a template body surfaces as one of these variants

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("{0} is not defined")]
    UndefinedVariable(String),

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Helper '{name}' failed: {message}")]
    Helper { name: String, message: String },

    #[error("Maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),

    #[error("Expression nested more than {0} levels deep")]
    NestingTooDeep(usize),

    #[error("Template not registered: {0}")]
    UnknownTemplate(String),
}

impl EvalError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        EvalError::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub fn helper(name: &str, message: impl Into<String>) -> Self {
        EvalError::Helper {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;
