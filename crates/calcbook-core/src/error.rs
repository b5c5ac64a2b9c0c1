//! Error types for calcbook-core.

use calcbook_engine::engine::{CalcId, describe_cycle};
use calcbook_engine::ExecError;
use thiserror::Error;

/// Errors that abort a calculation call.
#[derive(Error, Debug)]
pub enum CalcError {
    #[error("Referenced calculation not found: {0}")]
    MissingReference(CalcId),

    #[error("Calculation not found: {0}")]
    NotFound(CalcId),

    #[error("Circular dependency detected: {}", describe_cycle(.0))]
    CircularDependency(Vec<CalcId>),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Execution(#[from] ExecError),
}

impl CalcError {
    pub fn store(message: impl Into<String>) -> Self {
        CalcError::Store(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        CalcError::Parse(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CalcError::CircularDependency(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "Circular dependency detected: a -> b -> a");

        let err: CalcError = ExecError::UnknownType("x".into()).into();
        assert_eq!(err.to_string(), "Unknown calculation type: x");
    }
}
