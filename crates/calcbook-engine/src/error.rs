//! Error types for calcbook-engine.

use thiserror::Error;

/// Errors raised while executing a calculation body or a helper function.
///
/// Each executor wraps its faults in its own variant so the message carries
/// the strategy that failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    #[error("Unknown calculation type: {0}")]
    UnknownType(String),

    #[error("Standard calculation error: {0}")]
    Standard(String),

    #[error("Script calculation error: {0}")]
    Script(String),

    #[error("Runtime calculation error: {0}")]
    Runtime(String),

    #[error("Alternate runtime is not available. Load a runtime before running custom-alt-runtime calculations.")]
    RuntimeUnavailable,

    #[error("Runtime calculation timed out after {0} ms")]
    RuntimeTimeout(u64),

    #[error("Function error: {0}")]
    Function(String),
}

pub type Result<T> = std::result::Result<T, ExecError>;
