//! Error types for the calcbook command line

use thiserror::Error;

/// Errors in the command line itself
#[derive(Error, Debug, PartialEq)]
pub enum CliError {
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),

    #[error("Invalid parameter '{0}', expected NAME=VALUE")]
    InvalidParam(String),

    #[error("No book file given")]
    MissingBook,
}

pub type Result<T> = std::result::Result<T, CliError>;
