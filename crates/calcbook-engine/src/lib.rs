//! calcbook-engine - executors, helper functions, formatting and the result
//! cache for parameterised calculations.

pub mod builtins;
pub mod engine;
pub mod error;

pub use error::{ExecError, Result};
