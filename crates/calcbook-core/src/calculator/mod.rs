//! The execution orchestrator.
//!
//! A [`Calculator`] owns the function registry, the result cache and the
//! dependency edges for one session, and sequences every call through
//! resolve, execute, format, cache and history.

mod deps;
mod execute;
mod resolve;
mod state;

pub use execute::ExecutionDetails;
pub use state::{Calculator, CalculatorBuilder};
