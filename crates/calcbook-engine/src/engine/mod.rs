//! Calculation engine API.
//!
//! This module provides the building blocks the orchestrator composes:
//!
//! - [`Calculation`], [`Parameter`], [`FunctionDef`], [`Settings`] - Definitions read from the stores
//! - [`FunctionRegistry`], [`FunctionLibrary`] - Helper functions compiled with Rhai
//! - [`Dispatcher`] and the [`Executor`] strategies - Run a calculation body
//! - [`format_result`] - Shape raw results for display
//! - [`CalculationCache`] - Last results and recorded dependency edges
//! - [`detect_cycle`], [`find_dependents`] - Analysis of declared references
//! - [`ExecutionLog`] - Per-call log shared with nested executions

mod cache;
mod calculation;
mod cycle;
mod deps;
mod eval;
mod executor;
mod format;
mod functions;
mod log;
mod value;

pub use cache::{CacheEntry, CacheStatus, CalculationCache};
pub use calculation::{
    CalcId, Calculation, CalculationType, FunctionDef, NumberFormat, Parameter, ParameterKind,
    ResultFormat, Settings,
};
pub use cycle::{describe_cycle, detect_cycle, reference_graph};
pub use deps::{declared_references, find_dependents, transitive_dependents};
pub use eval::{create_engine, create_engine_with_log, from_dynamic, to_dynamic};
pub use executor::{
    AlternateRuntime, Completion, Dispatcher, EvalexprEvaluator, ExecutionContext, Executor,
    ExpressionEvaluator, RuntimeExecutor, RuntimeOutcome, ScriptExecutor, StandardExecutor,
    build_program,
};
pub use format::{NumberStyle, classify, format_number, format_result};
pub use functions::{FunctionLibrary, FunctionRegistry, RegisteredFunction, is_identifier, test_function};
pub use log::{ExecutionLog, LogEntry};
pub use value::{ParamSet, describe_params, extract_property, float_value};

pub use rhai::Dynamic;
