//! calcbook-core - calculation orchestration over pluggable stores.

pub mod calculator;
pub mod config;
pub mod error;
pub mod store;

pub use calculator::{Calculator, CalculatorBuilder, ExecutionDetails};
pub use config::{EngineConfig, ExecuteOptions};
pub use error::{CalcError, Result};
pub use store::{
    Book, CalculationStore, FunctionStore, HistoryEntry, HistoryStore, MemoryStore, SettingsStore,
};

pub use calcbook_engine::engine::{Calculation, FunctionDef, ParamSet, Parameter};
