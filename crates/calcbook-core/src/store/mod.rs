//! Collaborator contracts the calculator reads from and writes to.
//!
//! The surrounding application owns calculation definitions, helper
//! functions, settings and history. The calculator only sees them through
//! these traits.

mod book;
mod memory;
mod rhai_file;

pub use book::Book;
pub use memory::MemoryStore;
pub use rhai_file::{parse_function_items, read_functions_file};

use async_trait::async_trait;
use calcbook_engine::engine::{CalcId, Calculation, FunctionDef, ParamSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Name under which formatting defaults are stored.
pub const GENERAL_SETTINGS: &str = "generalSettings";

#[async_trait]
pub trait CalculationStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Calculation>>;
    async fn get_all(&self) -> Result<Vec<Calculation>>;
}

#[async_trait]
pub trait FunctionStore: Send + Sync {
    async fn get_all(&self, global_only: bool) -> Result<Vec<FunctionDef>>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// A named settings record, if one has been saved.
    async fn get(&self, name: &str) -> Result<Option<Value>>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn save(&self, entry: HistoryEntry) -> Result<()>;
}

/// One recorded top-level run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub calculation_id: CalcId,
    pub result: Value,
    pub formatted_result: Value,
    pub params: ParamSet,
    pub timestamp: DateTime<Utc>,
}
