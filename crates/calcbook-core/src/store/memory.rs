//! In-memory implementation of every store.

use async_trait::async_trait;
use calcbook_engine::engine::{Calculation, FunctionDef};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use super::{CalculationStore, FunctionStore, HistoryEntry, HistoryStore, SettingsStore};
use crate::error::Result;

/// Stores backed by shared maps. Clones see the same data.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    calculations: Arc<DashMap<String, Calculation>>,
    functions: Arc<DashMap<String, FunctionDef>>,
    settings: Arc<DashMap<String, Value>>,
    history: Arc<Mutex<Vec<HistoryEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_calculation(&self, calculation: Calculation) {
        self.calculations.insert(calculation.id.clone(), calculation);
    }

    pub fn remove_calculation(&self, id: &str) -> Option<Calculation> {
        self.calculations.remove(id).map(|(_, c)| c)
    }

    pub fn insert_function(&self, function: FunctionDef) {
        self.functions.insert(function.name.clone(), function);
    }

    pub fn set_settings(&self, name: &str, value: Value) {
        self.settings.insert(name.to_string(), value);
    }

    /// Recorded history, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().clone()
    }
}

#[async_trait]
impl CalculationStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Calculation>> {
        Ok(self.calculations.get(id).map(|c| c.value().clone()))
    }

    async fn get_all(&self) -> Result<Vec<Calculation>> {
        let mut all: Vec<Calculation> = self.calculations.iter().map(|c| c.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

#[async_trait]
impl FunctionStore for MemoryStore {
    async fn get_all(&self, global_only: bool) -> Result<Vec<FunctionDef>> {
        let mut all: Vec<FunctionDef> = self
            .functions
            .iter()
            .filter(|f| !global_only || f.global)
            .map(|f| f.value().clone())
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, name: &str) -> Result<Option<Value>> {
        Ok(self.settings.get(name).map(|s| s.value().clone()))
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn save(&self, entry: HistoryEntry) -> Result<()> {
        self.history.lock().push(entry);
        Ok(())
    }
}
