//! TOML "book" files: engine config, settings, calculations and functions
//! in one document.
//!
//! ```toml
//! [engine]
//! runtime_timeout_ms = 2000
//!
//! [settings]
//! defaultDecimalPlaces = 3
//!
//! [[calculations]]
//! id = "area"
//! type = "standard"
//! equation = "width * height"
//! parameters = [{ name = "width" }, { name = "height" }]
//!
//! [[functions]]
//! name = "double"
//! params = ["x"]
//! code = "x * 2"
//! ```

use calcbook_engine::engine::{Calculation, FunctionDef, Settings};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::{GENERAL_SETTINGS, MemoryStore};
use crate::config::EngineConfig;
use crate::error::{CalcError, Result};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    pub engine: EngineConfig,
    pub settings: Settings,
    pub calculations: Vec<Calculation>,
    pub functions: Vec<FunctionDef>,
}

impl Book {
    pub fn load(path: &Path) -> Result<Book> {
        let content = std::fs::read_to_string(path)?;
        Book::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Book> {
        let book: Book = toml::from_str(content).map_err(|e| CalcError::parse(e.to_string()))?;
        book.validate()?;
        Ok(book)
    }

    /// Ids must be present and unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (index, calc) in self.calculations.iter().enumerate() {
            if calc.id.trim().is_empty() {
                return Err(CalcError::parse(format!(
                    "calculation #{} has an empty id",
                    index + 1
                )));
            }
            if !seen.insert(calc.id.as_str()) {
                return Err(CalcError::parse(format!(
                    "duplicate calculation id: {}",
                    calc.id
                )));
            }
        }
        Ok(())
    }

    /// Populate an in-memory store with this book's contents.
    pub fn to_store(&self) -> Result<MemoryStore> {
        let store = MemoryStore::new();
        for calc in &self.calculations {
            store.insert_calculation(calc.clone());
        }
        for function in &self.functions {
            store.insert_function(function.clone());
        }
        let settings =
            serde_json::to_value(&self.settings).map_err(|e| CalcError::parse(e.to_string()))?;
        store.set_settings(GENERAL_SETTINGS, settings);
        Ok(store)
    }
}
