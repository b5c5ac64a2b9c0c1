//! Cache and dependency queries.

use calcbook_engine::engine::{
    CacheEntry, CacheStatus, CalcId, LogEntry, declared_references, detect_cycle,
    find_dependents, reference_graph, transitive_dependents,
};
use std::sync::Arc;

use super::Calculator;
use crate::error::{CalcError, Result};

impl Calculator {
    /// Ids `id` referenced during its last resolution. Before any run, the
    /// declared references of the stored definition are recorded and
    /// returned instead.
    pub async fn dependencies(&self, id: &str) -> Result<Vec<CalcId>> {
        if let Some(deps) = self.cache.dependencies(id) {
            return Ok(deps);
        }
        let calc = self
            .calculations
            .get(id)
            .await?
            .ok_or_else(|| CalcError::NotFound(id.to_string()))?;
        let deps = declared_references(&calc);
        self.cache.record_dependencies(id, deps.clone());
        Ok(deps)
    }

    /// Stored calculations that declare a reference to `id`.
    pub async fn dependents(&self, id: &str) -> Result<Vec<CalcId>> {
        let all = self.calculations.get_all().await?;
        Ok(find_dependents(id, &all))
    }

    /// Shallow validity check of the cached result for `id`.
    pub fn is_up_to_date(&self, id: &str) -> CacheStatus {
        self.cache.status(id)
    }

    pub fn cached_result(&self, id: &str) -> Option<Arc<CacheEntry>> {
        self.cache.get(id)
    }

    /// Drop the cached result and recorded edges for `id`.
    pub fn clear_cache(&self, id: &str) -> bool {
        self.cache.clear(id)
    }

    pub fn clear_all_caches(&self) {
        self.cache.clear_all();
    }

    /// Clear `id` and every stored calculation that depends on it, directly
    /// or transitively. Returns the ids whose cache entries were removed.
    pub async fn invalidate(&self, id: &str) -> Result<Vec<CalcId>> {
        let all = self.calculations.get_all().await?;
        let mut affected = vec![id.to_string()];
        affected.extend(transitive_dependents(id, &all));
        Ok(affected
            .into_iter()
            .filter(|calc_id| self.cache.clear(calc_id))
            .collect())
    }

    /// A reference loop reachable from `id` in the stored definitions.
    pub async fn find_cycle(&self, id: &str) -> Result<Option<Vec<CalcId>>> {
        let all = self.calculations.get_all().await?;
        Ok(detect_cycle(id, &reference_graph(&all)))
    }

    /// Log of the most recent top-level execution.
    pub fn execution_log(&self) -> Vec<LogEntry> {
        self.last_log.lock().entries()
    }
}
