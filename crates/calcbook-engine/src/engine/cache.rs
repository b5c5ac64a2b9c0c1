//! Result cache and dependency edges.
//!
//! Entries are replaced wholesale on every successful execution. Each store
//! takes a fresh value from a monotonic generation counter, and staleness is
//! decided by comparing generations; the wall-clock timestamp is kept for
//! display only.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::calculation::CalcId;
use super::value::ParamSet;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub result: Value,
    pub formatted_result: Value,
    pub timestamp: DateTime<Utc>,
    pub params: ParamSet,
    #[serde(skip)]
    pub generation: u64,
}

/// Answer to "is this cached result still valid".
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub is_up_to_date: bool,
    pub outdated_dependencies: Vec<CalcId>,
}

/// Last result per calculation plus the ids each one referenced.
///
/// Clones share the same maps.
#[derive(Clone, Debug, Default)]
pub struct CalculationCache {
    entries: Arc<DashMap<CalcId, Arc<CacheEntry>>>,
    dependencies: Arc<DashMap<CalcId, Vec<CalcId>>>,
    generation: Arc<AtomicU64>,
}

impl CalculationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry and dependency edges for `id`.
    pub fn store(
        &self,
        id: &str,
        result: Value,
        formatted_result: Value,
        params: ParamSet,
        dependencies: Vec<CalcId>,
    ) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry {
            result,
            formatted_result,
            timestamp: Utc::now(),
            params,
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        });
        self.entries.insert(id.to_string(), entry.clone());
        self.record_dependencies(id, dependencies);
        entry
    }

    pub fn get(&self, id: &str) -> Option<Arc<CacheEntry>> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Recorded edges for `id`, if any resolution has recorded them.
    pub fn dependencies(&self, id: &str) -> Option<Vec<CalcId>> {
        self.dependencies.get(id).map(|d| d.value().clone())
    }

    /// Replace the edge list for `id`. Duplicates are dropped, first
    /// occurrence order is kept.
    pub fn record_dependencies(&self, id: &str, dependencies: Vec<CalcId>) {
        let mut unique: Vec<CalcId> = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            if !unique.contains(&dep) {
                unique.push(dep);
            }
        }
        self.dependencies.insert(id.to_string(), unique);
    }

    /// One-hop validity check against the recorded edges of `id`.
    ///
    /// Not up to date when `id` has no entry, or when any direct dependency
    /// has no entry or was stored after `id` was.
    pub fn status(&self, id: &str) -> CacheStatus {
        let Some(entry) = self.get(id) else {
            return CacheStatus::default();
        };

        let outdated_dependencies: Vec<CalcId> = self
            .dependencies(id)
            .unwrap_or_default()
            .into_iter()
            .filter(|dep| match self.get(dep) {
                Some(dep_entry) => dep_entry.generation > entry.generation,
                None => true,
            })
            .collect();

        CacheStatus {
            is_up_to_date: outdated_dependencies.is_empty(),
            outdated_dependencies,
        }
    }

    /// Remove the entry and edges for `id`. Returns whether an entry existed.
    pub fn clear(&self, id: &str) -> bool {
        self.dependencies.remove(id);
        self.entries.remove(id).is_some()
    }

    pub fn clear_all(&self) {
        self.entries.clear();
        self.dependencies.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(cache: &CalculationCache, id: &str, value: i64, deps: &[&str]) {
        cache.store(
            id,
            json!(value),
            json!(value.to_string()),
            ParamSet::new(),
            deps.iter().map(|d| d.to_string()).collect(),
        );
    }

    #[test]
    fn test_uncached_is_never_up_to_date() {
        let cache = CalculationCache::new();
        assert!(!cache.status("a").is_up_to_date);
    }

    #[test]
    fn test_dependency_newer_than_dependent() {
        let cache = CalculationCache::new();
        store(&cache, "b", 1, &[]);
        store(&cache, "a", 2, &["b"]);
        assert!(cache.status("a").is_up_to_date);

        store(&cache, "b", 5, &[]);
        let status = cache.status("a");
        assert!(!status.is_up_to_date);
        assert_eq!(status.outdated_dependencies, vec!["b".to_string()]);
    }

    #[test]
    fn test_missing_dependency_is_outdated() {
        let cache = CalculationCache::new();
        store(&cache, "b", 1, &[]);
        store(&cache, "a", 2, &["b", "b"]);
        assert_eq!(cache.dependencies("a").unwrap(), vec!["b".to_string()]);

        assert!(cache.clear("b"));
        assert_eq!(cache.dependencies("b"), None);
        assert_eq!(cache.status("a").outdated_dependencies, vec!["b".to_string()]);
    }

    #[test]
    fn test_check_is_shallow() {
        let cache = CalculationCache::new();
        store(&cache, "c", 1, &[]);
        store(&cache, "b", 2, &["c"]);
        store(&cache, "a", 3, &["b"]);
        store(&cache, "c", 9, &[]);
        assert!(!cache.status("b").is_up_to_date);
        assert!(cache.status("a").is_up_to_date);
    }

    #[test]
    fn test_clear_all() {
        let cache = CalculationCache::new();
        store(&cache, "a", 1, &["b"]);
        cache.clear_all();
        assert!(cache.is_empty());
        assert_eq!(cache.dependencies("a"), None);
    }
}
