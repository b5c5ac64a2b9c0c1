use calcbook_engine::engine::{
    CacheEntry, CalcId, Calculation, ExecutionContext, ExecutionLog, LogEntry, ParamSet,
    describe_params, format_result,
};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::Calculator;
use crate::config::ExecuteOptions;
use crate::error::{CalcError, Result};
use crate::store::HistoryEntry;

/// Everything a detailed execution reports.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDetails {
    pub result: Value,
    pub formatted_result: Value,
    pub log: Vec<LogEntry>,
    pub parameters: ParamSet,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Calculator {
    /// Execute a calculation and return its formatted result.
    pub async fn execute(
        &self,
        calc: &Calculation,
        params: ParamSet,
        options: ExecuteOptions,
    ) -> Result<Value> {
        let log = self.start_log();
        let entry = self.run(calc, params, options, &log, &[]).await?;
        Ok(entry.formatted_result.clone())
    }

    /// Execute a calculation and return the raw and formatted result, the
    /// resolved parameters and the execution log.
    pub async fn execute_detailed(
        &self,
        calc: &Calculation,
        params: ParamSet,
        options: ExecuteOptions,
    ) -> Result<ExecutionDetails> {
        let log = self.start_log();
        let entry = self.run(calc, params, options, &log, &[]).await?;
        Ok(ExecutionDetails {
            result: entry.result.clone(),
            formatted_result: entry.formatted_result.clone(),
            log: log.entries(),
            parameters: entry.params.clone(),
            timestamp: entry.timestamp,
            unit: calc.result_unit.clone(),
        })
    }

    /// Look up a stored calculation and execute it.
    pub async fn execute_by_id(
        &self,
        id: &str,
        params: ParamSet,
        options: ExecuteOptions,
    ) -> Result<Value> {
        let Some(calc) = self.calculations.get(id).await? else {
            let err = CalcError::NotFound(id.to_string());
            self.start_log().push(err.to_string());
            return Err(err);
        };
        self.execute(&calc, params, options).await
    }

    /// Fresh log for a top-level call; it replaces the previous one.
    fn start_log(&self) -> ExecutionLog {
        let log = ExecutionLog::new();
        *self.last_log.lock() = log.clone();
        log
    }

    /// One execution, top-level or nested. `path` holds the ids currently
    /// being resolved above this one.
    pub(crate) fn run<'a>(
        &'a self,
        calc: &'a Calculation,
        supplied: ParamSet,
        options: ExecuteOptions,
        log: &'a ExecutionLog,
        path: &'a [CalcId],
    ) -> BoxFuture<'a, Result<Arc<CacheEntry>>> {
        async move {
            log.push(format!(
                "Executing calculation: {} (ID: {})",
                calc.display_name(),
                calc.id
            ));
            log.push(format!("Parameters: {}", describe_params(&supplied)));

            if self.config.detect_cycles {
                if let Some(start) = path.iter().position(|id| id == &calc.id) {
                    let mut cycle = path[start..].to_vec();
                    cycle.push(calc.id.clone());
                    let err = CalcError::CircularDependency(cycle);
                    log.push(format!("Parameter resolution error: {}", err));
                    return Err(err);
                }
            }

            let mut here = path.to_vec();
            here.push(calc.id.clone());

            let resolved = match self.resolve(calc, supplied, options, log, &here).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    log.push(format!("Parameter resolution error: {}", e));
                    return Err(e);
                }
            };
            log.push(format!(
                "Resolved parameters: {}",
                describe_params(&resolved.params)
            ));

            let result = match self.execute_body(calc, &resolved.params, log).await {
                Ok(result) => result,
                Err(e) => {
                    log.push(format!("Calculation error: {}", e));
                    return Err(e);
                }
            };
            log.push(format!("Calculation result: {}", result));

            let settings = self.settings();
            let formatted = format_result(&result, calc, &settings);
            let entry = self.cache.store(
                &calc.id,
                result,
                formatted,
                resolved.params,
                resolved.dependencies,
            );
            tracing::debug!("Cached result for calculation {}", calc.id);

            if options.save_history && calc.store_history {
                self.record_history(calc, &entry, log).await;
            }

            Ok(entry)
        }
        .boxed()
    }

    async fn execute_body(
        &self,
        calc: &Calculation,
        params: &ParamSet,
        log: &ExecutionLog,
    ) -> Result<Value> {
        let functions = self.registry.library()?;
        let ctx = ExecutionContext {
            calculation: calc,
            params,
            functions: &functions,
            log,
        };
        Ok(self.dispatcher.execute(&ctx).await?)
    }

    /// Best effort: failures are logged, never returned.
    async fn record_history(&self, calc: &Calculation, entry: &CacheEntry, log: &ExecutionLog) {
        let Some(history) = &self.history else {
            return;
        };
        let record = HistoryEntry {
            calculation_id: calc.id.clone(),
            result: entry.result.clone(),
            formatted_result: entry.formatted_result.clone(),
            params: entry.params.clone(),
            timestamp: entry.timestamp,
        };
        if let Err(e) = history.save(record).await {
            tracing::warn!("Error saving calculation history: {}", e);
            log.push(format!("Error saving calculation history: {}", e));
        }
    }
}
