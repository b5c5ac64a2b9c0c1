//! Parameter resolution.
//!
//! Declared parameters the caller did not supply are filled from their
//! default or, for calculation-typed parameters, from the referenced
//! calculation's raw result. References resolve concurrently; the first
//! failure aborts the rest.

use calcbook_engine::engine::{
    CalcId, Calculation, ExecutionLog, ParamSet, Parameter, extract_property,
};
use futures::future::try_join_all;
use serde_json::Value;

use super::Calculator;
use crate::config::ExecuteOptions;
use crate::error::{CalcError, Result};

/// Parameters ready for execution plus the ids they were pulled from.
pub(crate) struct Resolved {
    pub params: ParamSet,
    pub dependencies: Vec<CalcId>,
}

impl Calculator {
    pub(crate) async fn resolve(
        &self,
        calc: &Calculation,
        supplied: ParamSet,
        options: ExecuteOptions,
        log: &ExecutionLog,
        path: &[CalcId],
    ) -> Result<Resolved> {
        let mut params = supplied;
        let mut pending = Vec::new();

        for param in &calc.parameters {
            if params.contains_key(&param.name) {
                continue;
            }
            match param.referenced_calculation() {
                Some(reference) => {
                    pending.push(self.resolve_reference(param, reference, options, log, path))
                }
                None => {
                    if let Some(default) = &param.default_value {
                        params.insert(param.name.clone(), default.clone());
                    }
                }
            }
        }

        let mut dependencies = Vec::with_capacity(pending.len());
        for (name, reference, value) in try_join_all(pending).await? {
            params.insert(name, value);
            dependencies.push(reference);
        }

        Ok(Resolved {
            params,
            dependencies,
        })
    }

    async fn resolve_reference(
        &self,
        param: &Parameter,
        reference: &str,
        options: ExecuteOptions,
        log: &ExecutionLog,
        path: &[CalcId],
    ) -> Result<(String, CalcId, Value)> {
        let raw = match self.referenced_result(reference, options, log, path).await {
            Ok(raw) => raw,
            Err(e) => {
                log.push(format!(
                    "Error resolving referenced calculation {}: {}",
                    reference, e
                ));
                return Err(e);
            }
        };

        let value = match param.result_property.as_deref().map(str::trim) {
            Some(property) if !property.is_empty() => extract_property(&raw, property),
            _ => raw,
        };
        Ok((param.name.clone(), reference.to_string(), value))
    }

    /// Raw result of `reference`, from the cache or a nested run.
    async fn referenced_result(
        &self,
        reference: &str,
        options: ExecuteOptions,
        log: &ExecutionLog,
        path: &[CalcId],
    ) -> Result<Value> {
        if options.use_cache {
            if let Some(entry) = self.cache.get(reference) {
                log.push(format!("Using cached result for calculation {}", reference));
                return Ok(entry.result.clone());
            }
        }

        let referenced = self
            .calculations
            .get(reference)
            .await?
            .ok_or_else(|| CalcError::MissingReference(reference.to_string()))?;

        // Nested runs never write history.
        let nested = options.without_history();
        let entry = self
            .run(&referenced, ParamSet::new(), nested, log, path)
            .await?;
        Ok(entry.result.clone())
    }
}
