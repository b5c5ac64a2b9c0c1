//! Execution strategies.
//!
//! Each [`CalculationType`] maps to one [`Executor`]. All of them take the
//! fully resolved parameters plus a snapshot of the registered functions and
//! produce a raw, unformatted result exactly once.

mod runtime;
mod script;
mod standard;

pub use runtime::{AlternateRuntime, Completion, RuntimeExecutor, RuntimeOutcome, build_program};
pub use script::ScriptExecutor;
pub use standard::{EvalexprEvaluator, ExpressionEvaluator, StandardExecutor};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::calculation::{Calculation, CalculationType};
use super::functions::FunctionLibrary;
use super::log::ExecutionLog;
use super::value::ParamSet;
use crate::error::{ExecError, Result};

/// Everything an executor sees for one run.
pub struct ExecutionContext<'a> {
    pub calculation: &'a Calculation,
    pub params: &'a ParamSet,
    pub functions: &'a FunctionLibrary,
    pub log: &'a ExecutionLog,
}

impl ExecutionContext<'_> {
    /// Parameters in declaration order, followed by any undeclared overrides
    /// in name order.
    pub fn ordered_params(&self) -> Vec<(&str, &Value)> {
        let declared = &self.calculation.parameters;
        let mut ordered: Vec<(&str, &Value)> = declared
            .iter()
            .filter_map(|p| self.params.get_key_value(&p.name))
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        ordered.extend(
            self.params
                .iter()
                .filter(|(name, _)| !declared.iter().any(|p| &p.name == *name))
                .map(|(k, v)| (k.as_str(), v)),
        );
        ordered
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Value>;
}

/// Routes a calculation to the executor for its type.
pub struct Dispatcher {
    standard: StandardExecutor,
    script: ScriptExecutor,
    runtime: RuntimeExecutor,
}

impl Dispatcher {
    pub fn new(
        evaluator: Arc<dyn ExpressionEvaluator>,
        runtime: Option<Arc<dyn AlternateRuntime>>,
        runtime_timeout: Duration,
    ) -> Dispatcher {
        Dispatcher {
            standard: StandardExecutor::new(evaluator),
            script: ScriptExecutor,
            runtime: RuntimeExecutor::new(runtime, runtime_timeout),
        }
    }

    pub fn executor_for(&self, calc_type: CalculationType) -> &dyn Executor {
        match calc_type {
            CalculationType::Standard => &self.standard,
            CalculationType::CustomScript => &self.script,
            CalculationType::CustomAltRuntime => &self.runtime,
        }
    }

    pub fn has_runtime(&self) -> bool {
        self.runtime.is_available()
    }

    pub async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Value> {
        let calc_type = ctx
            .calculation
            .calculation_type()
            .map_err(ExecError::UnknownType)?;
        self.executor_for(calc_type).execute(ctx).await
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Dispatcher::new(Arc::new(EvalexprEvaluator), None, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Parameter;
    use serde_json::json;

    #[test]
    fn test_ordered_params_follow_declarations() {
        let calc = Calculation::script("c", "0")
            .with_parameter(Parameter::literal("zeta"))
            .with_parameter(Parameter::literal("alpha"));
        let mut params = ParamSet::new();
        params.insert("alpha".into(), json!(1));
        params.insert("extra".into(), json!(3));
        params.insert("zeta".into(), json!(2));
        let functions = FunctionLibrary::empty();
        let log = ExecutionLog::new();
        let ctx = ExecutionContext {
            calculation: &calc,
            params: &params,
            functions: &functions,
            log: &log,
        };
        let names: Vec<&str> = ctx.ordered_params().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha", "extra"]);
    }

    #[tokio::test]
    async fn test_unknown_type_is_rejected() {
        let mut calc = Calculation::standard("c", "1");
        calc.calc_type = "custom-cobol".into();
        let params = ParamSet::new();
        let functions = FunctionLibrary::empty();
        let log = ExecutionLog::new();
        let ctx = ExecutionContext {
            calculation: &calc,
            params: &params,
            functions: &functions,
            log: &log,
        };
        let err = Dispatcher::default().execute(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown calculation type: custom-cobol");
    }
}
