//! Custom-script calculations run as a Rhai function body.

use async_trait::async_trait;
use rhai::{Dynamic, Scope};
use serde_json::Value;

use super::{ExecutionContext, Executor};
use crate::engine::eval::{create_engine_with_log, from_dynamic, to_dynamic};
use crate::engine::functions::{CALCULATION_BODY_FN, function_source, is_identifier};
use crate::error::{ExecError, Result};

/// Runs `customCode` as `fn calculation_body(params..) { code }`, compiled
/// alongside the registered function library. `log(..)` and `print(..)`
/// write to the execution log.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptExecutor;

#[async_trait]
impl Executor for ScriptExecutor {
    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Value> {
        let code = ctx
            .calculation
            .custom_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                ExecError::Script("No code provided for custom script calculation".into())
            })?;

        ctx.log.push(format!(
            "Executing custom script (length: {} chars)",
            code.chars().count()
        ));

        let params = ctx.ordered_params();
        if let Some((bad, _)) = params.iter().find(|(name, _)| !is_identifier(name)) {
            return Err(ExecError::Script(format!(
                "parameter '{}' is not a valid identifier",
                bad
            )));
        }

        let names: Vec<String> = params.iter().map(|(name, _)| name.to_string()).collect();
        let args = params
            .iter()
            .map(|(_, value)| to_dynamic(value))
            .collect::<std::result::Result<Vec<Dynamic>, _>>()
            .map_err(ExecError::Script)?;

        let engine = create_engine_with_log(ctx.log);
        let body = engine
            .compile(function_source(CALCULATION_BODY_FN, &names, code))
            .map_err(|e| ExecError::Script(e.to_string()))?;
        let ast = ctx.functions.ast().merge(&body);

        let result = engine
            .call_fn::<Dynamic>(&mut Scope::new(), &ast, CALCULATION_BODY_FN, args)
            .map_err(|e| ExecError::Script(e.to_string()))?;
        from_dynamic(&result).map_err(ExecError::Script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::ParamSet;
    use crate::engine::{Calculation, ExecutionLog, FunctionDef, FunctionLibrary, FunctionRegistry};
    use serde_json::json;

    async fn run(calc: &Calculation, params: ParamSet, functions: &FunctionLibrary, log: &ExecutionLog) -> Result<Value> {
        let ctx = ExecutionContext {
            calculation: calc,
            params: &params,
            functions,
            log,
        };
        ScriptExecutor.execute(&ctx).await
    }

    #[tokio::test]
    async fn test_script_returns_value_and_calls_functions() {
        let registry = FunctionRegistry::new();
        registry
            .register(&FunctionDef::new("square", &["x"], "x * x"))
            .unwrap();
        let calc = Calculation::script("s", "let a = square(w);\nreturn a + h;");
        let params: ParamSet = [("w".to_string(), json!(3)), ("h".to_string(), json!(1))]
            .into_iter()
            .collect();
        let log = ExecutionLog::new();
        let result = run(&calc, params, &registry.library().unwrap(), &log)
            .await
            .unwrap();
        assert_eq!(result, json!(10));
    }

    #[tokio::test]
    async fn test_script_log_hook() {
        let calc = Calculation::script("s", "log(\"halfway\");\n#{ ok: true }");
        let log = ExecutionLog::new();
        let result = run(&calc, ParamSet::new(), &FunctionLibrary::empty(), &log)
            .await
            .unwrap();
        assert_eq!(result, json!({"ok": true}));
        assert!(log.messages().contains(&"Custom code log: halfway".to_string()));
    }

    #[tokio::test]
    async fn test_script_faults_are_prefixed() {
        let calc = Calculation::script("s", "let = ;");
        let log = ExecutionLog::new();
        let err = run(&calc, ParamSet::new(), &FunctionLibrary::empty(), &log)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Script calculation error: "));

        let calc = Calculation::script("s", "throw \"bad input\";");
        let err = run(&calc, ParamSet::new(), &FunctionLibrary::empty(), &log)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad input"));
    }

    #[tokio::test]
    async fn test_missing_code() {
        let mut calc = Calculation::script("s", "");
        calc.custom_code = None;
        let log = ExecutionLog::new();
        let err = run(&calc, ParamSet::new(), &FunctionLibrary::empty(), &log)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ExecError::Script("No code provided for custom script calculation".into())
        );
    }
}
