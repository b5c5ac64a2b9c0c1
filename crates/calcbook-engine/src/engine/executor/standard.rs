//! Standard calculations: an equation evaluated against parameters and
//! registered functions.

use async_trait::async_trait;
use evalexpr::{
    ContextWithMutableFunctions, ContextWithMutableVariables, EvalexprError, Function,
    HashMapContext, Value as ExprValue,
};
use serde_json::Value;
use std::sync::Arc;

use super::{ExecutionContext, Executor};
use crate::engine::functions::FunctionLibrary;
use crate::engine::value::{ParamSet, float_value};
use crate::error::{ExecError, Result};

/// Evaluates an equation string in a variable/function context.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(
        &self,
        equation: &str,
        variables: &ParamSet,
        functions: &FunctionLibrary,
    ) -> std::result::Result<Value, String>;
}

/// [`ExpressionEvaluator`] backed by `evalexpr`.
///
/// Registered functions are bridged in as evalexpr functions that call into
/// the Rhai function library.
#[derive(Clone, Copy, Debug, Default)]
pub struct EvalexprEvaluator;

impl ExpressionEvaluator for EvalexprEvaluator {
    fn evaluate(
        &self,
        equation: &str,
        variables: &ParamSet,
        functions: &FunctionLibrary,
    ) -> std::result::Result<Value, String> {
        let mut context = HashMapContext::new();

        for (name, value) in variables {
            let value = to_expr_value(value)
                .map_err(|e| format!("parameter {}: {}", name, e))?;
            context
                .set_value(name.to_string(), value)
                .map_err(|e| format!("Failed to set variable {}: {}", name, e))?;
        }

        for function in functions.functions() {
            let library = functions.clone();
            let name = function.name().to_string();
            let arity = function.params().len();
            context
                .set_function(
                    name.clone(),
                    Function::new(move |argument| {
                        let args = spread_arguments(argument, arity);
                        let result = library
                            .call(&name, args)
                            .map_err(|e| EvalexprError::CustomMessage(e.to_string()))?;
                        to_expr_value(&result).map_err(EvalexprError::CustomMessage)
                    }),
                )
                .map_err(|e| format!("Failed to register {}: {}", function.name(), e))?;
        }

        let result = evalexpr::eval_with_context(equation, &context).map_err(|e| e.to_string())?;
        Ok(from_expr_value(&result))
    }
}

/// evalexpr passes several arguments as one tuple; a single-parameter
/// function receives the tuple itself as an array.
fn spread_arguments(argument: &ExprValue, arity: usize) -> Vec<Value> {
    match argument {
        ExprValue::Tuple(items) if arity != 1 => items.iter().map(from_expr_value).collect(),
        ExprValue::Empty => vec![],
        other => vec![from_expr_value(other)],
    }
}

fn to_expr_value(value: &Value) -> std::result::Result<ExprValue, String> {
    Ok(match value {
        Value::Null => ExprValue::Empty,
        Value::Bool(b) => ExprValue::Boolean(*b),
        // Numbers enter as floats so `/` divides exactly.
        Value::Number(n) => ExprValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => ExprValue::String(s.clone()),
        Value::Array(items) => ExprValue::Tuple(
            items
                .iter()
                .map(to_expr_value)
                .collect::<std::result::Result<Vec<_>, _>>()?,
        ),
        Value::Object(_) => {
            return Err("objects cannot be used in equations; select a resultProperty".into());
        }
    })
}

fn from_expr_value(value: &ExprValue) -> Value {
    match value {
        ExprValue::String(s) => Value::String(s.clone()),
        ExprValue::Float(f) if is_whole(*f) => Value::from(*f as i64),
        ExprValue::Float(f) => float_value(*f),
        ExprValue::Int(i) => Value::from(*i),
        ExprValue::Boolean(b) => Value::Bool(*b),
        ExprValue::Tuple(items) => Value::Array(items.iter().map(from_expr_value).collect()),
        ExprValue::Empty => Value::Null,
    }
}

/// Whole floats small enough to be exact come back out as integers.
fn is_whole(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_EXACT_INT
}

const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

pub struct StandardExecutor {
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl StandardExecutor {
    pub fn new(evaluator: Arc<dyn ExpressionEvaluator>) -> StandardExecutor {
        StandardExecutor { evaluator }
    }
}

#[async_trait]
impl Executor for StandardExecutor {
    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Value> {
        let equation = ctx
            .calculation
            .equation
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                ExecError::Standard("No equation provided for standard calculation".into())
            })?;

        ctx.log.push(format!("Executing standard equation: {}", equation));
        self.evaluator
            .evaluate(equation, ctx.params, ctx.functions)
            .map_err(ExecError::Standard)
    }
}
