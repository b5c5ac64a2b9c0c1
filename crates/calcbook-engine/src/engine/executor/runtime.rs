//! Custom calculations executed by an external alternate-language runtime.
//!
//! The engine renders parameters and user code into a Python-style program,
//! hands it to the runtime under a unique execution id, and waits for the
//! runtime to report through a [`Completion`] handle. The wait is bounded by
//! a timeout and the runtime is always asked to clean up afterwards.

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use super::{ExecutionContext, Executor};
use crate::engine::functions::is_identifier;
use crate::error::{ExecError, Result};

/// What a runtime reports when a program finishes: the extracted result or
/// the error text it raised.
pub type RuntimeOutcome = std::result::Result<Value, String>;

/// One-shot channel through which a runtime reports completion.
#[derive(Debug)]
pub struct Completion {
    sender: oneshot::Sender<RuntimeOutcome>,
}

impl Completion {
    fn channel() -> (Completion, oneshot::Receiver<RuntimeOutcome>) {
        let (sender, receiver) = oneshot::channel();
        (Completion { sender }, receiver)
    }

    /// Report the outcome. Returns false if the engine stopped waiting.
    pub fn complete(self, outcome: RuntimeOutcome) -> bool {
        self.sender.send(outcome).is_ok()
    }

    pub fn succeed(self, value: Value) -> bool {
        self.complete(Ok(value))
    }

    pub fn fail(self, error: impl Into<String>) -> bool {
        self.complete(Err(error.into()))
    }
}

/// An embedded interpreter for another language.
///
/// `execute` may report synchronously or hand the [`Completion`] to a
/// background task. Staging, starting and waiting all share one deadline.
#[async_trait]
pub trait AlternateRuntime: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the interpreter is loaded and can accept programs.
    fn is_available(&self) -> bool {
        true
    }

    /// Stage `program` under `exec_id`.
    async fn inject(&self, exec_id: &str, program: &str) -> std::result::Result<(), String>;

    /// Start the staged program. The outcome is reported through `completion`.
    async fn execute(&self, exec_id: &str, completion: Completion);

    /// Drop any state held for `exec_id`.
    async fn cleanup(&self, exec_id: &str);
}

/// Render a value as a Python literal. Strings use JSON escaping, which
/// Python reads the same way.
fn literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(_) => value.to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), literal(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// The last line that is not blank, a comment or an import.
fn last_statement(code: &str) -> Option<&str> {
    code.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("import"))
        .last()
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the program handed to the runtime.
///
/// Parameters become assignments, the user code runs inside a `try`, and the
/// value left in `__outcome__` is either the `result` binding (dicts as JSON
/// text) or the code's final statement.
pub fn build_program(code: &str, params: &[(&str, &Value)]) -> Result<String> {
    if let Some((bad, _)) = params.iter().find(|(name, _)| !is_identifier(name)) {
        return Err(ExecError::Runtime(format!(
            "parameter '{}' is not a valid identifier",
            bad
        )));
    }
    let assignments: String = params
        .iter()
        .map(|(name, value)| format!("{} = {}\n", name, literal(value)))
        .collect();
    let fallback = last_statement(code).unwrap_or("None");

    Ok(format!(
        "import math\nimport json\n\n__outcome__ = {{'result': None, 'error': None}}\ntry:\n{assignments}\n{code}\n    if 'result' in locals():\n        __outcome__['result'] = json.dumps(result) if isinstance(result, dict) else result\n    else:\n        __outcome__['result'] = {fallback}\nexcept Exception as e:\n    __outcome__['error'] = str(e)\n",
        assignments = indent(&assignments, "    "),
        code = indent(code, "    "),
        fallback = fallback,
    ))
}

/// JSON text shaped like an object is parsed back into a structure.
fn decode_result(value: Value) -> Value {
    match value {
        Value::String(text) if text.starts_with('{') && text.ends_with('}') => {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        other => other,
    }
}

fn execution_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("rt_exec_{}_{}", millis, suffix)
}

pub struct RuntimeExecutor {
    runtime: Option<Arc<dyn AlternateRuntime>>,
    timeout: Duration,
}

impl RuntimeExecutor {
    pub fn new(runtime: Option<Arc<dyn AlternateRuntime>>, timeout: Duration) -> RuntimeExecutor {
        RuntimeExecutor { runtime, timeout }
    }

    pub fn is_available(&self) -> bool {
        self.runtime.as_ref().is_some_and(|r| r.is_available())
    }

    async fn run(&self, runtime: &dyn AlternateRuntime, exec_id: &str, program: &str) -> Result<Value> {
        let attempt = async {
            if let Err(e) = runtime.inject(exec_id, program).await {
                return Err(ExecError::Runtime(format!("setup error: {}", e)));
            }

            let (completion, receiver) = Completion::channel();
            runtime.execute(exec_id, completion).await;

            match receiver.await {
                Err(_) => Err(ExecError::Runtime(
                    "runtime finished without reporting a result".into(),
                )),
                Ok(Err(message)) => Err(ExecError::Runtime(message)),
                Ok(Ok(value)) => Ok(decode_result(value)),
            }
        };

        tokio::time::timeout(self.timeout, attempt)
            .await
            .unwrap_or_else(|_| Err(ExecError::RuntimeTimeout(self.timeout.as_millis() as u64)))
    }
}

#[async_trait]
impl Executor for RuntimeExecutor {
    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Value> {
        let runtime = match &self.runtime {
            Some(runtime) if runtime.is_available() => runtime.clone(),
            _ => return Err(ExecError::RuntimeUnavailable),
        };

        let code = ctx
            .calculation
            .custom_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                ExecError::Runtime("No code provided for custom runtime calculation".into())
            })?;

        ctx.log.push(format!(
            "Executing custom {} code (length: {} chars)",
            runtime.name(),
            code.chars().count()
        ));

        let program = build_program(code, &ctx.ordered_params())?;
        let exec_id = execution_id();
        let outcome = self.run(runtime.as_ref(), &exec_id, &program).await;
        runtime.cleanup(&exec_id).await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::ParamSet;
    use crate::engine::{Calculation, ExecutionLog, FunctionLibrary};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Reports a fixed outcome and records the calls it saw.
    struct FakeRuntime {
        outcome: Option<RuntimeOutcome>,
        calls: Mutex<Vec<String>>,
        programs: Mutex<Vec<String>>,
    }

    impl FakeRuntime {
        fn new(outcome: Option<RuntimeOutcome>) -> Arc<FakeRuntime> {
            Arc::new(FakeRuntime {
                outcome,
                calls: Mutex::new(vec![]),
                programs: Mutex::new(vec![]),
            })
        }
    }

    #[async_trait]
    impl AlternateRuntime for FakeRuntime {
        fn name(&self) -> &str {
            "python"
        }

        async fn inject(&self, exec_id: &str, program: &str) -> std::result::Result<(), String> {
            self.calls.lock().push(format!("inject {}", exec_id));
            self.programs.lock().push(program.to_string());
            Ok(())
        }

        async fn execute(&self, exec_id: &str, completion: Completion) {
            self.calls.lock().push(format!("execute {}", exec_id));
            match self.outcome.clone() {
                Some(outcome) => {
                    completion.complete(outcome);
                }
                // Never reports; hold the sender so the engine times out.
                None => {
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        drop(completion);
                    });
                }
            }
        }

        async fn cleanup(&self, exec_id: &str) {
            self.calls.lock().push(format!("cleanup {}", exec_id));
        }
    }

    async fn run(executor: &RuntimeExecutor, calc: &Calculation, params: ParamSet) -> Result<Value> {
        let log = ExecutionLog::new();
        let functions = FunctionLibrary::empty();
        let ctx = ExecutionContext {
            calculation: calc,
            params: &params,
            functions: &functions,
            log: &log,
        };
        executor.execute(&ctx).await
    }

    #[test]
    fn test_build_program() {
        let text = json!("beam");
        let flag = json!(true);
        let obj = json!({"a": 1, "b": [null, false]});
        let program = build_program(
            "# comment\nimport os\nx = 2\nx * 3\n",
            &[("name", &text), ("flag", &flag), ("cfg", &obj)],
        )
        .unwrap();
        assert!(program.contains("    name = \"beam\""));
        assert!(program.contains("    flag = True"));
        assert!(program.contains("    cfg = {\"a\": 1, \"b\": [None, False]}"));
        assert!(program.contains("    x = 2"));
        assert!(program.contains("__outcome__['result'] = x * 3"));
    }

    #[test]
    fn test_build_program_without_statements() {
        let program = build_program("# only a comment", &[]).unwrap();
        assert!(program.contains("__outcome__['result'] = None"));
    }

    #[test]
    fn test_string_literals_are_escaped() {
        assert_eq!(literal(&json!(r#"say """hi" \ "#)), r#""say \"\"\"hi\" \\ ""#);
        assert_eq!(literal(&json!("ends with \"")), r#""ends with \"""#);
        assert_eq!(literal(&json!("two\nlines")), r#""two\nlines""#);
    }

    #[test]
    fn test_parameter_names_must_be_identifiers() {
        let one = json!(1);
        let err = build_program("result = 1", &[("bad name", &one)]).unwrap_err();
        assert_eq!(
            err,
            ExecError::Runtime("parameter 'bad name' is not a valid identifier".into())
        );
    }

    #[tokio::test]
    async fn test_unavailable_runtime() {
        let executor = RuntimeExecutor::new(None, Duration::from_millis(100));
        let calc = Calculation::alt_runtime("r", "result = 1");
        let err = run(&executor, &calc, ParamSet::new()).await.unwrap_err();
        assert_eq!(err, ExecError::RuntimeUnavailable);
    }

    #[tokio::test]
    async fn test_result_is_decoded_and_cleaned_up() {
        let runtime = FakeRuntime::new(Some(Ok(json!("{\"area\": 12}"))));
        let executor = RuntimeExecutor::new(Some(runtime.clone()), Duration::from_secs(1));
        let calc = Calculation::alt_runtime("r", "result = {'area': 12}");
        let result = run(&executor, &calc, ParamSet::new()).await.unwrap();
        assert_eq!(result, json!({"area": 12}));

        let calls = runtime.calls.lock().clone();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].starts_with("inject rt_exec_"));
        assert!(calls[2].starts_with("cleanup rt_exec_"));
    }

    #[tokio::test]
    async fn test_runtime_error_is_reported() {
        let runtime = FakeRuntime::new(Some(Err("name 'y' is not defined".into())));
        let executor = RuntimeExecutor::new(Some(runtime.clone()), Duration::from_secs(1));
        let calc = Calculation::alt_runtime("r", "result = y");
        let err = run(&executor, &calc, ParamSet::new()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Runtime calculation error: name 'y' is not defined"
        );
        assert!(runtime.calls.lock().last().unwrap().starts_with("cleanup"));
    }

    #[tokio::test]
    async fn test_timeout_still_cleans_up() {
        let runtime = FakeRuntime::new(None);
        let executor = RuntimeExecutor::new(Some(runtime.clone()), Duration::from_millis(50));
        let calc = Calculation::alt_runtime("r", "while True: pass");
        let err = run(&executor, &calc, ParamSet::new()).await.unwrap_err();
        assert_eq!(err, ExecError::RuntimeTimeout(50));
        assert!(runtime.calls.lock().last().unwrap().starts_with("cleanup"));
    }

    /// Blocks inside `execute` before reporting.
    struct SlowRuntime {
        cleaned: Mutex<bool>,
    }

    #[async_trait]
    impl AlternateRuntime for SlowRuntime {
        fn name(&self) -> &str {
            "python"
        }

        async fn inject(&self, _exec_id: &str, _program: &str) -> std::result::Result<(), String> {
            Ok(())
        }

        async fn execute(&self, _exec_id: &str, completion: Completion) {
            tokio::time::sleep(Duration::from_secs(5)).await;
            completion.succeed(json!(1));
        }

        async fn cleanup(&self, _exec_id: &str) {
            *self.cleaned.lock() = true;
        }
    }

    #[tokio::test]
    async fn test_timeout_covers_a_blocking_execute() {
        let runtime = Arc::new(SlowRuntime {
            cleaned: Mutex::new(false),
        });
        let executor = RuntimeExecutor::new(Some(runtime.clone()), Duration::from_millis(100));
        let calc = Calculation::alt_runtime("r", "result = 1");

        let started = std::time::Instant::now();
        let err = run(&executor, &calc, ParamSet::new()).await.unwrap_err();
        assert_eq!(err, ExecError::RuntimeTimeout(100));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(*runtime.cleaned.lock());
    }
}
