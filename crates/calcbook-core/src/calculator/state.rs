use calcbook_engine::builtins::core_function_defs;
use calcbook_engine::engine::{
    AlternateRuntime, CalculationCache, Dispatcher, EvalexprEvaluator, ExecutionLog,
    ExpressionEvaluator, FunctionDef, FunctionRegistry, ParamSet, Settings, test_function,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;

use crate::config::{EngineConfig, ExecuteOptions};
use crate::error::{CalcError, Result};
use crate::store::{
    CalculationStore, FunctionStore, GENERAL_SETTINGS, HistoryStore, MemoryStore, SettingsStore,
};

/// Engine instance: stores plus the session-wide registry and cache.
pub struct Calculator {
    pub(crate) calculations: Arc<dyn CalculationStore>,
    pub(crate) function_store: Option<Arc<dyn FunctionStore>>,
    pub(crate) settings_store: Option<Arc<dyn SettingsStore>>,
    pub(crate) history: Option<Arc<dyn HistoryStore>>,
    pub(crate) config: EngineConfig,
    pub(crate) registry: FunctionRegistry,
    pub(crate) cache: CalculationCache,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) settings: RwLock<Settings>,
    /// Log of the most recent top-level call.
    pub(crate) last_log: Mutex<ExecutionLog>,
}

pub struct CalculatorBuilder {
    calculations: Arc<dyn CalculationStore>,
    function_store: Option<Arc<dyn FunctionStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    history: Option<Arc<dyn HistoryStore>>,
    config: EngineConfig,
    evaluator: Arc<dyn ExpressionEvaluator>,
    runtime: Option<Arc<dyn AlternateRuntime>>,
}

impl CalculatorBuilder {
    pub fn functions(mut self, store: Arc<dyn FunctionStore>) -> Self {
        self.function_store = Some(store);
        self
    }

    pub fn settings(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn history(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the equation evaluator used by standard calculations.
    pub fn evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Attach an alternate-language runtime.
    pub fn runtime(mut self, runtime: Arc<dyn AlternateRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Calculator {
        let dispatcher = Dispatcher::new(self.evaluator, self.runtime, self.config.runtime_timeout());
        Calculator {
            calculations: self.calculations,
            function_store: self.function_store,
            settings_store: self.settings_store,
            history: self.history,
            config: self.config,
            registry: FunctionRegistry::new(),
            cache: CalculationCache::new(),
            dispatcher,
            settings: RwLock::new(Settings::default()),
            last_log: Mutex::new(ExecutionLog::new()),
        }
    }
}

impl Calculator {
    pub fn builder(calculations: Arc<dyn CalculationStore>) -> CalculatorBuilder {
        CalculatorBuilder {
            calculations,
            function_store: None,
            settings_store: None,
            history: None,
            config: EngineConfig::default(),
            evaluator: Arc::new(EvalexprEvaluator),
            runtime: None,
        }
    }

    /// A calculator whose every collaborator is `store`.
    pub fn with_memory_store(store: MemoryStore, config: EngineConfig) -> Calculator {
        let store = Arc::new(store);
        Calculator::builder(store.clone())
            .functions(store.clone())
            .settings(store.clone())
            .history(store)
            .config(config)
            .build()
    }

    /// Load formatting settings and register helper functions: the core
    /// library first, then the store's global functions, so store
    /// definitions win on a name clash.
    ///
    /// Returns how many functions were registered.
    pub async fn init(&self) -> Result<usize> {
        if let Some(store) = &self.settings_store {
            if let Some(value) = store.get(GENERAL_SETTINGS).await? {
                let settings: Settings = serde_json::from_value(value)
                    .map_err(|e| CalcError::parse(format!("{}: {}", GENERAL_SETTINGS, e)))?;
                *self.settings.write() = settings;
            }
        }

        let mut defs = Vec::new();
        if self.config.core_functions {
            defs.extend(core_function_defs());
        }
        if let Some(store) = &self.function_store {
            defs.extend(store.get_all(true).await?);
        }

        let registered = defs.iter().filter(|def| self.register_function(def)).count();
        tracing::info!(
            "Calculator initialised with {} functions ({} rejected)",
            registered,
            defs.len() - registered
        );
        Ok(registered)
    }

    /// Register a helper function. A definition that fails to compile is
    /// logged and rejected.
    pub fn register_function(&self, def: &FunctionDef) -> bool {
        match self.registry.register(def) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Error registering function {}: {}", def.name, e);
                false
            }
        }
    }

    /// Compile and call `def` once with arguments taken by parameter name,
    /// without registering it.
    pub fn test_function(&self, def: &FunctionDef, args: &ParamSet) -> Result<Value> {
        Ok(test_function(def, args)?)
    }

    pub fn unregister_function(&self, name: &str) -> bool {
        self.registry.unregister(name)
    }

    pub fn function_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Options for a call, taken from the engine config.
    pub fn default_options(&self) -> ExecuteOptions {
        self.config.execute_options()
    }

    pub fn has_runtime(&self) -> bool {
        self.dispatcher.has_runtime()
    }
}
