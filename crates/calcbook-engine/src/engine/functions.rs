//! Registry of user-defined helper functions.
//!
//! A definition `{name, params, code}` becomes the Rhai item
//! `fn name(params) { code }`. Executions work against a [`FunctionLibrary`]
//! snapshot: every registered definition compiled into one AST, so helpers can
//! call each other and calculation bodies can call any of them. The registry
//! keeps the last snapshot until a registration changes.

use dashmap::DashMap;
use parking_lot::Mutex;
use regex::Regex;
use rhai::{AST, Dynamic, Engine, Scope};
use std::fmt;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

use super::calculation::FunctionDef;
use super::eval::{create_engine, from_dynamic, to_dynamic};
use super::value::ParamSet;
use crate::error::{ExecError, Result};

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex must compile")
    })
}

/// Name of the function a custom script body is compiled into.
pub const CALCULATION_BODY_FN: &str = "calculation_body";

/// Whether `name` can be bound as a Rhai variable or function name.
pub fn is_identifier(name: &str) -> bool {
    identifier_re().is_match(name)
}

/// Render a definition as a Rhai function item.
pub fn function_source(name: &str, params: &[String], code: &str) -> String {
    format!("fn {}({}) {{\n{}\n}}\n", name, params.join(", "), code)
}

/// A definition that compiled successfully.
#[derive(Clone, Debug)]
pub struct RegisteredFunction {
    def: FunctionDef,
    source: String,
}

impl RegisteredFunction {
    /// Validate and compile a definition.
    pub fn compile(def: &FunctionDef) -> Result<RegisteredFunction> {
        if !is_identifier(&def.name) {
            return Err(ExecError::Function(format!(
                "invalid function name '{}'",
                def.name
            )));
        }
        if def.name == CALCULATION_BODY_FN {
            return Err(ExecError::Function(format!(
                "function name '{}' is reserved",
                def.name
            )));
        }
        if let Some(bad) = def.params.iter().find(|p| !is_identifier(p)) {
            return Err(ExecError::Function(format!(
                "invalid parameter '{}' in function {}",
                bad, def.name
            )));
        }

        let source = function_source(&def.name, &def.params, &def.code);
        create_engine()
            .compile(&source)
            .map_err(|e| ExecError::Function(format!("Error in function {}: {}", def.name, e)))?;

        Ok(RegisteredFunction {
            def: def.clone(),
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn params(&self) -> &[String] {
        &self.def.params
    }

    pub fn definition(&self) -> &FunctionDef {
        &self.def
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Process-wide function bindings. Clones share the same map.
///
/// The last registration for a name wins; entries leave only through
/// [`FunctionRegistry::unregister`].
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    functions: Arc<DashMap<String, Arc<RegisteredFunction>>>,
    // Held while the map changes so a rebuild never caches a stale snapshot.
    library: Arc<Mutex<Option<FunctionLibrary>>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, def: &FunctionDef) -> Result<()> {
        let function = RegisteredFunction::compile(def)?;
        tracing::debug!(
            "Registered function: {}({})",
            function.name(),
            function.params().join(", ")
        );
        let mut library = self.library.lock();
        self.functions
            .insert(function.name().to_string(), Arc::new(function));
        *library = None;
        Ok(())
    }

    /// Remove a binding. Returns whether one existed.
    pub fn unregister(&self, name: &str) -> bool {
        let mut library = self.library.lock();
        let removed = self.functions.remove(name).is_some();
        if removed {
            *library = None;
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredFunction>> {
        self.functions.get(name).map(|f| f.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshot the current bindings for one execution. The compiled
    /// library is reused until the next register or unregister.
    pub fn library(&self) -> Result<FunctionLibrary> {
        let mut cached = self.library.lock();
        if let Some(library) = cached.as_ref() {
            return Ok(library.clone());
        }
        let functions = self.functions.iter().map(|e| e.value().clone()).collect();
        let library = FunctionLibrary::new(functions)?;
        *cached = Some(library.clone());
        Ok(library)
    }
}

/// Compile and invoke a definition once without registering it.
///
/// Arguments are taken from `args` by parameter name; missing ones are `()`.
pub fn test_function(def: &FunctionDef, args: &ParamSet) -> Result<Value> {
    let function = RegisteredFunction::compile(def)?;
    let library = FunctionLibrary::new(vec![Arc::new(function)])?;
    let values = def
        .params
        .iter()
        .map(|p| args.get(p).cloned().unwrap_or(Value::Null))
        .collect();
    library.call(&def.name, values)
}

/// Immutable set of helper functions compiled together.
#[derive(Clone)]
pub struct FunctionLibrary {
    functions: Vec<Arc<RegisteredFunction>>,
    ast: Arc<AST>,
    engine: Arc<Engine>,
}

impl fmt::Debug for FunctionLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionLibrary")
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

impl FunctionLibrary {
    pub fn new(mut functions: Vec<Arc<RegisteredFunction>>) -> Result<FunctionLibrary> {
        functions.sort_by(|a, b| a.name().cmp(b.name()));
        let source: String = functions.iter().map(|f| f.source()).collect();
        let engine = create_engine();
        let ast = engine
            .compile(&source)
            .map_err(|e| ExecError::Function(format!("Error in registered functions: {}", e)))?;
        Ok(FunctionLibrary {
            functions,
            ast: Arc::new(ast),
            engine: Arc::new(engine),
        })
    }

    pub fn empty() -> FunctionLibrary {
        FunctionLibrary {
            functions: vec![],
            ast: Arc::new(AST::empty()),
            engine: Arc::new(create_engine()),
        }
    }

    pub fn functions(&self) -> &[Arc<RegisteredFunction>] {
        &self.functions
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RegisteredFunction>> {
        self.functions.iter().find(|f| f.name() == name)
    }

    /// Concatenated Rhai source of every function in the library.
    pub fn source(&self) -> String {
        self.functions.iter().map(|f| f.source()).collect()
    }

    pub fn ast(&self) -> &AST {
        &self.ast
    }

    /// Call a function by name. Missing trailing arguments are passed as `()`
    /// and surplus ones are dropped.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let function = self
            .get(name)
            .ok_or_else(|| ExecError::Function(format!("unknown function '{}'", name)))?;

        let mut dyn_args = args
            .iter()
            .map(to_dynamic)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(ExecError::Function)?;
        dyn_args.resize(function.params().len(), Dynamic::UNIT);

        let result = self
            .engine
            .call_fn::<Dynamic>(&mut Scope::new(), &self.ast, name, dyn_args)
            .map_err(|e| ExecError::Function(format!("{}: {}", name, e)))?;
        from_dynamic(&result).map_err(ExecError::Function)
    }
}
