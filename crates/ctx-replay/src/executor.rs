//! Tool executors: the pluggable actions replay dispatches each step to.

use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Something that can carry out one recorded step's tool call and return
/// its textual output.
pub trait ToolExecutor: Send + Sync {
    /// Run the tool against the step's recorded parameters.
    fn execute(&self, parameters: &BTreeMap<String, Value>) -> Result<String, String>;
}

/// Reads a literal `path` parameter from the local filesystem.
pub struct ReadFileExecutor;

impl ToolExecutor for ReadFileExecutor {
    fn execute(&self, parameters: &BTreeMap<String, Value>) -> Result<String, String> {
        let path = parameters
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| "missing 'path' parameter".to_string())?;
        std::fs::read_to_string(path).map_err(|e| e.to_string())
    }
}

/// A name → executor registry. `read_file` is pre-registered.
pub struct ExecutorRegistry {
    executors: HashMap<String, Box<dyn ToolExecutor>>,
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        let mut registry = Self { executors: HashMap::new() };
        registry.register("read_file", ReadFileExecutor);
        registry
    }
}

impl ExecutorRegistry {
    /// An empty registry with no built-ins.
    #[must_use]
    pub fn empty() -> Self {
        Self { executors: HashMap::new() }
    }

    /// Register an executor under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, executor: impl ToolExecutor + 'static) {
        self.executors.insert(name.into(), Box::new(executor));
    }

    /// Look up an executor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn ToolExecutor> {
        self.executors.get(name).map(|e| e.as_ref())
    }
}
