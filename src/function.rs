//! Function references: resolve `module.name` strings to callables.
//!
//! The host program registers its functions up front, grouped by module
//! path. Config values then name them (`"schedules.cosine_warmup"`) and
//! coercion swaps the name for a [`FunctionRef`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RecfigError;
use crate::value::{Callable, FunctionRef, Value};

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    modules: HashMap<String, HashMap<String, Callable>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` as `module.name`. Re-registering replaces the entry.
    pub fn register<F>(mut self, module: &str, name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.modules
            .entry(module.to_string())
            .or_default()
            .insert(name.to_string(), Arc::new(func));
        self
    }

    /// Resolve `module.path.name` to a callable.
    ///
    /// The reference is split at its last `.`; both sides must be non-empty.
    pub fn load_function(&self, reference: &str) -> Result<FunctionRef, RecfigError> {
        let (module, name) = reference
            .rsplit_once('.')
            .filter(|(m, n)| !m.is_empty() && !n.is_empty())
            .ok_or_else(|| RecfigError::MalformedReference(reference.to_string()))?;

        let functions = self
            .modules
            .get(module)
            .ok_or_else(|| RecfigError::ReferenceNotFound {
                reference: reference.to_string(),
                reason: format!("no module named '{module}'"),
            })?;
        let func = functions
            .get(name)
            .ok_or_else(|| RecfigError::ReferenceNotFound {
                reference: reference.to_string(),
                reason: format!("module '{module}' has no function '{name}'"),
            })?;

        tracing::trace!(reference, "resolved function reference");
        Ok(FunctionRef::new(reference.to_string(), Arc::clone(func)))
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self
            .modules
            .iter()
            .flat_map(|(m, fns)| fns.keys().map(move |n| format!("{m}.{n}")))
            .collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}
