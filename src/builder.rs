use crate::error::RecfigError;
use crate::function::FunctionRegistry;
use crate::value::FunctionRef;

/// The conversion engine.
///
/// Holds the function registry that coercion consults for
/// [`FieldType::FunctionRef`](crate::FieldType::FunctionRef) fields. Every
/// conversion is a method on this type:
///
/// - [`coerce`](Self::coerce): one value against one declared type.
/// - [`from_mapping`](Self::from_mapping) / [`to_mapping`](Self::to_mapping):
///   records and generic mappings.
/// - [`from_json`](Self::from_json), [`read_json`](Self::read_json),
///   [`to_json`](Self::to_json), [`write_json`](Self::write_json): persistence.
/// - [`reconstruct`](Self::reconstruct): records from parsed command lines.
///
/// A `Recfig` without registered functions is fully usable; only function
/// names in config values will fail to resolve.
#[derive(Debug, Clone, Default)]
pub struct Recfig {
    functions: FunctionRegistry,
}

impl Recfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(functions: FunctionRegistry) -> Self {
        Self { functions }
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Resolve a `module.name` reference through the registry.
    pub fn load_function(&self, reference: &str) -> Result<FunctionRef, RecfigError> {
        self.functions.load_function(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn new_has_no_functions() {
        let recfig = Recfig::new();
        assert!(matches!(
            recfig.load_function("a.b"),
            Err(RecfigError::ReferenceNotFound { .. })
        ));
    }

    #[test]
    fn with_functions_resolves() {
        let recfig = Recfig::with_functions(
            FunctionRegistry::new().register("sched", "constant", |_| Value::Float(1.0)),
        );
        let f = recfig.load_function("sched.constant").unwrap();
        assert_eq!(f.call(&[]), Value::Float(1.0));
    }
}
