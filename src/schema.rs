//! Record schemas: the static description every conversion walks.
//!
//! A [`RecordSchema`] is built once, checked, and then shared as
//! `Arc<RecordSchema>`. Nothing in the crate inspects record types any other
//! way.
//!
//! ```ignore
//! let model = RecordSchema::builder("ModelConfig")
//!     .field(FieldSpec::new("n_layers", FieldType::int()).default(10))
//!     .build()?;
//! let train = RecordSchema::builder("TrainArgs")
//!     .field(FieldSpec::new("model_config", FieldType::record(&model)))
//!     .field(FieldSpec::new("lr", FieldType::float()).default(0.01).env("TRAIN_LR"))
//!     .build()?;
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::compat::is_compatible;
use crate::error::RecfigError;
use crate::types::FieldType;
use crate::value::Value;

/// Produces a fresh default value each time it is called.
pub type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// How a field gets a value when none is supplied.
#[derive(Clone, Default)]
pub enum DefaultValue {
    /// No default: the field must be supplied (unless it is `Optional`).
    #[default]
    Required,
    Fixed(Value),
    Factory(DefaultFactory),
}

impl DefaultValue {
    pub fn is_required(&self) -> bool {
        matches!(self, DefaultValue::Required)
    }

    /// Produce the default value, calling the factory if there is one.
    pub fn produce(&self) -> Option<Value> {
        match self {
            DefaultValue::Required => None,
            DefaultValue::Fixed(value) => Some(value.clone()),
            DefaultValue::Factory(factory) => Some(factory()),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Required => f.write_str("Required"),
            DefaultValue::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// CLI-facing metadata of a field.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub help: Option<String>,
    /// Short aliases in declaration order, without leading dashes.
    pub short: Vec<String>,
    /// Environment variable supplying the flag default.
    pub env: Option<String>,
    /// Also accept the value as a positional argument.
    pub positional: bool,
    /// Register the `--path` flag. On by default.
    pub flag: bool,
}

impl Default for FieldMeta {
    fn default() -> Self {
        Self {
            help: None,
            short: Vec::new(),
            env: None,
            positional: false,
            flag: true,
        }
    }
}

/// One named, typed field of a record.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    declared_type: FieldType,
    default: DefaultValue,
    meta: FieldMeta,
}

impl FieldSpec {
    pub fn new(name: &str, declared_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            declared_type,
            default: DefaultValue::Required,
            meta: FieldMeta::default(),
        }
    }

    /// Fixed default value. Checked against the declared type at schema build.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Fixed(value.into());
        self
    }

    /// Default computed on each use, for values that must not be shared.
    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = DefaultValue::Factory(Arc::new(factory));
        self
    }

    pub fn help(mut self, help: &str) -> Self {
        self.meta.help = Some(help.to_string());
        self
    }

    /// Add a short alias. Leading dashes are stripped.
    pub fn short(mut self, alias: &str) -> Self {
        self.meta.short.push(alias.trim_start_matches('-').to_string());
        self
    }

    pub fn env(mut self, var: &str) -> Self {
        self.meta.env = Some(var.to_string());
        self
    }

    pub fn positional(mut self) -> Self {
        self.meta.positional = true;
        self
    }

    /// Do not register the `--path` flag (useful together with `positional`).
    pub fn no_flag(mut self) -> Self {
        self.meta.flag = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &FieldType {
        &self.declared_type
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default
    }

    pub fn has_default(&self) -> bool {
        !self.default.is_required()
    }

    pub fn meta(&self) -> &FieldMeta {
        &self.meta
    }
}

/// Ordered, immutable list of fields identified by a record-type name.
#[derive(Debug)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn builder(name: &str) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

pub struct RecordSchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
}

impl RecordSchemaBuilder {
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Check field names and fixed defaults, then freeze the schema.
    pub fn build(self) -> Result<Arc<RecordSchema>, RecfigError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(RecfigError::DuplicateField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if let DefaultValue::Fixed(value) = &field.default {
                let path = format!("{}.{}", self.name, field.name);
                let concrete = value.concrete_type();
                if is_compatible(&field.declared_type, &concrete, &path)?.is_none() {
                    return Err(RecfigError::TypeMismatch {
                        path,
                        declared: field.declared_type.to_string(),
                        concrete: concrete.to_string(),
                    });
                }
            }
        }
        tracing::debug!(schema = %self.name, fields = self.fields.len(), "built record schema");
        Ok(Arc::new(RecordSchema {
            name: self.name,
            fields: self.fields,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{model_config_schema, train_args_schema};

    #[test]
    fn fields_keep_declaration_order() {
        let schema = train_args_schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "model_config",
                "lr",
                "name",
                "lr_step_fn",
                "num_workers",
                "cont",
                "tags"
            ]
        );
    }

    #[test]
    fn duplicate_field_rejected() {
        let result = RecordSchema::builder("Dup")
            .field(FieldSpec::new("x", FieldType::int()))
            .field(FieldSpec::new("x", FieldType::float()))
            .build();
        match result {
            Err(RecfigError::DuplicateField { schema, field }) => {
                assert_eq!(schema, "Dup");
                assert_eq!(field, "x");
            }
            other => panic!("Expected DuplicateField, got {other:?}"),
        }
    }

    #[test]
    fn incompatible_default_rejected() {
        let result = RecordSchema::builder("Bad")
            .field(FieldSpec::new("n", FieldType::int()).default("ten"))
            .build();
        assert!(matches!(result, Err(RecfigError::TypeMismatch { .. })));
    }

    #[test]
    fn numeric_default_widens() {
        let schema = RecordSchema::builder("Widen")
            .field(FieldSpec::new("y", FieldType::float()).default(10))
            .build()
            .unwrap();
        assert!(schema.field("y").unwrap().has_default());
    }

    #[test]
    fn factory_default_produces_fresh_value() {
        let spec = FieldSpec::new("zs", FieldType::sequence(FieldType::float()))
            .default_with(|| Value::Sequence(Vec::new()));
        assert_eq!(spec.default_value().produce(), Some(Value::Sequence(vec![])));
        assert!(spec.has_default());
    }

    #[test]
    fn short_alias_strips_dashes() {
        let spec = FieldSpec::new("checkpoint_path", FieldType::string())
            .short("-chkpt")
            .short("c");
        assert_eq!(spec.meta().short, vec!["chkpt", "c"]);
    }

    #[test]
    fn meta_defaults_expose_flag() {
        let schema = model_config_schema();
        let field = schema.field("n_layers").unwrap();
        assert!(field.meta().flag);
        assert!(!field.meta().positional);
        assert_eq!(
            field.meta().help.as_deref(),
            Some("number of layers for the model")
        );
    }
}
