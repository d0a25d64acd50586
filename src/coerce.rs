//! Type-directed coercion of loosely typed values into schema-conformant ones.
//!
//! Coercion first asks the compatibility resolver whether the declared type
//! accepts the value's runtime type, then rebuilds the value in the declared
//! shape, recursing through records, mappings and sequences.
//!
//! Strings supplied for record-typed fields are *shorthand*: either inline
//! JSON (starting with `{`) or the path of a `.json` file. Any other string is
//! rejected; it is never evaluated.

use std::path::Path;
use std::sync::Arc;

use crate::builder::Recfig;
use crate::compat::is_compatible;
use crate::error::RecfigError;
use crate::persist;
use crate::schema::RecordSchema;
use crate::types::{ConcreteType, FieldType, PrimitiveKind};
use crate::value::{Mapping, Value};

impl Recfig {
    /// Convert `value` into `declared`. `path` names the field in errors.
    pub fn coerce(
        &self,
        value: Value,
        declared: &FieldType,
        path: &str,
    ) -> Result<Value, RecfigError> {
        let concrete = value.concrete_type();
        let resolved = is_compatible(declared, &concrete, path)?
            .ok_or_else(|| type_mismatch(declared, &concrete, path))?;
        tracing::trace!(path, %declared, %concrete, "coercing value");

        match declared {
            FieldType::Any => Ok(value),
            FieldType::Primitive(kind) => normalize_primitive(*kind, value, path),
            FieldType::Optional(inner) => match value {
                Value::None => Ok(Value::None),
                other => self.coerce(other, inner, path),
            },
            FieldType::Union(_) => self.coerce(value, resolved, path),
            FieldType::Record(schema) => self.coerce_record(value, schema, path),
            FieldType::Mapping {
                key,
                value: value_type,
            } => match value {
                Value::Mapping(map) => {
                    let mut out = Mapping::with_capacity(map.len());
                    for (k, v) in map {
                        let item_path = format!("{path}.{k}");
                        check_key(*key, &k, &item_path)?;
                        let v = self.coerce(v, value_type, &item_path)?;
                        out.insert(k, v);
                    }
                    Ok(Value::Mapping(out))
                }
                other => Err(unsupported(declared, &other, path)),
            },
            FieldType::Sequence(elem) => match value {
                Value::Sequence(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| self.coerce(item, elem, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Sequence),
                other => Err(unsupported(declared, &other, path)),
            },
            FieldType::FunctionRef => match value {
                Value::Str(reference) => {
                    Ok(Value::Function(self.load_function(&reference)?))
                }
                f @ Value::Function(_) => Ok(f),
                other => Err(unsupported(declared, &other, path)),
            },
        }
    }

    fn coerce_record(
        &self,
        value: Value,
        schema: &Arc<RecordSchema>,
        path: &str,
    ) -> Result<Value, RecfigError> {
        match value {
            Value::Record(record) if record.type_name() == schema.name() => {
                Ok(Value::Record(record))
            }
            Value::Str(text) => match Value::from_json(load_shorthand(&text, path)?) {
                Value::Mapping(map) => Ok(Value::Record(self.from_mapping_at(schema, map, path)?)),
                other => Err(RecfigError::TypeMismatch {
                    path: path.to_string(),
                    declared: schema.name().to_string(),
                    concrete: other.concrete_type().to_string(),
                }),
            },
            Value::Mapping(map) => Ok(Value::Record(self.from_mapping_at(schema, map, path)?)),
            other => Err(unsupported(&FieldType::Record(Arc::clone(schema)), &other, path)),
        }
    }
}

/// Parse shorthand text: inline JSON starting with `{`, or a `.json` file.
pub(crate) fn load_shorthand(text: &str, path: &str) -> Result<serde_json::Value, RecfigError> {
    if text.trim_start().starts_with('{') {
        return serde_json::from_str(text).map_err(|e| RecfigError::InvalidJson {
            origin: format!("the value of '{path}'"),
            source: e,
        });
    }
    if text.ends_with(".json") {
        return persist::read_json_value(Path::new(text));
    }
    Err(RecfigError::InvalidShorthand {
        path: path.to_string(),
        text: text.to_string(),
    })
}

/// Convert a numeric, boolean or string value to the declared primitive kind.
///
/// Numbers and booleans convert into each other; a float only becomes an
/// integer when it has no fractional part.
pub(crate) fn normalize_primitive(
    kind: PrimitiveKind,
    value: Value,
    path: &str,
) -> Result<Value, RecfigError> {
    match (kind, value) {
        (PrimitiveKind::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
        (PrimitiveKind::Bool, Value::Int(i)) => Ok(Value::Bool(i != 0)),
        (PrimitiveKind::Bool, Value::Float(f)) => Ok(Value::Bool(f != 0.0)),
        (PrimitiveKind::Int, Value::Int(i)) => Ok(Value::Int(i)),
        (PrimitiveKind::Int, Value::Bool(b)) => Ok(Value::Int(i64::from(b))),
        (PrimitiveKind::Int, Value::Float(f)) => {
            if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(Value::Int(f as i64))
            } else {
                Err(RecfigError::InvalidValue {
                    path: path.to_string(),
                    reason: format!("{f} is not an integer"),
                })
            }
        }
        (PrimitiveKind::Float, Value::Float(f)) => Ok(Value::Float(f)),
        (PrimitiveKind::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (PrimitiveKind::Float, Value::Bool(b)) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
        (PrimitiveKind::Str, Value::Str(s)) => Ok(Value::Str(s)),
        (kind, other) => Err(type_mismatch(&kind, &other.concrete_type(), path)),
    }
}

fn check_key(kind: PrimitiveKind, key: &str, path: &str) -> Result<(), RecfigError> {
    let ok = match kind {
        PrimitiveKind::Str => true,
        PrimitiveKind::Int => key.parse::<i64>().is_ok(),
        PrimitiveKind::Float => key.parse::<f64>().is_ok(),
        PrimitiveKind::Bool => key == "true" || key == "false",
    };
    if ok {
        Ok(())
    } else {
        Err(RecfigError::InvalidValue {
            path: path.to_string(),
            reason: format!("key '{key}' is not a valid {kind}"),
        })
    }
}

pub(crate) fn type_mismatch(
    declared: &impl std::fmt::Display,
    concrete: &ConcreteType,
    path: &str,
) -> RecfigError {
    RecfigError::TypeMismatch {
        path: path.to_string(),
        declared: declared.to_string(),
        concrete: concrete.to_string(),
    }
}

pub(crate) fn unsupported(declared: &FieldType, value: &Value, path: &str) -> RecfigError {
    RecfigError::UnsupportedConversion {
        path: path.to_string(),
        declared: declared.to_string(),
        concrete: value.concrete_type().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{bar_schema, foo_schema, nested_schema, test_functions};
    use std::fs;
    use tempfile::TempDir;

    fn recfig() -> Recfig {
        Recfig::with_functions(test_functions())
    }

    #[test]
    fn primitive_passthrough() {
        let v = recfig().coerce(Value::Int(3), &FieldType::int(), "x").unwrap();
        assert_eq!(v, Value::Int(3));
    }

    #[test]
    fn int_widens_to_float() {
        let v = recfig().coerce(Value::Int(10), &FieldType::float(), "y").unwrap();
        assert_eq!(v, Value::Float(10.0));
    }

    #[test]
    fn fractional_float_to_int_fails() {
        let err = recfig()
            .coerce(Value::Float(2.5), &FieldType::int(), "n")
            .unwrap_err();
        assert!(matches!(err, RecfigError::InvalidValue { path, .. } if path == "n"));
    }

    #[test]
    fn incompatible_is_type_mismatch() {
        let err = recfig()
            .coerce(Value::from("3"), &FieldType::int(), "x")
            .unwrap_err();
        match err {
            RecfigError::TypeMismatch {
                path,
                declared,
                concrete,
            } => {
                assert_eq!(path, "x");
                assert_eq!(declared, "int");
                assert_eq!(concrete, "str");
            }
            other => panic!("Expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn optional_keeps_none() {
        let t = FieldType::optional(FieldType::int());
        assert_eq!(recfig().coerce(Value::None, &t, "x").unwrap(), Value::None);
        assert_eq!(recfig().coerce(Value::Int(1), &t, "x").unwrap(), Value::Int(1));
    }

    #[test]
    fn union_coerces_through_resolved_member() {
        let t = FieldType::union([FieldType::float(), FieldType::string()]);
        assert_eq!(
            recfig().coerce(Value::Int(2), &t, "u").unwrap(),
            Value::Float(2.0)
        );
        assert_eq!(
            recfig().coerce(Value::from("a"), &t, "u").unwrap(),
            Value::from("a")
        );
    }

    #[test]
    fn ambiguous_union_fails() {
        let t = FieldType::union([FieldType::int(), FieldType::float()]);
        let err = recfig().coerce(Value::Int(1), &t, "u").unwrap_err();
        assert!(matches!(err, RecfigError::AmbiguousUnion { .. }));
    }

    #[test]
    fn record_from_inline_json() {
        let schema = foo_schema();
        let v = recfig()
            .coerce(
                Value::from(r#"{"a": 1, "b": 5}"#),
                &FieldType::record(&schema),
                "foo",
            )
            .unwrap();
        let record = v.as_record().unwrap();
        assert_eq!(record.get("a"), Some(&Value::Int(1)));
        assert_eq!(record.get("b"), Some(&Value::Int(5)));
    }

    #[test]
    fn record_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.json");
        fs::write(&path, r#"{"a": 7, "b": 8}"#).unwrap();

        let v = recfig()
            .coerce(
                Value::from(path.to_str().unwrap()),
                &FieldType::record(&foo_schema()),
                "foo",
            )
            .unwrap();
        assert_eq!(v.as_record().unwrap().get("a"), Some(&Value::Int(7)));
    }

    #[test]
    fn record_from_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        let err = recfig()
            .coerce(
                Value::from(path.to_str().unwrap()),
                &FieldType::record(&foo_schema()),
                "foo",
            )
            .unwrap_err();
        assert!(matches!(err, RecfigError::FileNotFound(p) if p == path));
    }

    #[test]
    fn record_from_other_string_is_not_evaluated() {
        let err = recfig()
            .coerce(
                Value::from("Foo(a=1, b=2)"),
                &FieldType::record(&foo_schema()),
                "foo",
            )
            .unwrap_err();
        assert!(matches!(err, RecfigError::InvalidShorthand { .. }));
    }

    #[test]
    fn record_from_broken_json_fails() {
        let err = recfig()
            .coerce(Value::from("{\"a\": 1"), &FieldType::record(&foo_schema()), "foo")
            .unwrap_err();
        assert!(matches!(err, RecfigError::InvalidJson { .. }));
    }

    #[test]
    fn record_identity() {
        let schema = foo_schema();
        let built = recfig()
            .coerce(Value::from(r#"{"a": 1, "b": 2}"#), &FieldType::record(&schema), "foo")
            .unwrap();
        let again = recfig()
            .coerce(built.clone(), &FieldType::record(&schema), "foo")
            .unwrap();
        assert_eq!(built, again);
    }

    #[test]
    fn nested_record_from_mapping() {
        let schema = nested_schema();
        let json = serde_json::json!({"nest": {"lr": 0.5}, "x": 2});
        let Value::Mapping(map) = Value::from_json(json) else {
            panic!("expected mapping");
        };
        let v = recfig()
            .coerce(Value::Mapping(map), &FieldType::record(&schema), "args")
            .unwrap();
        let record = v.as_record().unwrap();
        assert_eq!(record.get_path("nest.lr"), Some(&Value::Float(0.5)));
        assert_eq!(record.get_path("nest.name"), Some(&Value::from("test")));
    }

    #[test]
    fn sequence_elements_coerced() {
        let t = FieldType::sequence(FieldType::float());
        let v = recfig()
            .coerce(Value::from(vec![1, 2]), &t, "zs")
            .unwrap();
        assert_eq!(v, Value::from(vec![1.0, 2.0]));
    }

    #[test]
    fn sequence_error_names_index() {
        let t = FieldType::sequence(FieldType::int());
        let err = recfig()
            .coerce(Value::Sequence(vec![Value::Int(1), Value::from("x")]), &t, "zs")
            .unwrap_err();
        assert!(matches!(err, RecfigError::TypeMismatch { path, .. } if path == "zs[1]"));
    }

    #[test]
    fn mapping_keys_checked() {
        let t = FieldType::mapping(PrimitiveKind::Int, FieldType::int());
        let mut good = Mapping::new();
        good.insert("1".into(), Value::Int(2));
        assert!(recfig().coerce(Value::Mapping(good), &t, "z").is_ok());

        let mut bad = Mapping::new();
        bad.insert("one".into(), Value::Int(2));
        let err = recfig().coerce(Value::Mapping(bad), &t, "z").unwrap_err();
        assert!(matches!(err, RecfigError::InvalidValue { path, .. } if path == "z.one"));
    }

    #[test]
    fn mapping_of_records() {
        let t = FieldType::mapping(PrimitiveKind::Str, FieldType::record(&bar_schema()));
        let Value::Mapping(map) =
            Value::from_json(serde_json::json!({"first": {"x": [1.5]}}))
        else {
            panic!("expected mapping");
        };
        let v = recfig().coerce(Value::Mapping(map), &t, "bars").unwrap();
        let first = v.as_mapping().unwrap()["first"].as_record().unwrap();
        assert_eq!(first.get("yy"), Some(&Value::from("lol")));
    }

    #[test]
    fn any_keeps_runtime_types() {
        let v = Value::from_json(serde_json::json!({"k": [1, "two"]}));
        assert_eq!(recfig().coerce(v.clone(), &FieldType::Any, "dd").unwrap(), v);
    }

    #[test]
    fn function_name_resolved() {
        let v = recfig()
            .coerce(Value::from("schedules.identity"), &FieldType::FunctionRef, "f")
            .unwrap();
        let f = v.as_function().unwrap();
        assert_eq!(f.call(&[Value::Int(0), Value::Float(0.1)]), Value::Float(0.1));
    }

    #[test]
    fn function_name_without_module_malformed() {
        let err = recfig()
            .coerce(Value::from("identity"), &FieldType::FunctionRef, "f")
            .unwrap_err();
        assert!(matches!(err, RecfigError::MalformedReference(_)));
    }
}
