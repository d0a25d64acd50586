//! Record ↔ generic mapping codec.
//!
//! [`to_mapping`] flattens a record graph into plain mappings, sequences and
//! scalars (the JSON data model). [`Recfig::from_mapping`] goes the other way
//! through the coercion engine. For any record built from supported field
//! shapes the two are inverse:
//!
//! ```ignore
//! let mapping = recfig.to_mapping(&record)?;
//! assert_eq!(recfig.from_mapping(&schema, mapping)?, record);
//! ```

use std::sync::Arc;

use indexmap::IndexMap;

use crate::builder::Recfig;
use crate::coerce::{normalize_primitive, type_mismatch, unsupported};
use crate::compat::is_compatible;
use crate::error::RecfigError;
use crate::schema::RecordSchema;
use crate::types::FieldType;
use crate::value::{Mapping, Record, Value};

/// Encode a record as an ordered mapping, in schema field order.
pub fn to_mapping(record: &Record) -> Result<Mapping, RecfigError> {
    encode_record(record, "")
}

fn encode_record(record: &Record, prefix: &str) -> Result<Mapping, RecfigError> {
    let mut out = Mapping::with_capacity(record.schema().fields().len());
    for field in record.schema().fields() {
        let path = join_path(prefix, field.name());
        let value = record.get(field.name()).unwrap_or(&Value::None);
        out.insert(
            field.name().to_string(),
            encode(value, field.declared_type(), &path)?,
        );
    }
    Ok(out)
}

fn encode(value: &Value, declared: &FieldType, path: &str) -> Result<Value, RecfigError> {
    if value.is_none() {
        return Ok(Value::None);
    }
    match declared {
        FieldType::Optional(inner) => encode(value, inner, path),
        FieldType::Union(_) => {
            let concrete = value.concrete_type();
            let member = is_compatible(declared, &concrete, path)?
                .ok_or_else(|| type_mismatch(declared, &concrete, path))?;
            encode(value, member, path)
        }
        FieldType::Record(_) => match value {
            Value::Record(record) => Ok(Value::Mapping(encode_record(record, path)?)),
            other => Err(unsupported(declared, other, path)),
        },
        FieldType::Mapping { value: value_type, .. } => match value {
            Value::Mapping(map) => {
                let mut out = Mapping::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), encode(v, value_type, &format!("{path}.{k}"))?);
                }
                Ok(Value::Mapping(out))
            }
            other => Err(unsupported(declared, other, path)),
        },
        FieldType::Sequence(elem) => match value {
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| encode(item, elem, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            other => Err(unsupported(declared, other, path)),
        },
        FieldType::FunctionRef => match value {
            Value::Function(f) => Ok(Value::Str(f.name().to_string())),
            Value::Str(name) => Ok(Value::Str(name.clone())),
            other => Err(unsupported(declared, other, path)),
        },
        FieldType::Primitive(kind) => normalize_primitive(*kind, value.clone(), path),
        FieldType::Any => encode_dynamic(value, path),
    }
}

fn encode_dynamic(value: &Value, path: &str) -> Result<Value, RecfigError> {
    match value {
        Value::Record(record) => Ok(Value::Mapping(encode_record(record, path)?)),
        Value::Function(f) => Ok(Value::Str(f.name().to_string())),
        Value::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), encode_dynamic(v, &format!("{path}.{k}"))?);
            }
            Ok(Value::Mapping(out))
        }
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| encode_dynamic(item, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        scalar => Ok(scalar.clone()),
    }
}

impl Recfig {
    /// Encode a record as an ordered mapping. See [`to_mapping`].
    pub fn to_mapping(&self, record: &Record) -> Result<Mapping, RecfigError> {
        to_mapping(record)
    }

    /// Build a record of `schema` from a generic mapping.
    ///
    /// Present keys are coerced against their field type. Absent keys take the
    /// field default, then none for optional fields; an absent required field
    /// fails with [`MissingField`](RecfigError::MissingField). Keys the schema
    /// does not declare are ignored.
    pub fn from_mapping(
        &self,
        schema: &Arc<RecordSchema>,
        mapping: Mapping,
    ) -> Result<Record, RecfigError> {
        self.from_mapping_at(schema, mapping, "")
    }

    pub(crate) fn from_mapping_at(
        &self,
        schema: &Arc<RecordSchema>,
        mut mapping: Mapping,
        prefix: &str,
    ) -> Result<Record, RecfigError> {
        let mut fields = IndexMap::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let path = join_path(prefix, field.name());
            let value = match mapping.shift_remove(field.name()) {
                Some(raw) => self.coerce(raw, field.declared_type(), &path)?,
                None => match field.default_value().produce() {
                    Some(default) => self.coerce(default, field.declared_type(), &path)?,
                    None if field.declared_type().is_optional() => Value::None,
                    None => return Err(RecfigError::MissingField(path)),
                },
            };
            fields.insert(field.name().to_string(), value);
        }
        if !mapping.is_empty() {
            tracing::debug!(
                schema = schema.name(),
                ignored = ?mapping.keys().collect::<Vec<_>>(),
                "ignoring keys not declared by the schema"
            );
        }
        Ok(Record::new(Arc::clone(schema), fields))
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
