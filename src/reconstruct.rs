//! Rebuild a record from flat command-line arguments.
//!
//! The reconstructor walks the schema, not the arguments: for every field it
//! looks up the explicit `--path` flag, then the `<path>_pos` positional slot,
//! then the environment default. Nested records are built from their
//! shorthand flag when one was given, otherwise field by field.
//!
//! Explicit leaf flags always win over shorthand. When a shorthand builds a
//! sub-record, every explicitly supplied descendant flag is collected into an
//! override list and folded into the shorthand before it is decoded, so a
//! leaf flag can also supply a field the shorthand leaves out:
//!
//! ```text
//! --model_config='{"n_layers": 1}' --model_config.n_layers=2   →  n_layers = 2
//! ```

use std::sync::Arc;

use indexmap::IndexMap;

use crate::builder::Recfig;
use crate::codec::join_path;
use crate::coerce::load_shorthand;
use crate::env::parse_token;
use crate::error::RecfigError;
use crate::flags::{ROOT_ID, ROOT_POSITIONAL_ID, positional_id};
use crate::overrides::{Override, apply_overrides};
use crate::schema::{FieldSpec, RecordSchema};
use crate::types::{FieldType, PrimitiveKind};
use crate::value::{Mapping, Record, Value};

/// Where a flat argument came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSource {
    /// Typed by the user. Raw tokens, parsed during reconstruction.
    CommandLine,
    /// Taken from a bound env var. Already coerced.
    Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry {
    pub value: Value,
    pub source: ArgSource,
}

/// Parsed arguments keyed by flag id.
///
/// Command-line values are tokens: a `Str` for scalar flags, a `Sequence` of
/// `Str` for list flags (a native `Bool` is also accepted for toggles).
#[derive(Debug, Clone, Default)]
pub struct FlatArgs {
    entries: IndexMap<String, FlatEntry>,
}

impl FlatArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value supplied on the command line. Replaces any earlier entry.
    pub fn insert_explicit(&mut self, id: &str, value: impl Into<Value>) {
        self.entries.insert(
            id.to_string(),
            FlatEntry {
                value: value.into(),
                source: ArgSource::CommandLine,
            },
        );
    }

    /// Record an env-derived default. Never replaces an existing entry.
    pub fn insert_env(&mut self, id: &str, value: Value) {
        self.entries.entry(id.to_string()).or_insert(FlatEntry {
            value,
            source: ArgSource::Environment,
        });
    }

    pub fn get(&self, id: &str) -> Option<&FlatEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn is_explicit(&self, id: &str) -> bool {
        self.explicit(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlatEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn explicit(&self, id: &str) -> Option<&Value> {
        self.entries
            .get(id)
            .filter(|e| e.source == ArgSource::CommandLine)
            .map(|e| &e.value)
    }

    /// Explicit flag, then explicit positional slot, then env default.
    fn lookup(&self, path: &str) -> Option<FlatEntry> {
        if let Some(v) = self.explicit(path) {
            return Some(FlatEntry {
                value: v.clone(),
                source: ArgSource::CommandLine,
            });
        }
        if let Some(v) = self.explicit(&positional_id(path)) {
            return Some(FlatEntry {
                value: v.clone(),
                source: ArgSource::CommandLine,
            });
        }
        self.entries
            .get(path)
            .filter(|e| e.source == ArgSource::Environment)
            .cloned()
    }

    fn explicit_at(&self, path: &str) -> Option<&Value> {
        self.explicit(path).or_else(|| self.explicit(&positional_id(path)))
    }

    /// Anything typed on the command line for a descendant of `path`.
    /// Env defaults alone never bring an absent record into existence.
    fn any_under(&self, path: &str) -> bool {
        let prefix = format!("{path}.");
        self.entries
            .iter()
            .any(|(k, e)| e.source == ArgSource::CommandLine && k.starts_with(&prefix))
    }
}

impl Recfig {
    /// Build a record of `schema` from flat arguments.
    pub fn reconstruct(
        &self,
        schema: &Arc<RecordSchema>,
        flat: &FlatArgs,
    ) -> Result<Record, RecfigError> {
        let root = flat
            .explicit(ROOT_ID)
            .or_else(|| flat.explicit(ROOT_POSITIONAL_ID));
        let record = match root {
            Some(value) => {
                let mut overrides = Vec::new();
                self.collect_explicit(schema, "", "", flat, &mut overrides)?;
                tracing::debug!(
                    schema = schema.name(),
                    overrides = overrides.len(),
                    "building record from root shorthand"
                );
                self.root_record(schema, value.clone(), overrides)?
            }
            None => self.build_record(schema, "", flat)?,
        };
        Ok(record)
    }

    fn root_record(
        &self,
        schema: &Arc<RecordSchema>,
        value: Value,
        overrides: Vec<Override>,
    ) -> Result<Record, RecfigError> {
        match value {
            Value::Str(text) => self.shorthand_record(schema, &text, overrides, ""),
            Value::Mapping(map) => self.merged_record(schema, map, overrides, ""),
            Value::Record(record) if record.type_name() == schema.name() => {
                apply_overrides(record, &overrides)
            }
            other => Err(RecfigError::TypeMismatch {
                path: schema.name().to_string(),
                declared: schema.name().to_string(),
                concrete: other.concrete_type().to_string(),
            }),
        }
    }

    /// Load shorthand text for the record at `prefix` and patch in overrides.
    fn shorthand_record(
        &self,
        schema: &Arc<RecordSchema>,
        text: &str,
        overrides: Vec<Override>,
        prefix: &str,
    ) -> Result<Record, RecfigError> {
        let label = if prefix.is_empty() { schema.name() } else { prefix };
        match Value::from_json(load_shorthand(text, label)?) {
            Value::Mapping(map) => self.merged_record(schema, map, overrides, prefix),
            other => Err(RecfigError::TypeMismatch {
                path: label.to_string(),
                declared: schema.name().to_string(),
                concrete: other.concrete_type().to_string(),
            }),
        }
    }

    /// Fold overrides into `map` before decoding, so explicit leaves can fill
    /// fields the shorthand leaves out. Overrides that land under a value
    /// which is not a mapping are patched onto the decoded record instead.
    fn merged_record(
        &self,
        schema: &Arc<RecordSchema>,
        mut map: Mapping,
        overrides: Vec<Override>,
        prefix: &str,
    ) -> Result<Record, RecfigError> {
        let mut rest = Vec::new();
        for ov in overrides {
            let placed = match mapping_slot(&mut map, ov.path()) {
                Some((slot, leaf)) => {
                    slot.insert(leaf.to_string(), ov.value().clone());
                    true
                }
                None => false,
            };
            if !placed {
                rest.push(ov);
            }
        }
        let record = self.from_mapping_at(schema, map, prefix)?;
        apply_overrides(record, &rest)
    }

    fn build_record(
        &self,
        schema: &Arc<RecordSchema>,
        prefix: &str,
        flat: &FlatArgs,
    ) -> Result<Record, RecfigError> {
        let mut fields = IndexMap::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let path = join_path(prefix, field.name());
            let value = self.resolve_field(field, &path, flat)?;
            fields.insert(field.name().to_string(), value);
        }
        Ok(Record::new(Arc::clone(schema), fields))
    }

    fn resolve_field(
        &self,
        field: &FieldSpec,
        path: &str,
        flat: &FlatArgs,
    ) -> Result<Value, RecfigError> {
        let declared = field.declared_type();
        let supplied = flat.lookup(path);

        if let Some(sub) = declared.record_schema() {
            if let Some(entry) = supplied {
                let mut overrides = Vec::new();
                self.collect_explicit(sub, path, "", flat, &mut overrides)?;
                let base = match self.decode(entry, declared, path)? {
                    Value::Str(text) => {
                        let record = self.shorthand_record(sub, &text, overrides, path)?;
                        return Ok(Value::Record(record));
                    }
                    other => self.coerce(other, declared, path)?,
                };
                return match base {
                    Value::Record(record) => Ok(Value::Record(apply_overrides(record, &overrides)?)),
                    other if overrides.is_empty() => Ok(other),
                    _ => Err(RecfigError::OverrideConflict {
                        path: path.to_string(),
                    }),
                };
            }
            if !flat.any_under(path) {
                if let Some(default) = field.default_value().produce() {
                    return self.coerce(default, declared, path);
                }
                if declared.is_optional() {
                    return Ok(Value::None);
                }
            }
            return Ok(Value::Record(self.build_record(sub, path, flat)?));
        }

        match supplied {
            Some(entry) => self.coerce(self.decode(entry, declared, path)?, declared, path),
            None => match field.default_value().produce() {
                Some(default) => self.coerce(default, declared, path),
                None if declared.is_optional() => Ok(Value::None),
                None => Err(RecfigError::MissingArgument(path.to_string())),
            },
        }
    }

    /// Turn command-line tokens into a value of the declared shape.
    /// Env entries are already coerced and pass through.
    fn decode(&self, entry: FlatEntry, declared: &FieldType, path: &str) -> Result<Value, RecfigError> {
        match entry.source {
            ArgSource::Environment => Ok(entry.value),
            ArgSource::CommandLine => decode_tokens(entry.value, declared, path),
        }
    }

    /// Collect explicit flags under `abs_prefix`, depth-first in schema order,
    /// as overrides relative to the record at `abs_prefix`.
    fn collect_explicit(
        &self,
        schema: &RecordSchema,
        abs_prefix: &str,
        rel_prefix: &str,
        flat: &FlatArgs,
        out: &mut Vec<Override>,
    ) -> Result<(), RecfigError> {
        for field in schema.fields() {
            let abs = join_path(abs_prefix, field.name());
            let rel = join_path(rel_prefix, field.name());
            let declared = field.declared_type();
            if let Some(raw) = flat.explicit_at(&abs) {
                let value = decode_tokens(raw.clone(), declared, &abs)?;
                out.push(Override::new(&rel, self.coerce(value, declared, &abs)?));
            }
            if let Some(sub) = declared.record_schema() {
                self.collect_explicit(sub, &abs, &rel, flat, out)?;
            }
        }
        Ok(())
    }
}

/// The map that should hold the last segment of `path`, creating missing
/// intermediate maps. `None` when an intermediate holds something else.
fn mapping_slot<'a>(map: &'a mut Mapping, path: &'a [String]) -> Option<(&'a mut Mapping, &'a str)> {
    let (leaf, parents) = path.split_last()?;
    let mut slot = map;
    for segment in parents {
        match slot
            .entry(segment.clone())
            .or_insert_with(|| Value::Mapping(Mapping::new()))
        {
            Value::Mapping(inner) => slot = inner,
            _ => return None,
        }
    }
    Some((slot, leaf.as_str()))
}

fn decode_tokens(value: Value, declared: &FieldType, path: &str) -> Result<Value, RecfigError> {
    match (value, declared.unwrap_optional()) {
        (Value::Str(text), _) => parse_token(&text, declared, path),
        (Value::Bool(b), _) => Ok(Value::Bool(b)),
        (other, FieldType::Primitive(PrimitiveKind::Bool)) => Err(RecfigError::InvalidBoolean {
            flag: path.to_string(),
            token: other.to_string(),
        }),
        (Value::Sequence(items), FieldType::Sequence(elem)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| decode_tokens(item, elem, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        (other, _) => Ok(other),
    }
}
