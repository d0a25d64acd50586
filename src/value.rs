//! Runtime values: the record graph and its loosely typed inputs.
//!
//! A [`Value`] is either a loosely typed input (JSON scalars, strings from the
//! command line, generic mappings) or a coerced, schema-conformant payload
//! containing [`Record`]s and resolved [`FunctionRef`]s. The same type carries
//! both so that coercion is a single `Value -> Value` walk.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::codec;
use crate::error::RecfigError;
use crate::schema::RecordSchema;
use crate::types::ConcreteType;

/// Ordered string-keyed mapping, the generic (JSON object) representation.
pub type Mapping = IndexMap<String, Value>;

/// A function that can be referenced by name from config values.
pub type Callable = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Record(Record),
    Mapping(Mapping),
    Sequence(Vec<Value>),
    Function(FunctionRef),
}

impl Value {
    pub fn concrete_type(&self) -> ConcreteType {
        match self {
            Value::None => ConcreteType::None,
            Value::Bool(_) => ConcreteType::Bool,
            Value::Int(_) => ConcreteType::Int,
            Value::Float(_) => ConcreteType::Float,
            Value::Str(_) => ConcreteType::Str,
            Value::Record(record) => ConcreteType::Record(record.type_name().to_string()),
            Value::Mapping(_) => ConcreteType::Mapping,
            Value::Sequence(_) => ConcreteType::Sequence,
            Value::Function(_) => ConcreteType::Function,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Convert parsed JSON into a loosely typed value.
    ///
    /// Integers that fit `i64` become `Int`, every other number `Float`.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert an encoded value into JSON.
    ///
    /// Records are encoded through [`to_mapping`](crate::to_mapping) and
    /// functions by name. Non-finite floats have no JSON form and fail.
    pub fn to_json(&self) -> Result<serde_json::Value, RecfigError> {
        Ok(match self {
            Value::None => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| RecfigError::InvalidValue {
                    path: "<json>".into(),
                    reason: format!("{f} has no JSON representation"),
                })?,
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Record(record) => {
                return Value::Mapping(codec::to_mapping(record)?).to_json();
            }
            Value::Mapping(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json()?);
                }
                serde_json::Value::Object(out)
            }
            Value::Sequence(items) => serde_json::Value::Array(
                items.iter().map(Value::to_json).collect::<Result<_, _>>()?,
            ),
            Value::Function(f) => serde_json::Value::String(f.name().to_string()),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Function(func) => f.write_str(func.name()),
            other => match other.to_json() {
                Ok(json) => write!(f, "{json}"),
                Err(_) => write!(f, "<{}>", other.concrete_type()),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Value::Mapping(m)
    }
}

impl From<FunctionRef> for Value {
    fn from(f: FunctionRef) -> Self {
        Value::Function(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

/// An instantiated record: one value per schema field, in schema order.
///
/// Records are only built by coercion ([`Recfig::from_mapping`],
/// [`Recfig::reconstruct`]) and are immutable afterwards.
///
/// [`Recfig::from_mapping`]: crate::Recfig::from_mapping
/// [`Recfig::reconstruct`]: crate::Recfig::reconstruct
#[derive(Clone)]
pub struct Record {
    schema: Arc<RecordSchema>,
    fields: IndexMap<String, Value>,
}

impl Record {
    pub(crate) fn new(schema: Arc<RecordSchema>, fields: IndexMap<String, Value>) -> Self {
        Self { schema, fields }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn type_name(&self) -> &str {
        self.schema.name()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Follow a dotted path through nested records, e.g. `"model_config.n_layers"`.
    pub fn get_path(&self, dotted: &str) -> Option<&Value> {
        let mut segments = dotted.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.as_record()?.fields.get(segment)?;
        }
        Some(current)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Decode into a serde type by way of the generic mapping.
    ///
    /// Function references arrive as their qualified names.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, RecfigError> {
        let json = Value::Mapping(codec::to_mapping(self)?).to_json()?;
        serde_json::from_value(json).map_err(|e| RecfigError::InvalidJson {
            origin: format!("record {}", self.type_name()),
            source: e,
        })
    }

    pub(crate) fn field_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.fields.get_mut(field)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.type_name() == other.type_name() && self.fields == other.fields
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.type_name());
        for (name, value) in &self.fields {
            s.field(name, value);
        }
        s.finish()
    }
}

/// A resolved function reference. Compares by qualified name.
#[derive(Clone)]
pub struct FunctionRef {
    name: String,
    func: Callable,
}

impl FunctionRef {
    pub(crate) fn new(name: String, func: Callable) -> Self {
        Self { name, func }
    }

    /// Qualified `module.name` the function was registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRef({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn concrete_types() {
        assert_eq!(Value::None.concrete_type(), ConcreteType::None);
        assert_eq!(Value::from(3).concrete_type(), ConcreteType::Int);
        assert_eq!(Value::from(1.5).concrete_type(), ConcreteType::Float);
        assert_eq!(Value::from("x").concrete_type(), ConcreteType::Str);
        assert_eq!(
            Value::from(vec![1, 2]).concrete_type(),
            ConcreteType::Sequence
        );
    }

    #[test]
    fn from_json_keeps_integers_and_order() {
        let v = Value::from_json(json!({"b": 1, "a": 2.5, "c": [true, null]}));
        let m = v.as_mapping().unwrap();
        let keys: Vec<&str> = m.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(m["b"], Value::Int(1));
        assert_eq!(m["a"], Value::Float(2.5));
        assert_eq!(
            m["c"],
            Value::Sequence(vec![Value::Bool(true), Value::None])
        );
    }

    #[test]
    fn to_json_rejects_nan() {
        let result = Value::Float(f64::NAN).to_json();
        assert!(matches!(result, Err(RecfigError::InvalidValue { .. })));
    }

    #[test]
    fn display_renders_json_for_containers() {
        let v = Value::from(vec![1.5, 2.0]);
        assert_eq!(v.to_string(), "[1.5,2.0]");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::None.to_string(), "None");
    }

    #[test]
    fn option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::None);
        assert_eq!(Value::from(Some("x")), Value::Str("x".into()));
    }

    #[test]
    fn function_refs_compare_by_name() {
        let a = FunctionRef::new("m.f".into(), Arc::new(|_| Value::None));
        let b = FunctionRef::new("m.f".into(), Arc::new(|_| Value::Int(1)));
        assert_eq!(a, b);
        assert_eq!(format!("{a:?}"), "FunctionRef(m.f)");
    }
}
