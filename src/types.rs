//! Type shapes: what a field declares and what a value actually is.
//!
//! [`FieldType`] is the closed set of declared shapes a schema field can
//! have. [`ConcreteType`] is the runtime shape of a [`Value`](crate::Value).
//! The compatibility resolver compares the two.

use std::fmt;
use std::sync::Arc;

use crate::schema::RecordSchema;

/// Scalar kinds a field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    Int,
    Float,
    Str,
}

impl PrimitiveKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, PrimitiveKind::Bool | PrimitiveKind::Int | PrimitiveKind::Float)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Str => "str",
        };
        f.write_str(name)
    }
}

/// The declared type of a schema field.
///
/// Nested records are referenced through `Arc<RecordSchema>`; two record
/// types are the same type when their schema names match.
#[derive(Debug, Clone)]
pub enum FieldType {
    Primitive(PrimitiveKind),
    /// The inner type, or none.
    Optional(Box<FieldType>),
    /// Exactly one member must accept a given value.
    Union(Vec<FieldType>),
    Record(Arc<RecordSchema>),
    /// JSON-object shaped mapping. Keys are text checked against `key`.
    Mapping {
        key: PrimitiveKind,
        value: Box<FieldType>,
    },
    Sequence(Box<FieldType>),
    /// A `module.name` reference resolved through the function registry.
    FunctionRef,
    /// Untyped: values keep their own runtime type.
    Any,
}

impl FieldType {
    pub fn bool() -> Self {
        FieldType::Primitive(PrimitiveKind::Bool)
    }

    pub fn int() -> Self {
        FieldType::Primitive(PrimitiveKind::Int)
    }

    pub fn float() -> Self {
        FieldType::Primitive(PrimitiveKind::Float)
    }

    pub fn string() -> Self {
        FieldType::Primitive(PrimitiveKind::Str)
    }

    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn union(members: impl IntoIterator<Item = FieldType>) -> Self {
        FieldType::Union(members.into_iter().collect())
    }

    pub fn record(schema: &Arc<RecordSchema>) -> Self {
        FieldType::Record(Arc::clone(schema))
    }

    pub fn mapping(key: PrimitiveKind, value: FieldType) -> Self {
        FieldType::Mapping {
            key,
            value: Box::new(value),
        }
    }

    /// `Mapping[str, Any]`, the shape of a bare JSON object.
    pub fn any_mapping() -> Self {
        FieldType::mapping(PrimitiveKind::Str, FieldType::Any)
    }

    pub fn sequence(elem: FieldType) -> Self {
        FieldType::Sequence(Box::new(elem))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::Optional(_))
    }

    /// The record schema behind `Record(s)` or `Optional<Record(s)>`.
    pub fn record_schema(&self) -> Option<&Arc<RecordSchema>> {
        match self {
            FieldType::Record(schema) => Some(schema),
            FieldType::Optional(inner) => match inner.as_ref() {
                FieldType::Record(schema) => Some(schema),
                _ => None,
            },
            _ => None,
        }
    }

    /// Strip one level of `Optional`.
    pub fn unwrap_optional(&self) -> &FieldType {
        match self {
            FieldType::Optional(inner) => inner,
            other => other,
        }
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldType::Primitive(a), FieldType::Primitive(b)) => a == b,
            (FieldType::Optional(a), FieldType::Optional(b)) => a == b,
            (FieldType::Union(a), FieldType::Union(b)) => a == b,
            (FieldType::Record(a), FieldType::Record(b)) => a.name() == b.name(),
            (
                FieldType::Mapping { key: ka, value: va },
                FieldType::Mapping { key: kb, value: vb },
            ) => ka == kb && va == vb,
            (FieldType::Sequence(a), FieldType::Sequence(b)) => a == b,
            (FieldType::FunctionRef, FieldType::FunctionRef) => true,
            (FieldType::Any, FieldType::Any) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Primitive(kind) => write!(f, "{kind}"),
            FieldType::Optional(inner) => write!(f, "Optional[{inner}]"),
            FieldType::Union(members) => {
                f.write_str("Union[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{member}")?;
                }
                f.write_str("]")
            }
            FieldType::Record(schema) => f.write_str(schema.name()),
            FieldType::Mapping { key, value } => write!(f, "Mapping[{key}, {value}]"),
            FieldType::Sequence(elem) => write!(f, "Sequence[{elem}]"),
            FieldType::FunctionRef => f.write_str("FunctionRef"),
            FieldType::Any => f.write_str("Any"),
        }
    }
}

/// Runtime shape of a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConcreteType {
    None,
    Bool,
    Int,
    Float,
    Str,
    /// A built record, identified by its schema name.
    Record(String),
    Mapping,
    Sequence,
    Function,
}

impl ConcreteType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ConcreteType::Bool | ConcreteType::Int | ConcreteType::Float)
    }
}

impl fmt::Display for ConcreteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcreteType::None => f.write_str("none"),
            ConcreteType::Bool => f.write_str("bool"),
            ConcreteType::Int => f.write_str("int"),
            ConcreteType::Float => f.write_str("float"),
            ConcreteType::Str => f.write_str("str"),
            ConcreteType::Record(name) => f.write_str(name),
            ConcreteType::Mapping => f.write_str("mapping"),
            ConcreteType::Sequence => f.write_str("sequence"),
            ConcreteType::Function => f.write_str("function"),
        }
    }
}
