//! Type compatibility: does a declared field type accept a value of a given
//! runtime type, and if the declaration is a union, through which member.
//!
//! Unions resolve to exactly one member. A value that fits several members is
//! an [`AmbiguousUnion`](RecfigError::AmbiguousUnion) error; the resolver
//! never picks the first match.

use crate::error::RecfigError;
use crate::types::{ConcreteType, FieldType, PrimitiveKind};

/// Returns `Some(resolved)` when `declared` accepts `concrete`.
///
/// `resolved` is the type coercion should target: the union member for a
/// union, the inner resolution for an optional, `declared` otherwise.
/// `path` only names the field in errors.
pub fn is_compatible<'t>(
    declared: &'t FieldType,
    concrete: &ConcreteType,
    path: &str,
) -> Result<Option<&'t FieldType>, RecfigError> {
    let accepts = match declared {
        FieldType::Any => true,
        FieldType::Record(schema) => match concrete {
            ConcreteType::Record(name) => name == schema.name(),
            ConcreteType::Mapping | ConcreteType::Str => true,
            _ => false,
        },
        FieldType::Optional(inner) => {
            if *concrete == ConcreteType::None {
                return Ok(Some(declared));
            }
            return is_compatible(inner, concrete, path);
        }
        FieldType::Union(members) => return resolve_union(declared, members, concrete, path),
        FieldType::Mapping { .. } => *concrete == ConcreteType::Mapping,
        FieldType::Sequence(_) => *concrete == ConcreteType::Sequence,
        FieldType::FunctionRef => {
            matches!(concrete, ConcreteType::Function | ConcreteType::Str)
        }
        FieldType::Primitive(kind) => match kind {
            PrimitiveKind::Bool | PrimitiveKind::Int | PrimitiveKind::Float => {
                concrete.is_numeric()
            }
            PrimitiveKind::Str => *concrete == ConcreteType::Str,
        },
    };
    Ok(accepts.then_some(declared))
}

fn resolve_union<'t>(
    declared: &'t FieldType,
    members: &'t [FieldType],
    concrete: &ConcreteType,
    path: &str,
) -> Result<Option<&'t FieldType>, RecfigError> {
    let mut matches = Vec::new();
    for member in members {
        if is_compatible(member, concrete, path)?.is_some() {
            matches.push(member);
        }
    }
    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        _ => Err(RecfigError::AmbiguousUnion {
            path: path.to_string(),
            declared: declared.to_string(),
            concrete: concrete.to_string(),
            candidates: matches.iter().map(|m| m.to_string()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{foo_schema, foobar_schema};

    fn compat(declared: &FieldType, concrete: ConcreteType) -> bool {
        is_compatible(declared, &concrete, "x").unwrap().is_some()
    }

    #[test]
    fn same_primitive() {
        assert!(compat(&FieldType::int(), ConcreteType::Int));
        assert!(compat(&FieldType::string(), ConcreteType::Str));
        assert!(!compat(&FieldType::string(), ConcreteType::Int));
    }

    #[test]
    fn numeric_widening_both_ways() {
        assert!(compat(&FieldType::bool(), ConcreteType::Int));
        assert!(compat(&FieldType::int(), ConcreteType::Bool));
        assert!(compat(&FieldType::float(), ConcreteType::Int));
        assert!(compat(&FieldType::int(), ConcreteType::Float));
        assert!(!compat(&FieldType::int(), ConcreteType::Str));
    }

    #[test]
    fn mapping_requires_mapping() {
        let t = FieldType::mapping(PrimitiveKind::Int, FieldType::int());
        assert!(compat(&t, ConcreteType::Mapping));
        assert!(!compat(&t, ConcreteType::Str));
        assert!(!compat(&t, ConcreteType::Sequence));
    }

    #[test]
    fn record_accepts_itself_mapping_and_string() {
        let t = FieldType::record(&foobar_schema());
        assert!(compat(&t, ConcreteType::Record("Foobar".into())));
        assert!(compat(&t, ConcreteType::Mapping));
        assert!(compat(&t, ConcreteType::Str));
        assert!(!compat(&t, ConcreteType::Record("Foo".into())));
        assert!(!compat(&t, ConcreteType::Int));
    }

    #[test]
    fn optional_accepts_none_and_inner() {
        let t = FieldType::optional(FieldType::int());
        assert!(compat(&t, ConcreteType::Int));
        assert!(compat(&t, ConcreteType::None));
        assert!(!compat(&t, ConcreteType::Str));

        let rec = FieldType::optional(FieldType::record(&foobar_schema()));
        assert!(compat(&rec, ConcreteType::Mapping));
    }

    #[test]
    fn optional_resolution_follows_inner() {
        let t = FieldType::optional(FieldType::union([FieldType::int(), FieldType::string()]));
        let resolved = is_compatible(&t, &ConcreteType::Str, "x").unwrap().unwrap();
        assert_eq!(*resolved, FieldType::string());
    }

    #[test]
    fn union_resolves_single_member() {
        let t = FieldType::union([FieldType::int(), FieldType::string()]);
        let resolved = is_compatible(&t, &ConcreteType::Int, "x").unwrap().unwrap();
        assert_eq!(*resolved, FieldType::int());
        let resolved = is_compatible(&t, &ConcreteType::Str, "x").unwrap().unwrap();
        assert_eq!(*resolved, FieldType::string());
    }

    #[test]
    fn union_with_no_member_is_incompatible() {
        let t = FieldType::union([FieldType::int(), FieldType::string()]);
        assert!(!compat(&t, ConcreteType::Sequence));
    }

    #[test]
    fn union_with_two_matches_is_ambiguous() {
        let t = FieldType::union([FieldType::int(), FieldType::float()]);
        let err = is_compatible(&t, &ConcreteType::Int, "primitive").unwrap_err();
        match err {
            RecfigError::AmbiguousUnion {
                path, candidates, ..
            } => {
                assert_eq!(path, "primitive");
                assert_eq!(candidates, vec!["int".to_string(), "float".to_string()]);
            }
            other => panic!("Expected AmbiguousUnion, got {other:?}"),
        }
    }

    #[test]
    fn union_of_record_and_string_is_ambiguous_for_strings() {
        let t = FieldType::union([FieldType::record(&foo_schema()), FieldType::string()]);
        assert!(is_compatible(&t, &ConcreteType::Str, "x").is_err());
        assert!(compat(&t, ConcreteType::Mapping));
    }

    #[test]
    fn function_ref_accepts_function_or_name() {
        assert!(compat(&FieldType::FunctionRef, ConcreteType::Function));
        assert!(compat(&FieldType::FunctionRef, ConcreteType::Str));
        assert!(!compat(&FieldType::FunctionRef, ConcreteType::Int));
    }

    #[test]
    fn any_accepts_everything() {
        assert!(compat(&FieldType::Any, ConcreteType::None));
        assert!(compat(&FieldType::Any, ConcreteType::Mapping));
    }
}
