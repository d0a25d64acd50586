use std::collections::HashMap;

use crate::coerce::load_shorthand;
use crate::error::RecfigError;
use crate::types::{FieldType, PrimitiveKind};
use crate::value::Value;

/// Snapshot the process environment.
///
/// The flag builder takes the environment as a map so tests can pass
/// synthetic data instead of mutating `std::env`.
pub fn env_snapshot(vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.into_iter().collect()
}

/// Boolean tokens accepted on the command line and in env vars.
/// Case-insensitive: `1/true/yes` and `0/false/no`.
pub fn parse_bool_token(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a token with no declared type to go by.
/// Tries: bool → integer → float → string.
pub fn parse_token_heuristic(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    // Require a dot so "NaN" and "inf" stay strings.
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
    {
        return Value::Float(f);
    }
    Value::Str(s.to_string())
}

/// Parse command-line or env text into a value shaped for `declared`.
///
/// The result still goes through coercion; this step only turns text into
/// the right runtime type. Record text stays a string (coercion reads it as
/// shorthand), mapping text is loaded as JSON, and sequence text is split on
/// whitespace unless it is a JSON array.
pub fn parse_token(text: &str, declared: &FieldType, path: &str) -> Result<Value, RecfigError> {
    match declared {
        FieldType::Optional(inner) => parse_token(text, inner, path),
        FieldType::Primitive(kind) => parse_primitive(text, *kind, path),
        FieldType::Record(_) | FieldType::FunctionRef => Ok(Value::Str(text.to_string())),
        FieldType::Mapping { .. } => Ok(Value::from_json(load_shorthand(text, path)?)),
        FieldType::Sequence(elem) => {
            if text.trim_start().starts_with('[') {
                let json = serde_json::from_str(text).map_err(|e| RecfigError::InvalidJson {
                    origin: format!("the value of '{path}'"),
                    source: e,
                })?;
                return Ok(Value::from_json(json));
            }
            text.split_whitespace()
                .enumerate()
                .map(|(i, tok)| parse_token(tok, elem, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence)
        }
        FieldType::Union(_) | FieldType::Any => Ok(parse_token_heuristic(text)),
    }
}

fn parse_primitive(text: &str, kind: PrimitiveKind, path: &str) -> Result<Value, RecfigError> {
    let invalid = || RecfigError::InvalidValue {
        path: path.to_string(),
        reason: format!("'{text}' is not a valid {kind}"),
    };
    match kind {
        PrimitiveKind::Bool => {
            parse_bool_token(text)
                .map(Value::Bool)
                .ok_or_else(|| RecfigError::InvalidBoolean {
                    flag: path.to_string(),
                    token: text.to_string(),
                })
        }
        PrimitiveKind::Int => text.trim().parse::<i64>().map(Value::Int).map_err(|_| invalid()),
        PrimitiveKind::Float => text
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid()),
        PrimitiveKind::Str => Ok(Value::Str(text.to_string())),
    }
}
