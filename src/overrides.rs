//! Apply dotted-path overrides onto a built record.
//!
//! Records are immutable once built, except here: the CLI reconstructor first
//! builds a sub-record from shorthand and then patches in the explicitly
//! supplied leaf flags, deepest last. Override values are already coerced.

use std::fmt;

use crate::error::RecfigError;
use crate::value::{Record, Value};

/// One `path = value` patch, relative to the record it is applied to.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    path: Vec<String>,
    value: Value,
}

impl Override {
    /// `Override::new("model_config.n_layers", Value::Int(4))`
    pub fn new(dotted: &str, value: Value) -> Self {
        Self {
            path: dotted.split('.').map(str::to_string).collect(),
            value,
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.path.join("."), self.value)
    }
}

/// Apply `overrides` in order. If several target the same path, the last wins.
///
/// Every intermediate segment must name a field holding a record; anything
/// else is an [`OverrideConflict`](RecfigError::OverrideConflict).
pub fn apply_overrides(mut record: Record, overrides: &[Override]) -> Result<Record, RecfigError> {
    for ov in overrides {
        set_nested(&mut record, ov)?;
        tracing::trace!(%ov, "applied override");
    }
    Ok(record)
}

fn set_nested(record: &mut Record, ov: &Override) -> Result<(), RecfigError> {
    let conflict = || RecfigError::OverrideConflict {
        path: ov.path.join("."),
    };
    let Some((leaf, parents)) = ov.path.split_last() else {
        return Err(conflict());
    };

    let mut current = record;
    for segment in parents {
        current = match current.field_mut(segment) {
            Some(Value::Record(inner)) => inner,
            _ => return Err(conflict()),
        };
    }

    let slot = current.field_mut(leaf).ok_or_else(conflict)?;
    *slot = ov.value.clone();
    Ok(())
}
