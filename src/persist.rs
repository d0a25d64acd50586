//! JSON persistence: records to and from `.json` files.
//!
//! Writing always goes through [`to_mapping`](crate::to_mapping), so a file
//! written here loads back into an equal record. Parent directories are
//! created as needed.

use std::path::Path;
use std::sync::Arc;

use crate::builder::Recfig;
use crate::error::RecfigError;
use crate::schema::RecordSchema;
use crate::value::{Record, Value};

/// Read and parse a JSON file. A missing file is
/// [`FileNotFound`](RecfigError::FileNotFound).
pub(crate) fn read_json_value(path: &Path) -> Result<serde_json::Value, RecfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RecfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(RecfigError::IoError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    serde_json::from_str(&content).map_err(|e| RecfigError::InvalidJson {
        origin: path.display().to_string(),
        source: e,
    })
}

impl Recfig {
    /// Encode a record as pretty-printed JSON, fields in schema order.
    pub fn to_json(&self, record: &Record) -> Result<String, RecfigError> {
        let json = Value::Record(record.clone()).to_json()?;
        serde_json::to_string_pretty(&json).map_err(|e| RecfigError::InvalidJson {
            origin: format!("record '{}'", record.type_name()),
            source: e,
        })
    }

    /// Build a record of `schema` from JSON text.
    pub fn from_json(&self, schema: &Arc<RecordSchema>, text: &str) -> Result<Record, RecfigError> {
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| RecfigError::InvalidJson {
                origin: "input".into(),
                source: e,
            })?;
        self.from_json_value(schema, json, schema.name())
    }

    /// Build a record of `schema` from a `.json` file.
    pub fn read_json(&self, schema: &Arc<RecordSchema>, path: &Path) -> Result<Record, RecfigError> {
        let json = read_json_value(path)?;
        tracing::debug!(path = %path.display(), schema = schema.name(), "loaded config file");
        self.from_json_value(schema, json, &path.display().to_string())
    }

    /// Write a record to `path`, which must end in `.json`.
    pub fn write_json(&self, record: &Record, path: &Path) -> Result<(), RecfigError> {
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            return Err(RecfigError::NotJsonPath(path.to_path_buf()));
        }
        let content = self.to_json(record)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| RecfigError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path, content).map_err(|e| RecfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "wrote config file");
        Ok(())
    }

    fn from_json_value(
        &self,
        schema: &Arc<RecordSchema>,
        json: serde_json::Value,
        origin: &str,
    ) -> Result<Record, RecfigError> {
        match Value::from_json(json) {
            Value::Mapping(map) => self.from_mapping(schema, map),
            other => Err(RecfigError::TypeMismatch {
                path: origin.to_string(),
                declared: schema.name().to_string(),
                concrete: other.concrete_type().to_string(),
            }),
        }
    }
}
