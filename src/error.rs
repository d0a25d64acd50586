//! Error type shared by every recfig operation.
//!
//! Errors are raised where they are detected and propagated unchanged to the
//! caller. Only [`Cli::run`](crate::Cli::run) turns them into a message and a
//! process exit code.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum RecfigError {
    #[error("{path}: {declared} cannot be converted from {concrete}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::type_mismatch)))]
    TypeMismatch {
        path: String,
        declared: String,
        concrete: String,
    },

    #[error("{path}: unsupported conversion from {concrete} to {declared}")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(recfig::unsupported_conversion))
    )]
    UnsupportedConversion {
        path: String,
        declared: String,
        concrete: String,
    },

    #[error("{path}: {concrete} matches more than one member of {declared}: {}", .candidates.join(", "))]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(recfig::ambiguous_union),
            help("narrow the union so that exactly one member accepts the value")
        )
    )]
    AmbiguousUnion {
        path: String,
        declared: String,
        concrete: String,
        candidates: Vec<String>,
    },

    #[error("Missing required field '{0}'")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::missing_field)))]
    MissingField(String),

    #[error("--{0} not provided (no default value)")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::missing_argument)))]
    MissingArgument(String),

    #[error("Malformed function reference '{0}': expected <module>.<name>")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(recfig::malformed_reference))
    )]
    MalformedReference(String),

    #[error("Function reference '{reference}' not found: {reason}")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(recfig::reference_not_found))
    )]
    ReferenceNotFound { reference: String, reason: String },

    #[error("{0} does not exist")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::file_not_found)))]
    FileNotFound(PathBuf),

    #[error("expected one of {{0, 1, true, false, yes, no}} as a bool value for --{flag}, got: {token}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::invalid_boolean)))]
    InvalidBoolean { flag: String, token: String },

    #[error("{path}: expected JSON text or a .json file path, got '{text}'")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(recfig::invalid_shorthand))
    )]
    InvalidShorthand { path: String, text: String },

    #[error("Failed to parse JSON from {origin}: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::invalid_json)))]
    InvalidJson {
        origin: String,
        source: serde_json::Error,
    },

    #[error("Invalid value for '{path}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::invalid_value)))]
    InvalidValue { path: String, reason: String },

    #[error("file should end with .json, got: {0}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::not_json_path)))]
    NotJsonPath(PathBuf),

    #[error("Failed to access {path}: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::io)))]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Field '{field}' occurs more than once in record {schema}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::duplicate_field)))]
    DuplicateField { schema: String, field: String },

    #[error("Command '{0}' occurs more than once")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(recfig::duplicate_command))
    )]
    DuplicateCommand(String),

    #[error("Cannot override '{path}': an enclosing value is not a record")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(recfig::override_conflict))
    )]
    OverrideConflict { path: String },

    #[error("Invalid value in environment variable ${var}: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::env_var)))]
    EnvVar {
        var: String,
        source: Box<RecfigError>,
    },

    #[cfg(feature = "clap")]
    #[error(transparent)]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::arguments)))]
    Arguments(#[from] clap::Error),

    #[error("Command '{command}' failed: {source}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(recfig::handler)))]
    Handler {
        command: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RecfigError {
    /// Process exit code used by [`Cli::run`](crate::Cli::run).
    ///
    /// Missing values exit with 3, values of the wrong shape with 2, and
    /// everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RecfigError::MissingField(_) | RecfigError::MissingArgument(_) => 3,
            RecfigError::TypeMismatch { .. }
            | RecfigError::UnsupportedConversion { .. }
            | RecfigError::AmbiguousUnion { .. }
            | RecfigError::InvalidBoolean { .. }
            | RecfigError::InvalidShorthand { .. }
            | RecfigError::InvalidValue { .. } => 2,
            RecfigError::EnvVar { source, .. } => source.exit_code(),
            _ => 1,
        }
    }
}
