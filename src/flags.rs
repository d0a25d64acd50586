//! Flag-tree construction: one flat list of CLI flags derived from a schema.
//!
//! The tree is parser-agnostic. Each [`FlagDescriptor`] says what a flag is
//! called, how many tokens it takes and whether it is required; the clap
//! adapter turns descriptors into `clap::Arg`s and the reconstructor walks the
//! schema again to read them back.
//!
//! For a `TrainArgs` schema with a nested `model_config` the tree holds:
//!
//! ```text
//! --TrainArgs                   whole record as JSON text or a .json file
//! --model_config                nested record shorthand
//! --model_config.n_layers       leaf flags, dotted by path
//! --model_config.checkpoint_path, --chkpt
//! --lr, --name/-n, ...
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builder::Recfig;
use crate::codec::join_path;
use crate::env::parse_token;
use crate::error::RecfigError;
use crate::schema::{DefaultValue, FieldSpec, RecordSchema};
use crate::types::{FieldType, PrimitiveKind};
use crate::value::Value;

/// Parser id of the root shorthand flag.
pub const ROOT_ID: &str = "@root";
/// Parser id of the root shorthand positional slot.
pub const ROOT_POSITIONAL_ID: &str = "@root_pos";

/// Suffix of a field's positional slot id: `<path>_pos`.
pub(crate) fn positional_id(path: &str) -> String {
    format!("{path}_pos")
}

/// How many tokens a flag consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly one token.
    Scalar,
    /// Zero or more tokens.
    List,
    /// Zero or one token; the bare flag flips the default.
    Toggle,
}

/// What a flag's tokens look like. Drives the value name shown in help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Bool,
    Int,
    Float,
    Str,
    /// Inline JSON or the path of a `.json` file.
    Json,
    /// A `module.name` function reference.
    Function,
    /// Parsed as bool, then int, then float, else kept as a string.
    Heuristic,
}

impl TokenKind {
    pub fn value_name(self) -> &'static str {
        match self {
            TokenKind::Bool => "BOOL",
            TokenKind::Int => "INT",
            TokenKind::Float => "FLOAT",
            TokenKind::Str => "STR",
            TokenKind::Json => "JSON",
            TokenKind::Function => "MODULE.NAME",
            TokenKind::Heuristic => "VALUE",
        }
    }

    fn of(declared: &FieldType) -> TokenKind {
        match declared.unwrap_optional() {
            FieldType::Primitive(PrimitiveKind::Bool) => TokenKind::Bool,
            FieldType::Primitive(PrimitiveKind::Int) => TokenKind::Int,
            FieldType::Primitive(PrimitiveKind::Float) => TokenKind::Float,
            FieldType::Primitive(PrimitiveKind::Str) => TokenKind::Str,
            FieldType::Record(_) | FieldType::Mapping { .. } => TokenKind::Json,
            FieldType::FunctionRef => TokenKind::Function,
            FieldType::Sequence(elem) => TokenKind::of(elem),
            FieldType::Union(_) | FieldType::Optional(_) | FieldType::Any => TokenKind::Heuristic,
        }
    }
}

/// One CLI flag or positional slot.
#[derive(Debug, Clone)]
pub struct FlagDescriptor {
    /// Dotted field path; empty for the root shorthand.
    pub path: String,
    /// Parser id. The path for flags, `<path>_pos` for positional slots.
    pub id: String,
    /// `--long` name; `None` for positional slots.
    pub long: Option<String>,
    pub shorts: Vec<char>,
    pub long_aliases: Vec<String>,
    pub positional: bool,
    pub arity: Arity,
    pub token: TokenKind,
    pub required: bool,
    /// Ids whose presence waives `required`.
    pub required_unless: Vec<String>,
    pub help: Option<String>,
    /// Coerced value of the bound env var, if it is set.
    pub env_default: Option<Value>,
    /// Value a bare toggle flag stands for.
    pub toggle_to: Option<bool>,
}

impl FlagDescriptor {
    fn new(path: &str, id: String, arity: Arity, token: TokenKind) -> Self {
        Self {
            path: path.to_string(),
            id,
            long: None,
            shorts: Vec::new(),
            long_aliases: Vec::new(),
            positional: false,
            arity,
            token,
            required: false,
            required_unless: Vec::new(),
            help: None,
            env_default: None,
            toggle_to: None,
        }
    }
}

impl fmt::Display for FlagDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.long {
            Some(long) => write!(f, "--{long}"),
            None => write!(f, "<{}>", self.id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    /// Also accept the root shorthand as a positional argument.
    pub positional_config: bool,
}

/// All flags of one schema, in registration order (depth-first).
#[derive(Debug, Clone)]
pub struct FlagTree {
    schema: Arc<RecordSchema>,
    flags: Vec<FlagDescriptor>,
}

impl FlagTree {
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagDescriptor> {
        self.flags.iter()
    }

    pub fn get(&self, id: &str) -> Option<&FlagDescriptor> {
        self.flags.iter().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl Recfig {
    /// Derive the flag tree of `schema`.
    ///
    /// `env` is a snapshot of the environment; bound variables that are set
    /// become coerced flag defaults. A value that does not parse is fatal.
    pub fn build_flags(
        &self,
        schema: &Arc<RecordSchema>,
        env: &HashMap<String, String>,
        options: BuildOptions,
    ) -> Result<FlagTree, RecfigError> {
        let mut root_ids = vec![ROOT_ID.to_string()];
        let mut flags = Vec::new();

        let mut root = FlagDescriptor::new("", ROOT_ID.into(), Arity::Scalar, TokenKind::Json);
        root.long = Some(schema.name().to_string());
        root.help = Some(format!(
            "Load the whole {} from JSON text or a .json file",
            schema.name()
        ));
        flags.push(root);

        if options.positional_config {
            let mut pos =
                FlagDescriptor::new("", ROOT_POSITIONAL_ID.into(), Arity::Scalar, TokenKind::Json);
            pos.positional = true;
            pos.help = Some(format!("{} as JSON text or a .json file", schema.name()));
            flags.push(pos);
            root_ids.push(ROOT_POSITIONAL_ID.to_string());
        }

        let mut walker = Walker {
            recfig: self,
            env,
            root_ids: &root_ids,
            flags,
        };
        walker.walk(schema, "")?;

        tracing::debug!(
            schema = schema.name(),
            flags = walker.flags.len(),
            "built flag tree"
        );
        Ok(FlagTree {
            schema: Arc::clone(schema),
            flags: walker.flags,
        })
    }
}

struct Walker<'a> {
    recfig: &'a Recfig,
    env: &'a HashMap<String, String>,
    root_ids: &'a [String],
    flags: Vec<FlagDescriptor>,
}

impl Walker<'_> {
    fn walk(&mut self, schema: &RecordSchema, prefix: &str) -> Result<(), RecfigError> {
        for field in schema.fields() {
            let path = join_path(prefix, field.name());
            self.add_field(field, &path, prefix.is_empty())?;
            if let Some(sub) = field.declared_type().record_schema() {
                self.walk(sub, &path)?;
            }
        }
        Ok(())
    }

    fn add_field(&mut self, field: &FieldSpec, path: &str, top_level: bool) -> Result<(), RecfigError> {
        let declared = field.declared_type();
        let meta = field.meta();
        let env_default = self.env_default(field, path)?;

        let arity = match declared.unwrap_optional() {
            FieldType::Primitive(PrimitiveKind::Bool) => Arity::Toggle,
            FieldType::Sequence(_) => Arity::List,
            _ => Arity::Scalar,
        };
        let token = TokenKind::of(declared);

        let required = top_level
            && !declared.is_optional()
            && declared.record_schema().is_none()
            && field.default_value().is_required()
            && env_default.is_none()
            && !meta.positional;

        let help = help_text(field, top_level, env_default.as_ref());
        let toggle_to = (arity == Arity::Toggle).then(|| {
            let current = env_default
                .clone()
                .or_else(|| field.default_value().produce())
                .and_then(|v| v.as_bool());
            !current.unwrap_or(false)
        });

        if meta.flag {
            let mut flag = FlagDescriptor::new(path, path.to_string(), arity, token);
            flag.long = Some(path.to_string());
            for alias in &meta.short {
                let mut chars = alias.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => flag.shorts.push(c),
                    _ => flag.long_aliases.push(alias.clone()),
                }
            }
            flag.required = required;
            if required {
                flag.required_unless = self.root_ids.to_vec();
            }
            flag.help = help.clone();
            flag.env_default = env_default.clone();
            flag.toggle_to = toggle_to;
            self.flags.push(flag);
        }

        if meta.positional {
            let slot_arity = if arity == Arity::List {
                Arity::List
            } else {
                Arity::Scalar
            };
            let mut slot = FlagDescriptor::new(path, positional_id(path), slot_arity, token);
            slot.positional = true;
            slot.help = help;
            slot.env_default = env_default;
            self.flags.push(slot);
        }
        Ok(())
    }

    fn env_default(&self, field: &FieldSpec, path: &str) -> Result<Option<Value>, RecfigError> {
        let Some(var) = field.meta().env.as_deref() else {
            return Ok(None);
        };
        let Some(raw) = self.env.get(var) else {
            return Ok(None);
        };
        let declared = field.declared_type();
        parse_token(raw, declared, path)
            .and_then(|v| self.recfig.coerce(v, declared, path))
            .map(Some)
            .map_err(|e| RecfigError::EnvVar {
                var: var.to_string(),
                source: Box::new(e),
            })
    }
}

fn help_text(field: &FieldSpec, top_level: bool, env_default: Option<&Value>) -> Option<String> {
    let default = match (env_default, field.meta().env.as_deref(), field.default_value()) {
        (Some(value), Some(var), _) => Some(format!("Default (using env: ${var}): {value}")),
        (_, _, DefaultValue::Fixed(value)) if top_level => Some(format!("Default: {value}")),
        _ => None,
    };
    match (field.meta().help.as_deref(), default) {
        (Some(help), Some(default)) => Some(format!("{help}. {default}")),
        (Some(help), None) => Some(help.to_string()),
        (None, default) => default,
    }
}
