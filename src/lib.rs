//! Schema-driven records for Rust CLI apps. Declare the shape of your
//! configuration once; get JSON persistence and a generated command line.
//!
//! Recfig works from a [`RecordSchema`]: a tree of named, typed fields with
//! defaults, help text, aliases and environment bindings. From that one
//! declaration it provides three conversions:
//!
//! - record ↔ generic mapping, and through it ↔ JSON files;
//! - record ↔ flat command-line flags (`--model_config.n_layers 4`);
//! - function names in config values ↔ callables from a registry.
//!
//! ```ignore
//! let model = RecordSchema::builder("ModelConfig")
//!     .field(FieldSpec::new("n_layers", FieldType::int()).default(10))
//!     .build()?;
//! let train = RecordSchema::builder("TrainArgs")
//!     .field(FieldSpec::new("model_config", FieldType::record(&model)))
//!     .field(FieldSpec::new("lr", FieldType::float()).default(0.01).env("TRAIN_LR"))
//!     .build()?;
//!
//! Cli::builder("trainer")
//!     .command("train", "Train a model", &train, |args| {
//!         Recfig::new().write_json(&args, Path::new("runs/config.json"))?;
//!         Ok(())
//!     })
//!     .build()?
//!     .run();
//! ```
//!
//! # Design: schema as source of truth
//!
//! Nothing in the crate inspects record types any other way than through
//! their schema. A field's [`FieldType`] is a closed enum
//! (`Primitive | Optional | Union | Record | Mapping | Sequence | FunctionRef |
//! Any`), matched exhaustively by the compatibility resolver, the coercion
//! engine, the codec and the flag builder. Adding a field to the schema adds
//! it to the JSON form, the CLI and the help text at once.
//!
//! # Compatibility and coercion
//!
//! [`is_compatible`] decides whether a declared type accepts a value's
//! runtime type. Numbers and booleans accept each other; a record accepts
//! itself, a mapping, or a shorthand string. A union must resolve to exactly
//! one member: a value that fits two members is an
//! [`AmbiguousUnion`](RecfigError::AmbiguousUnion) error, never a silent
//! first pick.
//!
//! [`Recfig::coerce`] then rebuilds the value in the declared shape,
//! recursing through records, mappings and sequences, and resolving function
//! names through the [`FunctionRegistry`].
//!
//! # Shorthand
//!
//! A string supplied where a record is expected is *shorthand* for the whole
//! record:
//!
//! - text starting with `{` is parsed as inline JSON;
//! - text ending in `.json` names a file, which must exist.
//!
//! Anything else is rejected with
//! [`InvalidShorthand`](RecfigError::InvalidShorthand). Strings are never
//! evaluated.
//!
//! # Command line
//!
//! [`Recfig::build_flags`] derives one flag per field, depth-first and dotted
//! by path, plus a root flag named after the schema (`--TrainArgs`) that
//! takes the whole record as shorthand. Booleans take zero or one token
//! (`1/0/true/false/yes/no`); the bare flag flips the default. Sequences
//! take any number of tokens. Only top-level fields with no default and no
//! environment value are required, and supplying the root shorthand waives
//! even those.
//!
//! Precedence, lowest to highest:
//!
//! ```text
//! Schema defaults       FieldSpec::default(..)
//!        ↑ overridden by
//! Environment           FieldSpec::env("VAR"), used as the flag default
//!        ↑ overridden by
//! Shorthand             --TrainArgs / --model_config (JSON text or file)
//!        ↑ overridden by
//! Leaf flags            --model_config.n_layers
//! ```
//!
//! [`Recfig::reconstruct`] reads [`FlatArgs`] back into a record. The
//! `clap` adapter (the `cli` module, behind the `clap` Cargo feature, on by
//! default) registers the flags on a `clap::Command` and collects the
//! parsed matches; [`Cli`] wraps both with a command-dispatch table. To use
//! recfig without clap:
//!
//! ```toml
//! recfig = { version = "...", default-features = false }
//! ```
//!
//! # Persistence
//!
//! [`Recfig::to_json`] / [`Recfig::write_json`] encode records in schema
//! field order with two-space indentation; [`Recfig::read_json`] reads them
//! back. Function references are stored by their `module.name`, so a file
//! written by recfig always loads into an equal record.
//!
//! # Error handling
//!
//! All fallible operations return [`RecfigError`], raised where the problem
//! is detected and naming the dotted field path involved. Only [`Cli::run`]
//! renders errors and exits. Enable the `rich-errors` feature for
//! `miette::Diagnostic` with stable error codes.

pub mod error;
pub mod types;

mod builder;
#[cfg(feature = "clap")]
mod app;
#[cfg(feature = "clap")]
pub mod cli;
mod codec;
mod coerce;
mod compat;
mod env;
mod flags;
mod function;
mod overrides;
mod persist;
mod reconstruct;
mod schema;
mod value;

#[cfg(test)]
mod fixtures;

#[cfg(feature = "clap")]
pub use app::{Cli, CliBuilder, Dispatch, Handler, HandlerError};
pub use builder::Recfig;
pub use codec::to_mapping;
pub use compat::is_compatible;
pub use env::{env_snapshot, parse_bool_token, parse_token, parse_token_heuristic};
pub use error::RecfigError;
pub use flags::{
    Arity, BuildOptions, FlagDescriptor, FlagTree, ROOT_ID, ROOT_POSITIONAL_ID, TokenKind,
};
pub use function::FunctionRegistry;
pub use overrides::{Override, apply_overrides};
pub use reconstruct::{ArgSource, FlatArgs, FlatEntry};
pub use schema::{DefaultFactory, DefaultValue, FieldMeta, FieldSpec, RecordSchema, RecordSchemaBuilder};
pub use types::{ConcreteType, FieldType, PrimitiveKind};
pub use value::{Callable, FunctionRef, Mapping, Record, Value};
