//! Clap adapter.
//!
//! This module is the integration layer between the parser-agnostic flag
//! tree and [clap](https://docs.rs/clap). It is compiled only when the `clap`
//! Cargo feature is enabled (on by default).
//!
//! Two functions bridge the two sides: [`register`] turns every
//! [`FlagDescriptor`] into a `clap::Arg`, and [`collect`] reads the parsed
//! `ArgMatches` back into [`FlatArgs`]. Values are always collected as raw
//! strings; typing happens in the reconstructor so that errors name the
//! field path rather than clap's rendering of the flag.
//!
//! If you use a different CLI parser, skip this module and fill
//! [`FlatArgs`] from its output directly.

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::flags::{Arity, FlagDescriptor, FlagTree};
use crate::reconstruct::FlatArgs;
use crate::value::Value;

/// Add every flag of `tree` to `cmd`.
pub fn register(cmd: Command, tree: &FlagTree) -> Command {
    tree.iter().fold(cmd, |cmd, flag| cmd.arg(to_arg(flag)))
}

fn to_arg(flag: &FlagDescriptor) -> Arg {
    let mut arg = Arg::new(flag.id.clone())
        .value_name(flag.token.value_name())
        .value_parser(clap::value_parser!(String));

    if let Some(long) = &flag.long {
        arg = arg.long(long.clone());
    }
    if let Some((first, rest)) = flag.shorts.split_first() {
        arg = arg.short(*first).short_aliases(rest.to_vec());
    }
    if !flag.long_aliases.is_empty() {
        arg = arg.aliases(flag.long_aliases.clone());
    }
    if let Some(help) = &flag.help {
        arg = arg.help(help.clone());
    }

    arg = match flag.arity {
        Arity::Scalar => arg
            .num_args(1)
            .action(ArgAction::Set)
            .allow_negative_numbers(true),
        Arity::List => arg
            .num_args(0..)
            .action(ArgAction::Append)
            .allow_negative_numbers(true),
        Arity::Toggle => {
            let bare = if flag.toggle_to.unwrap_or(true) { "true" } else { "false" };
            arg.num_args(0..=1)
                .action(ArgAction::Set)
                .default_missing_value(bare)
        }
    };

    if flag.required {
        arg = arg.required_unless_present_any(flag.required_unless.clone());
    }
    arg
}

/// Read the flags of `tree` back out of `matches`.
///
/// Values typed on the command line become explicit entries. A flag left
/// unset contributes its env default, if it has one.
pub fn collect(matches: &ArgMatches, tree: &FlagTree) -> FlatArgs {
    let mut flat = FlatArgs::new();
    for flag in tree.iter() {
        if matches.value_source(&flag.id) == Some(ValueSource::CommandLine) {
            let mut tokens: Vec<String> = matches
                .get_many::<String>(&flag.id)
                .map(|vals| vals.cloned().collect())
                .unwrap_or_default();
            let value = match flag.arity {
                Arity::List => Value::Sequence(tokens.into_iter().map(Value::Str).collect()),
                _ if tokens.is_empty() => Value::None,
                _ => Value::Str(tokens.swap_remove(0)),
            };
            tracing::trace!(id = %flag.id, %value, "explicit argument");
            flat.insert_explicit(&flag.id, value);
        }
    }
    // Env defaults are keyed by path and never shadow an explicit entry.
    for flag in tree.iter() {
        if let Some(value) = &flag.env_default {
            flat.insert_env(&flag.path, value.clone());
        }
    }
    flat
}
