//! Command dispatch: a table of named commands, each with a schema and a
//! handler, run against the process arguments.
//!
//! ```ignore
//! Cli::builder("trainer")
//!     .functions(registry)
//!     .command("train", "Train a model", &train_schema, |args| train(args))
//!     .command("eval", "Evaluate a checkpoint", &eval_schema, |args| eval(args))
//!     .build()?
//!     .run();
//! ```
//!
//! Every command gets one flag per schema field (see [`FlagTree`]). A parse
//! rebuilds the record and hands it to the handler.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::sync::Arc;

use clap::{ArgMatches, Command};

use crate::builder::Recfig;
use crate::cli;
use crate::env::env_snapshot;
use crate::error::RecfigError;
use crate::flags::{BuildOptions, FlagTree};
use crate::function::FunctionRegistry;
use crate::schema::RecordSchema;
use crate::value::Record;

/// Error a handler may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives the record built from the command line.
pub type Handler = Box<dyn Fn(Record) -> Result<(), HandlerError>>;

/// Outcome of a successful [`Cli::run_from`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The named command's handler ran to completion.
    Ran { command: String },
    /// No command was selected; holds the rendered help.
    Help(String),
}

struct CommandSpec {
    name: String,
    about: String,
    schema: Arc<RecordSchema>,
    handler: Handler,
}

struct BoundCommand {
    name: String,
    tree: FlagTree,
    handler: Handler,
}

pub struct CliBuilder {
    app_name: String,
    about: Option<String>,
    commands: Vec<CommandSpec>,
    functions: FunctionRegistry,
    env: Option<HashMap<String, String>>,
    positional_config: bool,
    single: bool,
}

impl CliBuilder {
    fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            about: None,
            commands: Vec::new(),
            functions: FunctionRegistry::new(),
            env: None,
            positional_config: false,
            single: false,
        }
    }

    pub fn about(mut self, about: &str) -> Self {
        self.about = Some(about.to_string());
        self
    }

    /// Register a subcommand. Names must be unique; a repeat fails at
    /// [`build`](Self::build).
    pub fn command<F>(mut self, name: &str, about: &str, schema: &Arc<RecordSchema>, handler: F) -> Self
    where
        F: Fn(Record) -> Result<(), HandlerError> + 'static,
    {
        self.commands.push(CommandSpec {
            name: name.to_string(),
            about: about.to_string(),
            schema: Arc::clone(schema),
            handler: Box::new(handler),
        });
        self
    }

    /// Functions that config values may reference by name.
    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Use these variables instead of the process environment.
    pub fn env_vars(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = Some(env_snapshot(vars));
        self
    }

    /// Accept each command's whole config as a positional argument.
    pub fn positional_config(mut self, enabled: bool) -> Self {
        self.positional_config = enabled;
        self
    }

    pub fn build(self) -> Result<Cli, RecfigError> {
        let recfig = Recfig::with_functions(self.functions);
        let env = self.env.unwrap_or_else(|| env_snapshot(std::env::vars()));
        let options = BuildOptions {
            positional_config: self.positional_config,
        };

        let mut command = Command::new(self.app_name.clone());
        if let Some(about) = &self.about {
            command = command.about(about.clone());
        }

        let mut seen = HashSet::new();
        let mut bound = Vec::with_capacity(self.commands.len());
        for spec in self.commands {
            if !seen.insert(spec.name.clone()) {
                return Err(RecfigError::DuplicateCommand(spec.name));
            }
            let tree = recfig.build_flags(&spec.schema, &env, options)?;
            command = if self.single {
                cli::register(command, &tree)
            } else {
                let sub = Command::new(spec.name.clone()).about(spec.about);
                command.subcommand(cli::register(sub, &tree))
            };
            bound.push(BoundCommand {
                name: spec.name,
                tree,
                handler: spec.handler,
            });
        }

        tracing::debug!(
            app = %self.app_name,
            commands = bound.len(),
            "built command line"
        );
        Ok(Cli {
            recfig,
            command,
            commands: bound,
            single: self.single,
        })
    }
}

pub struct Cli {
    recfig: Recfig,
    command: Command,
    commands: Vec<BoundCommand>,
    single: bool,
}

impl Cli {
    pub fn builder(app_name: &str) -> CliBuilder {
        CliBuilder::new(app_name)
    }

    /// A program with one command: flags go on the top level, no subcommand.
    pub fn single<F>(app_name: &str, schema: &Arc<RecordSchema>, handler: F) -> CliBuilder
    where
        F: Fn(Record) -> Result<(), HandlerError> + 'static,
    {
        let mut builder = CliBuilder::new(app_name).command(app_name, "", schema, handler);
        builder.single = true;
        builder
    }

    /// The generated clap command, for help rendering or inspection.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// Parse `argv` (program name first), rebuild the record and run the
    /// selected handler.
    pub fn run_from<I, T>(&self, argv: I) -> Result<Dispatch, RecfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().try_get_matches_from(argv)?;
        let (bound, sub_matches) = match self.select(&matches) {
            Some(selected) => selected,
            None => {
                let help = self.command.clone().render_help().to_string();
                return Ok(Dispatch::Help(help));
            }
        };

        let flat = cli::collect(sub_matches, &bound.tree);
        let record = self.recfig.reconstruct(bound.tree.schema(), &flat)?;
        tracing::debug!(command = %bound.name, "dispatching");
        (bound.handler)(record).map_err(|source| RecfigError::Handler {
            command: bound.name.clone(),
            source,
        })?;
        Ok(Dispatch::Ran {
            command: bound.name.clone(),
        })
    }

    fn select<'m>(&self, matches: &'m ArgMatches) -> Option<(&BoundCommand, &'m ArgMatches)> {
        if self.single {
            return self.commands.first().map(|c| (c, matches));
        }
        let (name, sub) = matches.subcommand()?;
        self.commands.iter().find(|c| c.name == name).map(|c| (c, sub))
    }

    /// Run against the process arguments and exit on failure.
    ///
    /// Help is printed to stdout. Errors print as `[ERROR]: <message>` on
    /// stderr and exit with [`RecfigError::exit_code`]; clap's own errors
    /// (including `--help`) keep clap's rendering and exit code.
    pub fn run(&self) {
        match self.run_from(std::env::args_os()) {
            Ok(Dispatch::Help(help)) => println!("{help}"),
            Ok(Dispatch::Ran { .. }) => {}
            Err(RecfigError::Arguments(e)) => e.exit(),
            Err(e) => {
                eprintln!("[ERROR]: {e}");
                std::process::exit(e.exit_code());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{model_config_schema, nested_schema, test_functions, train_args_schema};
    use crate::value::Value;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Seen = Rc<RefCell<Vec<Record>>>;

    fn recorder(seen: &Seen) -> impl Fn(Record) -> Result<(), HandlerError> + 'static {
        let seen = Rc::clone(seen);
        move |record| {
            seen.borrow_mut().push(record);
            Ok(())
        }
    }

    fn app(seen: &Seen, env: &[(&str, &str)]) -> Cli {
        Cli::builder("trainer")
            .functions(test_functions())
            .env_vars(env.iter().map(|(k, v)| (k.to_string(), v.to_string())))
            .command("train", "Train a model", &train_args_schema(), recorder(seen))
            .command("eval", "Evaluate a model", &model_config_schema(), |_| Ok(()))
            .build()
            .unwrap()
    }

    #[test]
    fn dispatches_to_selected_command() {
        let seen = Seen::default();
        let out = app(&seen, &[])
            .run_from(["trainer", "train", "--model_config.n_layers", "3", "--cont"])
            .unwrap();
        assert_eq!(out, Dispatch::Ran { command: "train".into() });

        let records = seen.borrow();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_path("model_config.n_layers"), Some(&Value::Int(3)));
        assert_eq!(records[0].get("cont"), Some(&Value::Bool(true)));
    }

    #[test]
    fn other_command_does_not_call_train() {
        let seen = Seen::default();
        let out = app(&seen, &[]).run_from(["trainer", "eval"]).unwrap();
        assert_eq!(out, Dispatch::Ran { command: "eval".into() });
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn no_command_returns_help() {
        let seen = Seen::default();
        match app(&seen, &[]).run_from(["trainer"]).unwrap() {
            Dispatch::Help(text) => {
                assert!(text.contains("train"));
                assert!(text.contains("Evaluate a model"));
            }
            other => panic!("Expected Help, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_command_rejected() {
        let result = Cli::builder("trainer")
            .command("train", "a", &train_args_schema(), |_| Ok(()))
            .command("train", "b", &model_config_schema(), |_| Ok(()))
            .env_vars(Vec::new())
            .build();
        assert!(matches!(result, Err(RecfigError::DuplicateCommand(n)) if n == "train"));
    }

    #[test]
    fn duplicate_check_is_per_build() {
        for _ in 0..2 {
            let seen = Seen::default();
            app(&seen, &[]);
        }
    }

    #[test]
    fn env_default_then_explicit_flag() {
        let seen = Seen::default();
        let cli = app(&seen, &[("TRAIN_LR", "0.25")]);
        cli.run_from(["trainer", "train"]).unwrap();
        cli.run_from(["trainer", "train", "--lr", "0.5"]).unwrap();

        let records = seen.borrow();
        assert_eq!(records[0].get("lr"), Some(&Value::Float(0.25)));
        assert_eq!(records[1].get("lr"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn bad_env_fails_build() {
        let seen = Seen::default();
        let result = Cli::builder("trainer")
            .env_vars(vec![("TRAIN_LR".to_string(), "fast".to_string())])
            .command("train", "Train", &train_args_schema(), recorder(&seen))
            .build();
        assert!(matches!(result, Err(RecfigError::EnvVar { .. })));
    }

    #[test]
    fn reconstruction_error_propagates() {
        let seen = Seen::default();
        let err = app(&seen, &[])
            .run_from(["trainer", "train", "--cont", "maybe"])
            .unwrap_err();
        assert!(matches!(err, RecfigError::InvalidBoolean { .. }));
        assert_eq!(err.exit_code(), 2);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn handler_error_is_wrapped() {
        let cli = Cli::builder("trainer")
            .env_vars(Vec::new())
            .command("eval", "Evaluate", &model_config_schema(), |_| {
                Err("checkpoint unreadable".into())
            })
            .build()
            .unwrap();
        let err = cli.run_from(["trainer", "eval"]).unwrap_err();
        assert_eq!(err.to_string(), "Command 'eval' failed: checkpoint unreadable");
    }

    #[test]
    fn help_flag_is_clap_error() {
        let seen = Seen::default();
        let err = app(&seen, &[]).run_from(["trainer", "--help"]).unwrap_err();
        match err {
            RecfigError::Arguments(e) => {
                assert_eq!(e.kind(), clap::error::ErrorKind::DisplayHelp)
            }
            other => panic!("Expected Arguments, got {other:?}"),
        }
    }

    #[test]
    fn single_command_uses_top_level_flags() {
        let seen = Seen::default();
        let cli = Cli::single("foo", &nested_schema(), recorder(&seen))
            .env_vars(Vec::new())
            .positional_config(true)
            .build()
            .unwrap();

        let out = cli.run_from(["foo", "--nest.lr", "0.1", "--x", "4"]).unwrap();
        assert_eq!(out, Dispatch::Ran { command: "foo".into() });
        cli.run_from(["foo", r#"{"nest": {"lr": 1}, "x": 5}"#, "--x", "6"])
            .unwrap();

        let records = seen.borrow();
        assert_eq!(records[0].get("x"), Some(&Value::Int(4)));
        assert_eq!(records[0].get("y"), Some(&Value::Float(20.0)));
        assert_eq!(records[1].get("x"), Some(&Value::Int(6)));
    }

    #[test]
    fn missing_argument_exit_code() {
        let seen = Seen::default();
        let cli = Cli::single("foo", &nested_schema(), recorder(&seen))
            .env_vars(Vec::new())
            .build()
            .unwrap();
        let err = cli.run_from(["foo", "--x", "1"]).unwrap_err();
        assert!(matches!(err, RecfigError::MissingArgument(ref p) if p == "nest.lr"));
        assert_eq!(err.exit_code(), 3);
    }
}
