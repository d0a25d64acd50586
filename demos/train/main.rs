//! # recfig demo trainer
//!
//! A sample two-command CLI showing how a program declares its configuration
//! as record schemas and gets flags, help and JSON persistence from them.
//! Nothing is trained; the handlers print and save their arguments.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example train -- train --model_config.n_layers 4 --cont
//! cargo run --example train -- eval --chkpt runs/last.ckpt
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                  | How to exercise it                                                        |
//! |--------------------------|---------------------------------------------------------------------------|
//! | Defaults                 | `cargo run --example train -- train`                                      |
//! | Nested leaf flag         | `cargo run --example train -- train --model_config.n_layers 4`            |
//! | Short / long alias       | `cargo run --example train -- train -n exp1 --chkpt runs/last.ckpt`       |
//! | Nested shorthand         | `cargo run --example train -- train --model_config '{"n_layers": 2}'`     |
//! | Root shorthand from file | `cargo run --example train -- train --TrainArgs configs/example.json`     |
//! | Env default              | `TRAIN_LR=0.3 cargo run --example train -- train`                         |
//! | Bool toggle              | `cargo run --example train -- train --cont` or `--cont no`                |
//! | Function reference       | `cargo run --example train -- train --lr_step_fn schedules.identity`      |
//! | Logging                  | `RUST_LOG=recfig=debug cargo run --example train -- train`                |

mod config;

use std::path::PathBuf;

use recfig::{Cli, Recfig, RecfigError, Record, Value};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn train(args: Record) -> Result<(), recfig::HandlerError> {
    let recfig = Recfig::new();
    println!("train args:");
    println!("{}", recfig.to_json(&args)?);

    if let (Some(Value::Function(schedule)), Some(lr)) =
        (args.get("lr_step_fn"), args.get("lr").and_then(Value::as_float))
    {
        let first = schedule.call(&[Value::Int(0), Value::Float(lr)]);
        println!("\n{} at step 0: {first}", schedule.name());
    }

    let root = args
        .get("config_root_dir")
        .and_then(Value::as_str)
        .unwrap_or("./configs");
    let name = args.get("name").and_then(Value::as_str).unwrap_or("example");
    let out = PathBuf::from(root).join(format!("{name}.json"));

    println!("\nwriting config to: {}", out.display());
    recfig.write_json(&args, &out)?;
    Ok(())
}

fn eval(args: Record) -> Result<(), recfig::HandlerError> {
    println!("eval args:");
    println!("{}", Recfig::new().to_json(&args)?);
    Ok(())
}

fn build() -> Result<Cli, RecfigError> {
    let model = config::model_config()?;
    let train_schema = config::train_args(&model)?;
    let eval_schema = config::eval_args(&model)?;

    Cli::builder("train-demo")
        .about("recfig demo: a trainer whose flags come from its config schema")
        .functions(config::schedules())
        .command("train", "train a model", &train_schema, train)
        .command("eval", "evaluate a trained model", &eval_schema, eval)
        .build()
}

fn main() {
    init_tracing();
    match build() {
        Ok(cli) => cli.run(),
        Err(e) => {
            eprintln!("[ERROR]: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
