//! Schemas and schedule functions of the demo trainer.

use std::sync::Arc;

use recfig::{FieldSpec, FieldType, FunctionRegistry, Mapping, RecfigError, RecordSchema, Value};

pub fn model_config() -> Result<Arc<RecordSchema>, RecfigError> {
    RecordSchema::builder("ModelConfig")
        .field(
            FieldSpec::new("n_layers", FieldType::int())
                .default(10)
                .help("number of layers for the model"),
        )
        .field(
            FieldSpec::new("checkpoint_path", FieldType::optional(FieldType::string()))
                .short("-chkpt")
                .help("path of the checkpoint"),
        )
        .build()
}

pub fn train_args(model: &Arc<RecordSchema>) -> Result<Arc<RecordSchema>, RecfigError> {
    RecordSchema::builder("TrainArgs")
        .field(
            FieldSpec::new("model_config", FieldType::record(model))
                .default_with(|| Value::Mapping(Mapping::new())),
        )
        .field(
            FieldSpec::new("lr", FieldType::float())
                .default(0.01)
                .env("TRAIN_LR")
                .help("base learning rate"),
        )
        .field(
            FieldSpec::new("name", FieldType::string())
                .default("example")
                .short("n")
                .help("name of experiment"),
        )
        .field(
            FieldSpec::new("lr_step_fn", FieldType::FunctionRef)
                .default("schedules.cosine_warmup")
                .help("learning-rate schedule"),
        )
        .field(FieldSpec::new("num_workers", FieldType::int()).default(-1))
        .field(
            FieldSpec::new("cont", FieldType::bool())
                .default(false)
                .help("continue training from last known iter?"),
        )
        .field(
            FieldSpec::new("config_root_dir", FieldType::string())
                .default("./configs")
                .help("root directory where configuration is serialized to"),
        )
        .build()
}

pub fn eval_args(model: &Arc<RecordSchema>) -> Result<Arc<RecordSchema>, RecfigError> {
    RecordSchema::builder("EvalArgs")
        .field(
            FieldSpec::new("model_config", FieldType::record(model))
                .default_with(|| Value::Mapping(Mapping::new())),
        )
        .field(FieldSpec::new("num_workers", FieldType::int()).default(-1))
        .build()
}

const WARMUP_STEPS: f64 = 100.0;
const TOTAL_STEPS: f64 = 1000.0;

fn step_and_lr(args: &[Value]) -> (f64, f64) {
    let step = args.first().and_then(Value::as_float).unwrap_or(0.0);
    let lr = args.get(1).and_then(Value::as_float).unwrap_or(0.0);
    (step, lr)
}

pub fn schedules() -> FunctionRegistry {
    FunctionRegistry::new()
        .register("schedules", "identity", |args| Value::Float(step_and_lr(args).1))
        .register("schedules", "cosine_warmup", |args| {
            let (step, lr) = step_and_lr(args);
            if step < WARMUP_STEPS {
                return Value::Float((step + 1.0) / WARMUP_STEPS * lr);
            }
            let t = ((step - WARMUP_STEPS) / (TOTAL_STEPS - WARMUP_STEPS)).clamp(0.0, 1.0);
            Value::Float(lr * 0.5 * (1.0 + (std::f64::consts::PI * t).cos()))
        })
}
