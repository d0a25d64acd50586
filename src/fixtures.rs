#[cfg(test)]
pub mod test {
    use std::sync::Arc;

    use crate::function::FunctionRegistry;
    use crate::schema::{FieldSpec, RecordSchema};
    use crate::types::{FieldType, PrimitiveKind};
    use crate::value::{Mapping, Value};

    /// `Foo { a: int, b: int }`, both required.
    pub fn foo_schema() -> Arc<RecordSchema> {
        RecordSchema::builder("Foo")
            .field(FieldSpec::new("a", FieldType::int()))
            .field(FieldSpec::new("b", FieldType::int()))
            .build()
            .unwrap()
    }

    /// `Bar { x: Sequence[float], yy: str = "lol" }`.
    pub fn bar_schema() -> Arc<RecordSchema> {
        RecordSchema::builder("Bar")
            .field(FieldSpec::new("x", FieldType::sequence(FieldType::float())))
            .field(FieldSpec::new("yy", FieldType::string()).default("lol"))
            .build()
            .unwrap()
    }

    /// Optional records, an untyped mapping and a typed one.
    pub fn foobar_schema() -> Arc<RecordSchema> {
        RecordSchema::builder("Foobar")
            .field(
                FieldSpec::new("dd", FieldType::any_mapping())
                    .default_with(|| Value::Mapping(Mapping::new())),
            )
            .field(FieldSpec::new("primitive", FieldType::optional(FieldType::int())).default(3))
            .field(
                FieldSpec::new("foo", FieldType::optional(FieldType::record(&foo_schema())))
                    .default(Value::None),
            )
            .field(FieldSpec::new(
                "z",
                FieldType::optional(FieldType::mapping(PrimitiveKind::Int, FieldType::int())),
            ))
            .field(FieldSpec::new(
                "bar",
                FieldType::optional(FieldType::record(&bar_schema())),
            ))
            .build()
            .unwrap()
    }

    pub fn model_config_schema() -> Arc<RecordSchema> {
        RecordSchema::builder("ModelConfig")
            .field(
                FieldSpec::new("n_layers", FieldType::int())
                    .default(10)
                    .help("number of layers for the model"),
            )
            .field(
                FieldSpec::new("checkpoint_path", FieldType::optional(FieldType::string()))
                    .short("-chkpt")
                    .help("checkpoint to resume from"),
            )
            .build()
            .unwrap()
    }

    /// A training command's arguments: one nested record, every scalar kind,
    /// a function reference and a list.
    pub fn train_args_schema() -> Arc<RecordSchema> {
        RecordSchema::builder("TrainArgs")
            .field(
                FieldSpec::new("model_config", FieldType::record(&model_config_schema()))
                    .help("model configuration"),
            )
            .field(
                FieldSpec::new("lr", FieldType::float())
                    .default(0.01)
                    .env("TRAIN_LR")
                    .help("learning rate"),
            )
            .field(
                FieldSpec::new("name", FieldType::string())
                    .default("example")
                    .short("n"),
            )
            .field(FieldSpec::new("lr_step_fn", FieldType::FunctionRef).default("schedules.identity"))
            .field(
                FieldSpec::new("num_workers", FieldType::int())
                    .default(-1)
                    .short("w"),
            )
            .field(
                FieldSpec::new("cont", FieldType::bool())
                    .default(false)
                    .help("continue from checkpoint"),
            )
            .field(
                FieldSpec::new("tags", FieldType::sequence(FieldType::string()))
                    .default_with(|| Value::Sequence(Vec::new())),
            )
            .build()
            .unwrap()
    }

    /// `FooArgs { nest: Nested { lr: float, name: str = "test" }, x: int, y: float = 20 }`.
    pub fn nested_schema() -> Arc<RecordSchema> {
        let nested = RecordSchema::builder("Nested")
            .field(FieldSpec::new("lr", FieldType::float()))
            .field(FieldSpec::new("name", FieldType::string()).default("test"))
            .build()
            .unwrap();
        RecordSchema::builder("FooArgs")
            .field(FieldSpec::new("nest", FieldType::record(&nested)))
            .field(FieldSpec::new("x", FieldType::int()))
            .field(FieldSpec::new("y", FieldType::float()).default(20))
            .build()
            .unwrap()
    }

    /// `schedules.identity(step, lr)` returns `lr`.
    pub fn test_functions() -> FunctionRegistry {
        FunctionRegistry::new().register("schedules", "identity", |args| {
            args.get(1).cloned().unwrap_or(Value::None)
        })
    }

    #[test]
    fn fixtures_build() {
        assert_eq!(train_args_schema().fields().len(), 7);
        assert_eq!(foobar_schema().name(), "Foobar");
        assert!(nested_schema().field("nest").unwrap().declared_type().record_schema().is_some());
    }
}
