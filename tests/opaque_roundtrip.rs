use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use rust_model_sqlite::{Engine, EngineConfig, Field, FieldType, Model, Params, SqliteEngine, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    labels: Vec<String>,
    counts: BTreeMap<String, i64>,
    weights: Vec<f64>,
    flag: bool,
}

fn model() -> Arc<Model> {
    Model::builder("Record")
        .with_field(Field::new("id", FieldType::Integer).primary_key().auto())
        .with_field(Field::new("payload", FieldType::Opaque))
        .build()
        .unwrap()
}

fn finite_f64() -> impl Strategy<Value = f64> {
    use prop::num::f64::{NEGATIVE, NORMAL, POSITIVE, SUBNORMAL, ZERO};
    POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO
}

fn payload() -> impl Strategy<Value = Payload> {
    (
        prop::collection::vec(".*", 0..4),
        prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..4),
        prop::collection::vec(finite_f64(), 0..4),
        any::<bool>(),
    )
        .prop_map(|(labels, counts, weights, flag)| Payload {
            labels,
            counts,
            weights,
            flag,
        })
}

proptest! {
    #[test]
    fn opaque_values_survive_create_update_and_find(first in payload(), second in payload()) {
        let engine = SqliteEngine::open(EngineConfig::memory()).unwrap();
        let model = model();
        engine.bind(&model).unwrap();

        let mut record = engine
            .create(&model, &Params::new().with_value("payload", Value::opaque(&first).unwrap()))
            .unwrap();
        let id = record.primary_key_value().clone();

        let found = engine.find_one(&model, &Params::new().with_value("id", id.clone())).unwrap().unwrap();
        let decoded: Payload = found.get("payload").unwrap().decode_opaque().unwrap().unwrap();
        prop_assert_eq!(&decoded, &first);
        for (read, written) in decoded.weights.iter().zip(&first.weights) {
            prop_assert_eq!(read.to_bits(), written.to_bits());
        }

        engine.update(&mut record, "payload", Value::opaque(&second).unwrap()).unwrap();
        let found = engine.find_one(&model, &Params::new().with_value("id", id)).unwrap().unwrap();
        let decoded: Payload = found.get("payload").unwrap().decode_opaque().unwrap().unwrap();
        prop_assert_eq!(decoded, second);
    }
}
