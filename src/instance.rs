//! Model instances and row hydration.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, Value as SqlValue, ValueRef};

use crate::codec;
use crate::error::{Error, Result};
use crate::schema::{Field, FieldType, Model};
use crate::value::Value;

/// One row of a model's table, held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    model: Arc<Model>,
    values: HashMap<String, Value>,
    deleted: bool,
}

impl Instance {
    pub(crate) fn new(model: Arc<Model>, values: HashMap<String, Value>) -> Self {
        Self {
            model,
            values,
            deleted: false,
        }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Current value of a field; `None` if the model has no such field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    /// Row identity used by update and delete.
    pub fn primary_key_value(&self) -> &Value {
        self.values
            .get(&self.model.primary_key().name)
            .unwrap_or(&Value::Null)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn set(&mut self, field: &str, value: Value) {
        self.values.insert(field.to_string(), value);
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }
}

/// Build an instance from a raw row whose values follow the model's field
/// order.
///
/// A blob stored under a field that is not itself `Blob` is an opaque payload
/// and is decoded. Text under `Timestamp`/`Date` fields is parsed back into
/// its temporal value.
pub fn hydrate(model: &Arc<Model>, row: Vec<Value>) -> Result<Instance> {
    let fields = model.fields();
    if row.len() != fields.len() {
        return Err(Error::RowShape {
            model: model.name().to_string(),
            expected: fields.len(),
            found: row.len(),
        });
    }

    let values = fields
        .iter()
        .zip(row)
        .map(|(field, raw)| Ok((field.name.clone(), decode_column(field, raw)?)))
        .collect::<Result<HashMap<_, _>>>()?;
    Ok(Instance::new(Arc::clone(model), values))
}

/// Value a field holds after `stored` has gone through the store.
pub(crate) fn normalize(field: &Field, stored: &SqlValue) -> Result<Value> {
    decode_column(field, Value::from_column(stored.into()))
}

pub(crate) fn decode_column(field: &Field, raw: Value) -> Result<Value> {
    match (field.field_type, raw) {
        (FieldType::Blob, raw) => Ok(raw),
        (_, Value::Blob(bytes)) => Ok(Value::Opaque(codec::decode(&bytes)?)),
        (FieldType::Timestamp, Value::Text(text)) => {
            parse_temporal::<NaiveDateTime>(field, &text).map(Value::Timestamp)
        }
        (FieldType::Date, Value::Text(text)) => {
            parse_temporal::<NaiveDate>(field, &text).map(Value::Date)
        }
        (_, raw) => Ok(raw),
    }
}

fn parse_temporal<T: FromSql>(field: &Field, text: &str) -> Result<T> {
    T::column_result(ValueRef::Text(text.as_bytes())).map_err(|e| Error::Conversion {
        field: field.name.clone(),
        reason: e.to_string(),
    })
}
