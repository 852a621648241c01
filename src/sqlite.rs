use std::sync::Arc;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::config::{EngineConfig, Location};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::instance::{self, hydrate, Instance};
use crate::query;
use crate::schema::Model;
use crate::value::{Params, Value};

/// SQLite-backed engine, stored in a file or in memory.
///
/// The engine starts closed; [`SqliteEngine::init`] opens the connection and
/// [`Engine::close`] or [`Engine::destroy`] releases it. The connection is
/// owned exclusively, so concurrent callers need their own synchronization.
pub struct SqliteEngine {
    config: EngineConfig,
    location: Option<Location>,
    connection: Option<Connection>,
}

impl SqliteEngine {
    /// Create a closed engine with the given config
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            location: None,
            connection: None,
        }
    }

    /// Create and initialize in one step
    pub fn open(config: EngineConfig) -> Result<Self> {
        let mut engine = Self::new(config);
        engine.init()?;
        Ok(engine)
    }

    /// Open the connection and make sure the migration table exists.
    pub fn init(&mut self) -> Result<()> {
        let location = self.config.location()?;
        let target = location.describe();
        let connection = match &location {
            Location::File(path) => Connection::open(path),
            Location::Memory => Connection::open_in_memory(),
        }
        .map_err(|source| Error::Connection {
            location: target.clone(),
            source,
        })?;
        info!(location = %target, "opened sqlite database");

        self.connection = Some(connection);
        self.location = Some(location);
        self.ensure_migration_table()
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Resolved target, once initialized
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or(Error::Closed)
    }

    fn execute(&self, table: &str, sql: &str, params: &[SqlValue]) -> Result<usize> {
        let connection = self.connection()?;
        debug!(table, sql, "executing statement");
        Ok(connection.execute(sql, params_from_iter(params))?)
    }

    /// First row of a query as raw column values; further rows are ignored.
    fn query_first(
        &self,
        table: &str,
        sql: &str,
        params: &[SqlValue],
        width: usize,
    ) -> Result<Option<Vec<Value>>> {
        let connection = self.connection()?;
        debug!(table, sql, "executing query");
        let row = connection
            .query_row(sql, params_from_iter(params), |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(Value::from_column))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .optional()?;
        Ok(row)
    }
}

impl Engine for SqliteEngine {
    fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close().map_err(|(_, e)| Error::Sqlite(e))?;
            info!(
                location = %self.location.as_ref().map(Location::describe).unwrap_or_default(),
                "closed sqlite database"
            );
        }
        Ok(())
    }

    fn destroy(mut self) -> Result<()> {
        self.close()?;
        if let Some(Location::File(path)) = self.location.take() {
            std::fs::remove_file(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "removed sqlite database file");
        }
        Ok(())
    }

    fn ensure_migration_table(&self) -> Result<()> {
        self.execute(query::MIGRATION_TABLE, query::CREATE_MIGRATION_TABLE, &[])?;
        Ok(())
    }

    fn ensure_table_for(&self, model: &Model) -> Result<()> {
        self.execute(&model.table_name(), &query::create_table(model), &[])?;
        Ok(())
    }

    fn get_saved_schema_for(&self, _model: &Model) -> Result<Option<Model>> {
        Ok(None)
    }

    fn find_one(&self, model: &Arc<Model>, filters: &Params) -> Result<Option<Instance>> {
        let mut names = Vec::with_capacity(filters.len());
        let mut values = Vec::with_capacity(filters.len());
        for (name, value) in filters.iter() {
            names.push(model.field(name)?.name.as_str());
            values.push(value.to_sql()?);
        }

        let table = model.table_name();
        let sql = query::select(model, &names);
        self.query_first(&table, &sql, &values, model.fields().len())?
            .map(|raw| hydrate(model, raw))
            .transpose()
    }

    fn create(&self, model: &Arc<Model>, fields: &Params) -> Result<Instance> {
        for (name, _) in fields.iter() {
            model.field(name)?;
        }

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for field in model.fields() {
            let value = match (fields.get(&field.name), &field.default) {
                (Some(value), _) => value,
                (None, Some(default)) if !field.auto => default,
                (None, _) => continue,
            };
            columns.push(field.name.as_str());
            values.push(value.to_sql()?);
        }

        let table = model.table_name();
        self.execute(&table, &query::insert(&table, &columns), &values)?;
        let identity = self.connection()?.last_insert_rowid();

        // Read the row back so column affinity conversions are reflected.
        let sql = query::select(model, &[query::ROWID]);
        let mut row = self
            .query_first(&table, &sql, &[SqlValue::Integer(identity)], model.fields().len())?
            .ok_or(Error::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
        for (slot, field) in row.iter_mut().zip(model.fields()) {
            if field.auto {
                *slot = Value::Integer(identity);
            }
        }
        hydrate(model, row)
    }

    fn update(&self, instance: &mut Instance, field: &str, value: Value) -> Result<()> {
        let model = Arc::clone(instance.model());
        if instance.is_deleted() {
            return Err(Error::Deleted {
                model: model.name().to_string(),
            });
        }

        let field = model.field(field)?;
        let primary = model.primary_key();
        let table = model.table_name();
        let bound = value.to_sql()?;
        let key = instance.primary_key_value().to_sql()?;
        self.execute(
            &table,
            &query::update(&table, &field.name, &primary.name),
            &[bound.clone(), key.clone()],
        )?;

        // Updating the key itself moves the row to the new key.
        let key = if field.primary_key { bound.clone() } else { key };
        let sql = query::select_column(&table, &field.name, &primary.name);
        let stored = match self.query_first(&table, &sql, &[key], 1)? {
            Some(mut raw) => instance::decode_column(field, raw.remove(0))?,
            None => instance::normalize(field, &bound)?,
        };
        instance.set(&field.name, stored);
        Ok(())
    }

    fn delete(&self, instance: &mut Instance) -> Result<()> {
        let model = Arc::clone(instance.model());
        if instance.is_deleted() {
            return Err(Error::Deleted {
                model: model.name().to_string(),
            });
        }

        let table = model.table_name();
        let key = instance.primary_key_value().to_sql()?;
        self.execute(
            &table,
            &query::delete(&table, &model.primary_key().name),
            &[key],
        )?;
        instance.mark_deleted();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType};

    fn note() -> Arc<Model> {
        Model::builder("Note")
            .with_field(Field::new("id", FieldType::Integer).primary_key().auto())
            .with_field(Field::new("body", FieldType::Text))
            .build()
            .unwrap()
    }

    #[test]
    fn starts_closed() {
        let engine = SqliteEngine::new(EngineConfig::memory());
        assert!(!engine.is_open());
        assert!(engine.location().is_none());
        assert!(matches!(engine.ensure_table_for(&note()), Err(Error::Closed)));
    }

    #[test]
    fn close_is_safe_to_repeat() {
        let mut engine = SqliteEngine::open(EngineConfig::memory()).unwrap();
        assert!(engine.is_open());
        engine.close().unwrap();
        engine.close().unwrap();
        assert!(matches!(
            engine.find_one(&note(), &Params::new()),
            Err(Error::Closed)
        ));
    }

    #[test]
    fn invalid_config_fails_at_init() {
        let mut engine = SqliteEngine::new(EngineConfig::default());
        assert!(matches!(engine.init(), Err(Error::InvalidConfig(_))));
        assert!(!engine.is_open());
    }

    #[test]
    fn unopenable_path_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("db.sqlite");
        let err = SqliteEngine::open(EngineConfig::file(path)).err().unwrap();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[test]
    fn init_creates_migration_table() {
        let engine = SqliteEngine::open(EngineConfig::memory()).unwrap();
        let count: i64 = engine
            .connection()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                [query::MIGRATION_TABLE],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
        engine.ensure_migration_table().unwrap();
    }

    #[test]
    fn bind_creates_table_without_saved_schema() {
        let engine = SqliteEngine::open(EngineConfig::memory()).unwrap();
        let model = note();
        assert!(engine.get_saved_schema_for(&model).unwrap().is_none());
        engine.bind(&model).unwrap();
        let created = engine
            .create(&model, &Params::new().with_value("body", "hi"))
            .unwrap();
        assert_eq!(created.get("id"), Some(&Value::Integer(1)));
    }

    #[test]
    fn ensure_table_leaves_schema_unchanged() {
        let engine = SqliteEngine::open(EngineConfig::memory()).unwrap();
        let model = note();
        let table_sql = || -> String {
            engine
                .connection()
                .unwrap()
                .query_row(
                    "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
                    [model.table_name()],
                    |row| row.get(0),
                )
                .unwrap()
        };

        engine.ensure_table_for(&model).unwrap();
        let before = table_sql();
        engine.ensure_table_for(&model).unwrap();
        engine.bind(&model).unwrap();
        assert_eq!(table_sql(), before);
        assert_eq!(before, query::create_table(&model).replacen(" IF NOT EXISTS", "", 1));
    }

    #[test]
    fn unknown_fields_are_rejected_before_sql() {
        let engine = SqliteEngine::open(EngineConfig::memory()).unwrap();
        let model = note();
        engine.ensure_table_for(&model).unwrap();

        let filters = Params::new().with_value("nope", 1);
        assert!(matches!(
            engine.find_one(&model, &filters),
            Err(Error::UnknownField { .. })
        ));
        assert!(matches!(
            engine.create(&model, &filters),
            Err(Error::UnknownField { .. })
        ));

        let mut instance = engine
            .create(&model, &Params::new().with_value("body", "x"))
            .unwrap();
        assert!(matches!(
            engine.update(&mut instance, "nope", Value::Null),
            Err(Error::UnknownField { .. })
        ));
    }
}
