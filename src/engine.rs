//! The engine contract implemented by storage backends.

use std::sync::Arc;

use crate::error::Result;
use crate::instance::Instance;
use crate::schema::Model;
use crate::value::{Params, Value};

/// CRUD primitives keyed on a model's field descriptors.
///
/// Implementations own their connection exclusively; callers issue requests
/// one at a time.
pub trait Engine {
    fn close(&mut self) -> Result<()>;

    /// Close and remove any persistent storage.
    fn destroy(self) -> Result<()>
    where
        Self: Sized;

    fn ensure_migration_table(&self) -> Result<()>;

    fn ensure_table_for(&self, model: &Model) -> Result<()>;

    /// Schema recorded by the last migration, if the backend tracks one.
    fn get_saved_schema_for(&self, model: &Model) -> Result<Option<Model>>;

    /// First row matching every `field = value` filter.
    fn find_one(&self, model: &Arc<Model>, filters: &Params) -> Result<Option<Instance>>;

    fn create(&self, model: &Arc<Model>, fields: &Params) -> Result<Instance>;

    fn update(&self, instance: &mut Instance, field: &str, value: Value) -> Result<()>;

    fn delete(&self, instance: &mut Instance) -> Result<()>;

    /// Prepare storage for a model. Without a saved schema to migrate from,
    /// the table is created.
    fn bind(&self, model: &Model) -> Result<()> {
        match self.get_saved_schema_for(model)? {
            Some(_) => Ok(()),
            None => self.ensure_table_for(model),
        }
    }
}
