//! SQLite engine adapter for schema-described models.
//!
//! # Intention
//!
//! - Translate model and field descriptors into SQLite DDL and DML.
//! - Hydrate result rows back into model instances, decoding opaque values.
//! - Encapsulate SQLite-specific logic, types, and error handling.
//!
//! # Architectural Boundaries
//!
//! - One table per model, one primary key per table.
//! - No joins, transactions, pooling or migrations; the migration table is
//!   created but never read.
//! - Only SQLite/database code belongs here.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod instance;
pub mod query;
pub mod schema;
pub mod sqlite;
pub mod value;

pub use config::{EngineConfig, Location};
pub use engine::Engine;
pub use error::{Error, Result};
pub use instance::{hydrate, Instance};
pub use schema::{Field, FieldType, Model, ModelBuilder};
pub use sqlite::SqliteEngine;
pub use value::{Params, Value};
