//! Model schema descriptors.
//!
//! A [`Model`] describes one table: its name, an optional alias and the
//! ordered field descriptors. The field order is the column order used by
//! every SELECT and by hydration.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;

/// Declared field type, resolved to a column type when the field is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Real,
    Text,
    Blob,
    Timestamp,
    Date,
    /// Any structured value with no native column type
    Opaque,
}

/// Fixed mapping from field type to SQL column type.
pub const SQL_TYPES: [(FieldType, &str); 6] = [
    (FieldType::Integer, "INTEGER"),
    (FieldType::Real, "REAL"),
    (FieldType::Text, "TEXT"),
    (FieldType::Blob, "BLOB"),
    (FieldType::Timestamp, "TIMESTAMP"),
    (FieldType::Date, "DATE"),
];

/// Column type for anything missing from [`SQL_TYPES`].
pub const FALLBACK_SQL_TYPE: &str = "BLOB";

impl FieldType {
    pub fn sql_type(self) -> &'static str {
        SQL_TYPES
            .iter()
            .find(|(field_type, _)| *field_type == self)
            .map_or(FALLBACK_SQL_TYPE, |&(_, sql)| sql)
    }
}

/// Metadata for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub primary_key: bool,
    /// Value assigned by the store on insert (auto-increment identity)
    pub auto: bool,
    pub default: Option<Value>,
}

impl Field {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            primary_key: false,
            auto: false,
            default: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Column definition used in CREATE TABLE.
    pub fn column_definition(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.field_type.sql_type());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.field_type == FieldType::Integer {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if !self.has_default() {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

/// A validated model schema. Build one with [`Model::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    alias: Option<String>,
    fields: Vec<Field>,
    primary_key: usize,
}

impl Model {
    pub fn builder(name: &str) -> ModelBuilder {
        ModelBuilder {
            name: name.to_string(),
            alias: None,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit alias, or the lowercased model name.
    pub fn table_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Result<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| Error::UnknownField {
                model: self.name.clone(),
                field: name.to_string(),
            })
    }

    pub fn primary_key(&self) -> &Field {
        &self.fields[self.primary_key]
    }
}

#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name: String,
    alias: Option<String>,
    fields: Vec<Field>,
}

impl ModelBuilder {
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Validate the definition: identifiers only, unique field names and
    /// exactly one primary key.
    pub fn build(self) -> Result<Arc<Model>> {
        let invalid = |reason: String| Error::Schema {
            model: self.name.clone(),
            reason,
        };

        if !is_identifier(&self.name) {
            return Err(invalid(format!("{:?} is not a valid identifier", self.name)));
        }
        if let Some(alias) = &self.alias {
            if !is_identifier(alias) {
                return Err(invalid(format!("alias {:?} is not a valid identifier", alias)));
            }
        }
        if self.fields.is_empty() {
            return Err(invalid("no fields declared".to_string()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !is_identifier(&field.name) {
                return Err(invalid(format!(
                    "field {:?} is not a valid identifier",
                    field.name
                )));
            }
            if RESERVED_NAMES.contains(&field.name.to_ascii_lowercase().as_str()) {
                return Err(invalid(format!(
                    "field {} shadows the implicit row identity",
                    field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(invalid(format!("field {} declared twice", field.name)));
            }
        }

        let keys: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.primary_key)
            .map(|(i, _)| i)
            .collect();
        let primary_key = match keys.as_slice() {
            [index] => *index,
            [] => return Err(invalid("no primary key".to_string())),
            _ => return Err(invalid("more than one primary key".to_string())),
        };

        Ok(Arc::new(Model {
            name: self.name,
            alias: self.alias,
            fields: self.fields,
            primary_key,
        }))
    }
}

/// SQLite's implicit row identity names.
const RESERVED_NAMES: [&str; 3] = ["rowid", "oid", "_rowid_"];

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
