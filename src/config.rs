//! Connection target configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// SQLite engine configuration.
///
/// Exactly one storage mode is active once resolved: when `memory` is set the
/// path is ignored, otherwise `path` must name the database file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the SQLite database file, relative or absolute
    pub path: Option<PathBuf>,
    /// Keep the database in memory only
    pub memory: bool,
}

/// Resolved connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    Memory,
}

impl EngineConfig {
    /// Config for a file-backed database
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            memory: false,
        }
    }

    /// Config for a transient in-memory database
    pub fn memory() -> Self {
        Self {
            path: None,
            memory: true,
        }
    }

    /// Resolve the target, making file paths absolute.
    pub fn location(&self) -> Result<Location> {
        if self.memory {
            return Ok(Location::Memory);
        }
        match self.path.as_deref() {
            None => Err(Error::InvalidConfig(
                "either a database path or memory mode is required".to_string(),
            )),
            Some(path) if path.as_os_str().is_empty() => Err(Error::InvalidConfig(
                "database path is empty".to_string(),
            )),
            Some(path) => Ok(Location::File(absolute(path)?)),
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| {
        Error::InvalidConfig(format!("cannot resolve {}: {}", path.display(), e))
    })
}

impl Location {
    /// Name handed to the driver and used in log and error messages.
    pub fn describe(&self) -> String {
        match self {
            Location::File(path) => path.display().to_string(),
            Location::Memory => ":memory:".to_string(),
        }
    }
}
