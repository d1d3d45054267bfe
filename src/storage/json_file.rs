use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

use super::StorageError;

/// A serde value persisted as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileHandler {
    path: PathBuf,
}

impl JsonFileHandler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the value, or its default when the file does not exist yet
    pub fn load<T: DeserializeOwned + Default>(&self) -> Result<T, StorageError> {
        if !self.path.exists() {
            return Ok(T::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save<T: Serialize>(&self, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(value)?)?;
        Ok(())
    }
}
