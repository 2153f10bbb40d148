//! Runtime configuration of the query layer.

use crate::error::{Result, SqlStreamError};
use crate::naming::NamingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How blob parameters are handed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobMode {
    /// Pass the bytes through the statement's binary setter
    #[default]
    Native,
    /// Stream the bytes with their length announced up front
    LengthPrefixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlStreamsConfig {
    pub naming: NamingConfig,
    /// Fail instead of skipping selected or ordered fields without a column
    pub strict_column_resolution: bool,
    /// Close the prepared statement once the cursor is exhausted
    pub auto_close: bool,
    pub blob_mode: BlobMode,
}

impl Default for SqlStreamsConfig {
    fn default() -> Self {
        Self {
            naming: NamingConfig::default(),
            strict_column_resolution: false,
            auto_close: true,
            blob_mode: BlobMode::Native,
        }
    }
}

impl SqlStreamsConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SqlStreamError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SqlStreamError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }
}
