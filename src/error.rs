//! Error types for inventory collection.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    /// A classification rule needs a key the node does not carry
    #[error("Missing required field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Numeric size/frequency token that cannot be converted
    #[error("Malformed value for '{field}': {value}")]
    MalformedSizeOrUnit { field: String, value: String },

    #[error("Required source '{0}' not found")]
    MissingSource(String),

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {name}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization failed: {0}")]
    Serialize(String),
}

pub type Result<T> = std::result::Result<T, InventoryError>;

impl InventoryError {
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn malformed(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MalformedSizeOrUnit {
            field: field.into(),
            value: value.into(),
        }
    }
}
