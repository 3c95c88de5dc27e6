//! Error types for the editor

use crate::document::IntegrityError;
use thiserror::Error;

/// Failure converting a document to or from its stored JSON form
#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid document: {0}")]
    Integrity(#[from] IntegrityError),
}
