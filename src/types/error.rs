//! Error types
//!
//! Only document loading can fail. Summarization degrades to absent values
//! instead of erroring.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OasError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Path traversal rejected: {0}")]
    PathTraversal(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed to read document: {0}")]
    ReadError(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid YAML: {0}")]
    InvalidYaml(String),

    #[error("Invalid OpenAPI document: {0}")]
    InvalidOpenApi(String),

    #[error("Unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),
}

pub type OasResult<T> = Result<T, OasError>;
