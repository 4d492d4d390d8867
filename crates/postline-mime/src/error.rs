//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid file extension for the content type table.
    #[error("Invalid file extension: {0:?}")]
    InvalidExtension(String),
}
