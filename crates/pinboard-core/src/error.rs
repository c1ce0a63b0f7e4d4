//! Error types shared by the document engine.

use crate::entities::EntityRef;
use thiserror::Error;

/// Errors produced by the entity store, the routing engine, commands and
/// the persistence layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A relationship between entities would be (or is) broken, e.g. a
    /// connection whose endpoint no longer exists.
    #[error("Structural error: {0}")]
    Structural(String),
    /// A connection between the same pair of entities already exists.
    #[error("Connection between {0} and {1} already exists")]
    Duplicate(EntityRef, EntityRef),
    /// An entity could not be converted to its document form.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A document is missing required fields or has the wrong types.
    #[error("Validation error: {0}")]
    Validation(String),
    /// File read/write failure.
    #[error("IO error: {0}")]
    Io(String),
    /// Malformed embedded image data.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Shorthand for a missing entity.
    pub fn missing(entity: EntityRef) -> Self {
        Error::Structural(format!("{} does not exist", entity))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Decode(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
