//! Storage abstraction for session documents.

mod autosave;
mod file;
mod memory;

pub use autosave::{AutoSaveManager, LAST_DOCUMENT_KEY};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Error;
use crate::session::{LoadReport, SessionDocument};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(message) => StorageError::Io(message),
            Error::Serialization(message) | Error::Validation(message) | Error::Decode(message) => {
                StorageError::Serialization(message)
            }
            other => StorageError::Other(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future returned by storage backends.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Backend that keeps session documents under string ids.
///
/// The methods are async-shaped so a backend may defer its I/O; the
/// bundled backends complete on first poll.
pub trait Storage: Send + Sync {
    /// Save a document.
    fn save(&self, id: &str, document: &SessionDocument) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a document, with the report of entities that failed to parse.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<(SessionDocument, LoadReport)>>;

    /// Delete a document. Deleting a missing id is not an error.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all document ids.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
