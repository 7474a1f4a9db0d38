//! Report persistence and image blob storage.
//!
//! Two stores with separate ownership: the report store holds one record per
//! diagnosis keyed by report id; the blob store holds the view images under
//! a per-report namespace. Deleting a report cascade-deletes its namespace.

mod blobs;
mod reports;

pub use blobs::BlobStore;
pub use reports::ReportStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid blob key '{0}'")]
    InvalidKey(String),
}
