//! Error types for sector-level storage access.

use std::io;

/// Represents errors that can occur while reading sectors from the host storage.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// A sector could not be read from the backing image.
    #[error("Failed to read sector {sector}: {source}")]
    Io { sector: u64, source: io::Error },
    /// Sectors must be at least one byte long.
    #[error("Invalid sector size: `{0}`")]
    InvalidSectorSize(usize),
    /// The storage was closed and can no longer be read.
    #[error("The storage has been closed")]
    Closed,
    /// The operation is declared by the storage boundary but has no implementation.
    #[error("Not implemented: {0}")]
    NotImplemented(String),
    /// Any other I/O error (opening or closing the image).
    #[error("I/O error: {0}")]
    Other(io::Error),
}

/// Converts standard I/O errors into StorageError.
impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Other(err)
    }
}
