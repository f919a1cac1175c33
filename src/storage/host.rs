//! Host storage boundary.
//!
//! The FAT decoder never touches files directly: it asks a [`HostStorage`] for sectors.
//! [`ImageStorage`] implements the boundary for anything seekable, which covers disk
//! image files as well as in-memory buffers.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use super::storage_error::StorageError;
use crate::utils;

/// Storage holding the raw sectors of a volume.
pub trait HostStorage {
    /// Reads `size` bytes starting at byte offset `sector * size`.
    fn read_sector(&mut self, sector: u64, size: usize) -> Result<Vec<u8>, StorageError>;

    /// Writes a sector back to the storage.
    ///
    /// Write support is declared by the boundary but the decoder never writes.
    fn write_sector(&mut self, sector: u64, _data: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::NotImplemented(format!(
            "writing sector {sector}"
        )))
    }

    /// Releases the underlying handle. Later reads fail with [`StorageError::Closed`].
    fn close(&mut self) -> Result<(), StorageError>;
}

/// Seekable disk image used as host storage.
pub struct ImageStorage<T: Read + Seek> {
    inner: Option<T>,
}

impl ImageStorage<File> {
    /// Opens a disk image file in read-only mode.
    ///
    /// # Errors
    /// - Returns `StorageError::Other` if the file cannot be opened
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<T: Read + Seek> ImageStorage<T> {
    pub fn new(inner: T) -> Self {
        Self { inner: Some(inner) }
    }

    /// Gives the underlying reader back, unless the storage was closed.
    pub fn into_inner(self) -> Option<T> {
        self.inner
    }
}

impl<T: Read + Seek> HostStorage for ImageStorage<T> {
    fn read_sector(&mut self, sector: u64, size: usize) -> Result<Vec<u8>, StorageError> {
        let reader = self.inner.as_mut().ok_or(StorageError::Closed)?;

        let mut buf = Vec::with_capacity(size);
        utils::read_sector(reader, sector, size, &mut buf)
            .map_err(|source| StorageError::Io { sector, source })?;

        Ok(buf)
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.inner = None;
        Ok(())
    }
}
