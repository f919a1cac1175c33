//! Sector reader with a single-slot cache.
//!
//! FAT lookups tend to hit the same FAT sector many times in a row while a chain is
//! walked, so the most recently read sector is remembered. Only one sector is kept:
//! there is no eviction policy beyond replacing the slot.

use log::trace;

use super::host::HostStorage;
use super::storage_error::StorageError;

/// The last sector read from the storage.
struct CachedSector {
    number: u64,
    data: Vec<u8>,
}

/// Reads fixed-size sectors from a [`HostStorage`] by absolute sector number.
pub struct SectorSource<S: HostStorage> {
    storage: S,
    cache: Option<CachedSector>,
}

impl<S: HostStorage> SectorSource<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            cache: None,
        }
    }

    /// Reads the sector `number` of `size` bytes.
    ///
    /// A repeated read of the same sector with the same size is served from the cache.
    /// The returned buffer is always an independent copy.
    ///
    /// # Errors
    /// - `StorageError::InvalidSectorSize` if `size` is 0
    /// - `StorageError::Io` if the storage fails or returns a short sector
    pub fn read_sector(&mut self, number: u64, size: usize) -> Result<Vec<u8>, StorageError> {
        if size == 0 {
            return Err(StorageError::InvalidSectorSize(size));
        }

        if let Some(cached) = &self.cache {
            if cached.number == number && cached.data.len() == size {
                trace!("Sector {number} served from cache");
                return Ok(cached.data.clone());
            }
        }

        trace!("Reading sector {number} ({size} bytes)");
        let data = self.storage.read_sector(number, size)?;
        if data.len() != size {
            return Err(StorageError::Io {
                sector: number,
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("expected {size} bytes, got {}", data.len()),
                ),
            });
        }

        self.cache = Some(CachedSector {
            number,
            data: data.clone(),
        });

        Ok(data)
    }

    /// Drops the cached sector and closes the storage.
    pub fn close(&mut self) -> Result<(), StorageError> {
        self.cache = None;
        self.storage.close()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
