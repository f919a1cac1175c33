//! Open files and their read cursor.

use getset::{CopyGetters, Getters};
use std::rc::{Rc, Weak};

use super::chain::ClusterChain;
use super::directory::Directory;
use super::fat_error::FATError;
use super::layout::VolumeLayout;

/// Position of the next read in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct ReadCursor {
    /// Index of the current cluster in the chain
    cluster_index: usize,
    /// Index of the current sector in the current cluster
    sector_in_cluster: u8,
    /// Bytes left to read
    remaining: u64,
}

impl ReadCursor {
    fn new(size: u32) -> Self {
        Self {
            cluster_index: 0,
            sector_in_cluster: 0,
            remaining: size as u64,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.remaining == 0
    }

    /// Moves one sector forward after `len` bytes were read.
    fn advance(&mut self, len: usize, sectors_per_cluster: u8) {
        self.remaining = self.remaining.saturating_sub(len as u64);
        self.sector_in_cluster += 1;
        if self.sector_in_cluster >= sectors_per_cluster {
            self.sector_in_cluster = 0;
            self.cluster_index += 1;
        }
    }
}

/// A file opened for reading.
///
/// The cluster chain is resolved when the file is opened; reads only move the cursor.
#[derive(Debug, Getters, CopyGetters)]
pub struct File {
    #[getset(get = "pub")]
    name: String,
    directory: Weak<Directory>,
    #[getset(get = "pub")]
    chain: ClusterChain,
    /// Declared size in bytes
    #[getset(get_copy = "pub")]
    size: u32,
    #[getset(get_copy = "pub")]
    sectors_per_cluster: u8,
    #[getset(get_copy = "pub")]
    cursor: ReadCursor,
}

impl File {
    pub(super) fn new(
        name: String,
        directory: Weak<Directory>,
        chain: ClusterChain,
        size: u32,
        sectors_per_cluster: u8,
    ) -> Self {
        Self {
            name,
            directory,
            chain,
            size,
            sectors_per_cluster,
            cursor: ReadCursor::new(size),
        }
    }

    /// Returns the directory the file was opened from, if it is still alive.
    pub fn directory(&self) -> Option<Rc<Directory>> {
        self.directory.upgrade()
    }

    pub fn is_eof(&self) -> bool {
        self.cursor.is_eof()
    }

    /// Locates the next chunk to read.
    ///
    /// # Returns
    /// - `Ok(None)` at end of file
    /// - `Ok(Some((sector, len)))`: the absolute sector to read and the number of its bytes
    ///   belonging to the file
    ///
    /// # Errors
    /// - `FATError::TruncatedChain` if the chain ends before the declared size is reached
    pub(super) fn next_chunk(
        &self,
        layout: &VolumeLayout,
    ) -> Result<Option<(u64, usize)>, FATError> {
        if self.cursor.is_eof() {
            return Ok(None);
        }

        let cluster = self
            .chain
            .get(self.cursor.cluster_index)
            .ok_or_else(|| FATError::TruncatedChain(self.name.clone()))?;
        let sector =
            layout.sector_for_cluster(cluster)? + self.cursor.sector_in_cluster as u64;
        let len = self
            .cursor
            .remaining
            .min(layout.bytes_per_sector() as u64) as usize;

        Ok(Some((sector, len)))
    }

    pub(super) fn advance(&mut self, len: usize) {
        self.cursor.advance(len, self.sectors_per_cluster);
    }
}
