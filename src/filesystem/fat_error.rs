//! Error types for FAT volume decoding.
//!
//! This module defines errors that can occur while parsing and validating the boot sector,
//! walking cluster chains, listing directories and reading files.

use thiserror::Error;

use crate::storage::storage_error::StorageError;

/// Errors that can occur while decoding a FAT volume.
#[derive(Error, Debug)]
pub enum FATError {
    /// The first three bytes of a FAT volume must contain a valid x86 jump instruction.
    #[error("Invalid jump instruction `{0}`")]
    InvalidJmp(String),

    /// Bytes per sector must be 512, 1024, 2048 or 4096.
    #[error("Invalid count of bytes per sector: `{0}`. Legal values: 512, 1024, 2048 or 4096")]
    InvalidBytesPerSec(u16),

    /// Sectors per cluster must be a power of 2: 1, 2, 4, 8, 16, 32, 64, or 128.
    #[error(
        "Invalid number of sector per cluster: `{0}`. Legal values: 1, 2, 4, 8, 16, 32, 64, 128"
    )]
    InvalidSecPerClus(u8),

    /// Total cluster size (bytes per sector × sectors per cluster) must not exceed 32 KiB.
    #[error("Invalid cluster size: `{0}`. Any value greater than 32K is invalid.")]
    InvalidClusSz(u32),

    /// The count of reserved sectors must be greater than 0.
    #[error("Invalid count of reserved sectors: `{0}`. Any value greater than 0 is valid.")]
    InvalidRsvdSecCnt(u16),

    /// The count of root directory entries does not match the FAT type.
    #[error("Invalid count of directory entries in the root directory: `{0}`")]
    InvalidRootEntCnt(String),

    /// The total sector count must be valid for the volume size.
    #[error("Invalid total count of sectors on the volume: `{0}`")]
    InvalidTotSec(String),

    /// The FAT size in sectors must be valid and consistent with the volume layout.
    #[error("Invalid FAT size:`{0}`")]
    InvalidFatSz(String),

    /// The root directory's first cluster number must be at least 2.
    #[error(
        "Invalid cluster number of the first cluster of the root directory: `{0}`. This value should be at least 2."
    )]
    InvalidRootClus(u32),

    /// The boot sector signature must be 0x55AA.
    #[error("Invalid BPB signature: `{0}`. Expected signature: 0x55AA")]
    InvalidSignature(String),

    /// The boot sector describes a geometry the decoder cannot work with.
    #[error("Implausible volume geometry: {0}")]
    InvalidGeometry(String),

    /// Clusters 0 and 1 are reserved and hold no data.
    #[error("Invalid cluster number: `{0}`")]
    InvalidClusterError(u32),

    /// A chain points to a free, reserved or out-of-range cluster.
    #[error("Cluster {cluster} points to invalid cluster `{next}`")]
    InvalidClusterInChain { cluster: u32, next: u32 },

    /// A chain runs into a cluster marked bad.
    #[error("Cluster {0} is followed by a bad-cluster marker")]
    BadClusterInChain(u32),

    /// A chain is longer than the volume allows, which usually means it loops.
    #[error("Cluster chain starting at {first} exceeds {limit} clusters")]
    ChainTooLong { first: u32, limit: u32 },

    /// A file's chain holds fewer clusters than its size requires.
    #[error("Cluster chain of `{0}` ends before the end of the file")]
    TruncatedChain(String),

    /// The entry is not a directory.
    #[error("Not a directory: `{0}`")]
    NotADirectory(String),

    /// The entry is not a regular file.
    #[error("Not a file: `{0}`")]
    NotAFile(String),

    /// The file was not found
    #[error("File not found: `{0}`")]
    FileNotFound(String),

    /// Operation declared by the volume interface without an implementation.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Underlying storage errors.
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// Parsing error occured during structure initialization
    #[error("BinRead Error: `{0}`")]
    BinReadError(binread::Error),
}

/// Converts storage errors into FATError.
impl From<StorageError> for FATError {
    fn from(err: StorageError) -> Self {
        FATError::Storage(err)
    }
}

/// Converts BinRead errors into FATError.
impl From<binread::Error> for FATError {
    fn from(err: binread::Error) -> Self {
        FATError::BinReadError(err)
    }
}
