//! Raw sector access to the medium holding a FAT volume.
//!
//! This module provides:
//! - The [`host::HostStorage`] boundary and its seekable-image implementation
//! - A [`sector_source::SectorSource`] adding a one-slot read cache on top of it
//! - The [`storage_error::StorageError`] type shared by both

pub mod host;
pub mod sector_source;
pub mod storage_error;
