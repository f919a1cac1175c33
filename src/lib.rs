//!
//! fat_recovery: A library and console for browsing FAT12/16/32 volumes from raw sectors.
//!
//! This crate provides tools for:
//! - Parsing and validating the boot sector of a FAT volume
//! - Listing directories, long file names and deleted entries included
//! - Reading file contents sector by sector, without the host filesystem driver
//! - Printing the volume layout and directory tree
//!
//! The library can be used both through the `main` console and as a Rust library.
//!
//! # Re-exports
//! - [`FATVol`]: FAT volume abstraction
//! - [`ImageStorage`]: Host storage backed by a disk image or an in-memory buffer

pub mod commands;
pub mod filesystem;
pub mod storage;
pub mod traits;
pub mod utils;

/// FAT volume abstraction (see [`filesystem::fat::FATVol`]).
pub use crate::filesystem::fat::FATVol;
/// Host storage backed by a seekable image (see [`storage::host::ImageStorage`]).
pub use crate::storage::host::ImageStorage;
