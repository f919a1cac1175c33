//! Decoding of FAT12, FAT16 and FAT32 volumes.
//!
//! This module provides:
//! - Boot sector parsing and the derived volume geometry
//! - FAT entry decoding and cluster chain traversal
//! - Directory listings with long file names
//! - Sector-by-sector file reads

pub mod bpb;
pub mod chain;
pub mod dir_entry;
pub mod directory;
pub mod fat;
pub mod fat_error;
pub mod fat_type;
pub mod file;
pub mod layout;
