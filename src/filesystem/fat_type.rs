//! Enum for the different FAT types (FAT12, FAT16, FAT32).
//!
//! This module defines the FATType enum, which is used to distinguish between FAT12, FAT16,
//! and FAT32 filesystems based on the number of data clusters. Each variant knows how its
//! FAT entries are laid out and which values terminate or poison a cluster chain.

use std::fmt;

use crate::utils::{u16_at, u32_at};

/// Highest cluster count of a FAT12 volume, plus one.
pub const FAT12_MAX_CLUSTERS: u32 = 4085;
/// Highest cluster count of a FAT16 volume, plus one.
pub const FAT16_MAX_CLUSTERS: u32 = 65525;

/// Represents the different types of FAT filesystems.
///
/// # Values
/// - `FAT12`: 12-bit File Allocation Table entries, packed 1.5 bytes apart
/// - `FAT16`: 16-bit File Allocation Table entries
/// - `FAT32`: 32-bit File Allocation Table entries, top 4 bits reserved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FATType {
    FAT12,
    FAT16,
    FAT32,
}

impl FATType {
    /// Determines the FAT type from the number of clusters in the data region.
    ///
    /// This is the one and only way the FAT type is determined; the filesystem-type
    /// string of the boot sector is informational.
    ///
    /// # Returns
    /// - `FAT12` if cluster count < 4085
    /// - `FAT16` if cluster count < 65525
    /// - `FAT32` otherwise
    pub fn from_cluster_count(clus_cnt: u32) -> Self {
        if clus_cnt < FAT12_MAX_CLUSTERS {
            FATType::FAT12
        } else if clus_cnt < FAT16_MAX_CLUSTERS {
            FATType::FAT16
        } else {
            FATType::FAT32
        }
    }

    /// Width in bits of one FAT entry.
    pub fn entry_bits(&self) -> u32 {
        match self {
            FATType::FAT12 => 12,
            FATType::FAT16 => 16,
            FATType::FAT32 => 32,
        }
    }

    /// Byte offset of the entry `entry` from the start of the FAT.
    ///
    /// For FAT12 this is `floor(entry * 1.5)`.
    pub fn entry_offset(&self, entry: u32) -> u64 {
        let entry = entry as u64;
        match self {
            FATType::FAT12 => entry + entry / 2,
            FATType::FAT16 => entry * 2,
            FATType::FAT32 => entry * 4,
        }
    }

    /// Number of bytes to read at [`FATType::entry_offset`] to decode one entry.
    pub fn entry_len(&self) -> usize {
        match self {
            FATType::FAT12 | FATType::FAT16 => 2,
            FATType::FAT32 => 4,
        }
    }

    /// Decodes the entry `entry` from the raw bytes found at its offset.
    ///
    /// # Parameters
    /// - `entry`: The entry number, needed to unpack FAT12 nibbles
    /// - `raw`: At least [`FATType::entry_len`] bytes starting at the entry offset
    ///
    /// # Panics
    /// Panics if `raw` is shorter than [`FATType::entry_len`].
    pub fn decode_entry(&self, entry: u32, raw: &[u8]) -> u32 {
        match self {
            FATType::FAT12 => {
                let word = u16_at(raw, 0) as u32;
                if entry & 1 == 0 {
                    word & 0x0FFF
                } else {
                    word >> 4
                }
            }
            FATType::FAT16 => u16_at(raw, 0) as u32,
            FATType::FAT32 => u32_at(raw, 0) & 0x0FFF_FFFF,
        }
    }

    /// Smallest entry value marking the end of a cluster chain.
    pub fn eoc_marker(&self) -> u32 {
        match self {
            FATType::FAT12 => 0xFF8,
            FATType::FAT16 => 0xFFF8,
            FATType::FAT32 => 0x0FFF_FFF8,
        }
    }

    /// Entry value marking a bad cluster.
    pub fn bad_cluster_marker(&self) -> u32 {
        match self {
            FATType::FAT12 => 0xFF7,
            FATType::FAT16 => 0xFFF7,
            FATType::FAT32 => 0x0FFF_FFF7,
        }
    }

    /// Checks whether a decoded entry terminates a cluster chain.
    pub fn is_eoc(&self, value: u32) -> bool {
        value >= self.eoc_marker()
    }

    /// Checks whether a decoded entry marks a bad cluster.
    pub fn is_bad_cluster(&self, value: u32) -> bool {
        value == self.bad_cluster_marker()
    }
}

impl fmt::Display for FATType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FATType::FAT12 => "FAT12",
            FATType::FAT16 => "FAT16",
            FATType::FAT32 => "FAT32",
        };
        write!(f, "{s}")
    }
}
