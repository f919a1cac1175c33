//! FAT boot sector and BIOS Parameter Block (Bpb).
//!
//! This module implements:
//! - Parsing of the fields shared by every FAT variant (the first 36 bytes)
//! - FAT type detection, peeking the FAT32 FAT size before the variant is known
//! - Parsing of the FAT12/16 or FAT32 extended fields that follow
//! - Optional validation according to Microsoft's FAT specification

use binread::{BinRead, BinReaderExt};
use getset::{CopyGetters, Getters};
use std::fmt;
use std::io;

use super::fat_error::FATError;
use super::fat_type::FATType;
use super::layout::VolumeLayout;
use crate::storage::host::HostStorage;
use crate::storage::sector_source::SectorSource;
use crate::utils;

/// Size of the boot sector as far as Bpb parsing is concerned, whatever the real sector
/// size of the volume is.
pub const BOOT_SECTOR_SIZE: usize = 512;

/// Offset of the extended fields, which differ between FAT12/16 and FAT32.
const EXT_OFFSET: usize = 36;

/// Fields common to every FAT variant.
///
/// The Bpb contains essential information about the filesystem layout and properties.
#[derive(BinRead, Debug, Clone, CopyGetters)]
#[br(little)]
pub struct Bpb {
    /// Jump instruction to boot code (must be 0xEB ?? 0x90 or 0xE9 ?? ??)
    jmp: [u8; 3],
    /// OEM identifier (e.g., "MSWIN4.1")
    oem_name: [u8; 8],
    /// Number of bytes per sector (512, 1024, 2048, or 4096)
    #[getset(get_copy = "pub")]
    bytes_per_sec: u16,
    /// Number of sectors per cluster (power of 2: 1, 2, 4, 8, 16, 32, 64, or 128)
    #[getset(get_copy = "pub")]
    sec_per_clus: u8,
    /// Number of reserved sectors from start of volume
    #[getset(get_copy = "pub")]
    rsvd_sec_cnt: u16,
    /// Number of FAT copies (typically 2 for redundancy)
    #[getset(get_copy = "pub")]
    num_fat: u8,
    /// Maximum number of root directory entries (0 for FAT32)
    #[getset(get_copy = "pub")]
    root_ent_cnt: u16,
    /// Total sectors for volumes < 32MB (0 for FAT32)
    #[getset(get_copy = "pub")]
    tot_sec_16: u16,
    /// Media descriptor (0xF8 for fixed disk)
    #[getset(get_copy = "pub")]
    media: u8,
    /// Sectors per FAT for FAT12/FAT16 (0 for FAT32)
    #[getset(get_copy = "pub")]
    fat_sz_16: u16,
    /// Sectors per track
    #[getset(get_copy = "pub")]
    sec_per_trk: u16,
    /// Number of heads
    #[getset(get_copy = "pub")]
    num_heads: u16,
    /// Number of hidden sectors preceding the partition
    #[getset(get_copy = "pub")]
    hidd_sec: u32,
    /// Total sectors for volumes >= 32MB
    #[getset(get_copy = "pub")]
    tot_sec_32: u32,
}

/// Extended fields of FAT12 and FAT16 volumes.
#[derive(BinRead, Debug, Clone)]
#[br(little)]
pub struct ExtBpb16 {
    /// Drive number (0x80 for hard disk)
    drv_num: u8,
    /// Reserved (used by Windows NT)
    reserved_1: u8,
    /// Extended boot signature (0x29)
    boot_sig: u8,
    /// Volume serial number
    vol_id: u32,
    /// Volume label (11 bytes)
    vol_lab: [u8; 11],
    /// Filesystem type label ("FAT12   " or "FAT16   ")
    fil_sys_type: [u8; 8],
}

/// Extended fields of FAT32 volumes.
#[derive(BinRead, Debug, Clone)]
#[br(little)]
pub struct ExtBpb32 {
    /// Sectors per FAT
    fat_sz_32: u32,
    /// FAT flags (mirroring, active FAT)
    ext_flags: u16,
    /// Filesystem version (should be 0:0)
    fs_ver: u16,
    /// First cluster of root directory (typically 2)
    root_clus: u32,
    /// Sector number of FSINFO structure
    fs_info: u16,
    /// Sector number of backup boot sector
    bk_boot_sec: u16,
    /// Reserved for future expansion
    reserved: [u8; 12],
    /// Drive number (0x80 for hard disk)
    drv_num: u8,
    /// Reserved (used by Windows NT)
    reserved_1: u8,
    /// Extended boot signature (0x29)
    boot_sig: u8,
    /// Volume serial number
    vol_id: u32,
    /// Volume label (11 bytes)
    vol_lab: [u8; 11],
    /// Filesystem type label ("FAT32   ")
    fil_sys_type: [u8; 8],
}

/// Variant-specific part of the boot sector.
#[derive(Debug, Clone)]
pub enum ExtBpb {
    Fat16(ExtBpb16),
    Fat32(ExtBpb32),
}

/// A parsed boot sector together with the geometry derived from it.
#[derive(Debug, Clone, Getters)]
pub struct BootSector {
    /// Fields common to every FAT variant
    #[get = "pub"]
    bpb: Bpb,
    /// Variant-specific fields
    #[get = "pub"]
    ext: ExtBpb,
    /// Boot sector signature (0x55 0xAA)
    sig: [u8; 2],
    /// Geometry derived from the Bpb
    #[get = "pub"]
    layout: VolumeLayout,
}

impl BootSector {
    /// Reads and optionally validates the boot sector of a volume.
    ///
    /// # Parameters
    /// - `source`: The sector source of the volume
    /// - `validate`: Whether to perform validation checks on the Bpb
    ///
    /// # Returns
    /// - `Ok(BootSector)`: The parsed and optionally validated boot sector
    /// - `Err(FATError)`: If reading fails, the geometry is implausible or validation fails
    pub fn read<S: HostStorage>(
        source: &mut SectorSource<S>,
        validate: bool,
    ) -> Result<BootSector, FATError> {
        let buf = source.read_sector(0, BOOT_SECTOR_SIZE)?;
        let boot = Self::from_bytes(&buf)?;

        if validate { boot.validate() } else { Ok(boot) }
    }

    /// Parses a boot sector from its raw bytes without range validation.
    ///
    /// Only the geometry is checked for plausibility: a volume whose regions cannot be
    /// computed is rejected here.
    pub fn from_bytes(buf: &[u8]) -> Result<BootSector, FATError> {
        if buf.len() < BOOT_SECTOR_SIZE {
            return Err(FATError::InvalidGeometry(format!(
                "boot sector holds {} bytes, {BOOT_SECTOR_SIZE} expected",
                buf.len()
            )));
        }

        let mut reader = io::Cursor::new(&buf[..EXT_OFFSET]);
        let bpb: Bpb = reader.read_le()?;

        // The FAT32 FAT size must be known to count clusters, which in turn tells
        // whether the extended fields are FAT32 ones.
        let fat_sz_32 = utils::u32_at(buf, EXT_OFFSET);
        let layout = VolumeLayout::new(&bpb, fat_sz_32)?;

        let mut reader = io::Cursor::new(&buf[EXT_OFFSET..]);
        let ext = match layout.fat_type() {
            FATType::FAT32 => ExtBpb::Fat32(reader.read_le()?),
            _ => ExtBpb::Fat16(reader.read_le()?),
        };

        let layout = match &ext {
            ExtBpb::Fat32(ext32) => layout.with_root_cluster(ext32.root_clus),
            ExtBpb::Fat16(_) => layout,
        };

        Ok(BootSector {
            bpb,
            ext,
            sig: [buf[510], buf[511]],
            layout,
        })
    }

    /// Returns the OEM identifier.
    pub fn oem_name(&self) -> String {
        utils::padded_str(&self.bpb.oem_name)
    }

    /// Returns the volume label stored in the boot sector.
    pub fn volume_label(&self) -> String {
        match &self.ext {
            ExtBpb::Fat16(ext) => utils::padded_str(&ext.vol_lab),
            ExtBpb::Fat32(ext) => utils::padded_str(&ext.vol_lab),
        }
    }

    /// Returns the informational filesystem type string ("FAT12", "FAT32", ...).
    pub fn fil_sys_type(&self) -> String {
        match &self.ext {
            ExtBpb::Fat16(ext) => utils::padded_str(&ext.fil_sys_type),
            ExtBpb::Fat32(ext) => utils::padded_str(&ext.fil_sys_type),
        }
    }

    /// Returns the volume serial number.
    pub fn vol_id(&self) -> u32 {
        match &self.ext {
            ExtBpb::Fat16(ext) => ext.vol_id,
            ExtBpb::Fat32(ext) => ext.vol_id,
        }
    }

    /// Validates the boot sector according to the FAT specification requirements.
    ///
    /// # Errors
    /// - `FATError::InvalidJmp`: If the jump instruction is invalid
    /// - `FATError::InvalidBytesPerSec`: If bytes per sector is not a valid value
    /// - `FATError::InvalidSecPerClus`: If sectors per cluster is not a valid value
    /// - `FATError::InvalidClusSz`: If cluster size exceeds 32 KiB
    /// - `FATError::InvalidRsvdSecCnt`: If reserved sector count is 0
    /// - `FATError::InvalidSignature`: If boot sector signature is not 0x55AA
    /// - FAT type specific errors, see `validate_fat16` and `validate_fat32`
    fn validate(self) -> Result<Self, FATError> {
        let jmp = self.bpb.jmp;
        if !((jmp[0] == 0xEB && jmp[2] == 0x90) || jmp[0] == 0xE9) {
            return Err(FATError::InvalidJmp(format!(
                "0x{:02X}{:02X}{:02X}",
                jmp[0], jmp[1], jmp[2],
            )));
        }

        const VALID_BYTES_PER_SEC: [u16; 4] = [512, 1024, 2048, 4096];
        if !VALID_BYTES_PER_SEC.contains(&self.bpb.bytes_per_sec) {
            return Err(FATError::InvalidBytesPerSec(self.bpb.bytes_per_sec));
        }

        const VALID_SEC_PER_CLUS: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];
        if !VALID_SEC_PER_CLUS.contains(&self.bpb.sec_per_clus) {
            return Err(FATError::InvalidSecPerClus(self.bpb.sec_per_clus));
        }

        let clus_sz = self.bpb.bytes_per_sec as u32 * self.bpb.sec_per_clus as u32;
        if clus_sz > 32 * 1024 {
            return Err(FATError::InvalidClusSz(clus_sz));
        }

        if self.bpb.rsvd_sec_cnt == 0 {
            return Err(FATError::InvalidRsvdSecCnt(self.bpb.rsvd_sec_cnt));
        }

        const SIG: [u8; 2] = [0x55, 0xAA];
        if !self.sig.eq(&SIG) {
            return Err(FATError::InvalidSignature(format!(
                "0x{:02X}{:02X}",
                self.sig[0], self.sig[1]
            )));
        }

        match self.layout.fat_type() {
            FATType::FAT32 => self.validate_fat32(),
            _ => self.validate_fat16(),
        }
    }

    /// Performs FAT12/FAT16-specific validation checks.
    ///
    /// # Errors
    /// - `FATError::InvalidRootEntCnt`: If the root directory has no room for entries
    /// - `FATError::InvalidFatSz`: If the 16-bit FAT size is 0
    fn validate_fat16(self) -> Result<Self, FATError> {
        if self.bpb.root_ent_cnt == 0 {
            return Err(FATError::InvalidRootEntCnt(String::from(
                "BPB_RootEntCnt should be greater than 0 for a FAT12/FAT16 volume.",
            )));
        }

        if self.bpb.fat_sz_16 == 0 {
            return Err(FATError::InvalidFatSz(String::from(
                "BPB_FATSz16 should be greater than 0 for a FAT12/FAT16 volume.",
            )));
        }

        Ok(self)
    }

    /// Performs FAT32-specific validation checks.
    ///
    /// # Errors
    /// - `FATError::InvalidRootEntCnt`: If root directory entries is not 0
    /// - `FATError::InvalidTotSec`: If total sector fields are invalid for FAT32
    /// - `FATError::InvalidFatSz`: If FAT size fields are invalid for FAT32
    /// - `FATError::InvalidRootClus`: If root directory cluster is less than 2
    fn validate_fat32(self) -> Result<Self, FATError> {
        let ExtBpb::Fat32(ext) = &self.ext else {
            return Err(FATError::InvalidGeometry(String::from(
                "FAT32 volume without FAT32 extended fields",
            )));
        };

        if self.bpb.root_ent_cnt != 0 {
            return Err(FATError::InvalidRootEntCnt(String::from(
                "BPB_RootEntCnt should be 0 for a FAT32 volume.",
            )));
        }

        if self.bpb.tot_sec_16 != 0 {
            return Err(FATError::InvalidTotSec(String::from(
                "BPB_TotSec16 should be 0 for a FAT32 volume.",
            )));
        }
        if self.bpb.tot_sec_32 == 0 {
            return Err(FATError::InvalidTotSec(String::from(
                "BPB_TotSec32 should be greater than 0 for a FAT32 volume.",
            )));
        }

        if self.bpb.fat_sz_16 != 0 {
            return Err(FATError::InvalidFatSz(String::from(
                "BPB_FATSz16 should be 0 for a FAT32 volume.",
            )));
        }
        if ext.fat_sz_32 == 0 {
            return Err(FATError::InvalidFatSz(String::from(
                "BPB_FATSz32 should be greater than 0 for a FAT32 volume.",
            )));
        }

        if ext.root_clus < 2 {
            return Err(FATError::InvalidRootClus(ext.root_clus));
        }

        Ok(self)
    }
}

/// Implements the Display trait for BootSector
impl fmt::Display for BootSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut offset = 0;

        macro_rules! field {
            ($name:expr, $val:expr, $size:expr) => {{
                writeln!(f, "  {:<20} 0x{:>04X}: {}", $name, offset, $val)?;
                offset += $size;
            }};
        }

        let bpb = &self.bpb;
        writeln!(f, "BIOS Parameter Block (Bpb):")?;

        field!("jmp", format!("{:02X?}", bpb.jmp), 3);
        field!("oem_name", self.oem_name(), 8);
        field!("bytes_per_sec", bpb.bytes_per_sec, 2);
        field!("sec_per_clus", bpb.sec_per_clus, 1);
        field!("rsvd_sec_cnt", bpb.rsvd_sec_cnt, 2);
        field!("num_fat", bpb.num_fat, 1);
        field!("root_ent_cnt", bpb.root_ent_cnt, 2);
        field!("tot_sec_16", bpb.tot_sec_16, 2);
        field!("media", format!("0x{:X}", bpb.media), 1);
        field!("fat_sz_16", bpb.fat_sz_16, 2);
        field!("sec_per_trk", bpb.sec_per_trk, 2);
        field!("num_heads", bpb.num_heads, 2);
        field!("hidd_sec", bpb.hidd_sec, 4);
        field!("tot_sec_32", bpb.tot_sec_32, 4);

        match &self.ext {
            ExtBpb::Fat32(ext) => {
                field!("fat_sz_32", ext.fat_sz_32, 4);
                field!("ext_flags", format!("0x{:04X}", ext.ext_flags), 2);
                field!("fs_ver", ext.fs_ver, 2);
                field!("root_clus", ext.root_clus, 4);
                field!("fs_info", ext.fs_info, 2);
                field!("bk_boot_sec", ext.bk_boot_sec, 2);
                field!("reserved", format!("{:02X?}", &ext.reserved[..]), 12);
                field!("drv_num", format!("0x{:X}", ext.drv_num), 1);
                field!("reserved_1", ext.reserved_1, 1);
                field!("boot_sig", format!("0x{:X}", ext.boot_sig), 1);
            }
            ExtBpb::Fat16(ext) => {
                field!("drv_num", format!("0x{:X}", ext.drv_num), 1);
                field!("reserved_1", ext.reserved_1, 1);
                field!("boot_sig", format!("0x{:X}", ext.boot_sig), 1);
            }
        }
        field!("vol_id", format!("0x{:X}", self.vol_id()), 4);
        field!("vol_lab", self.volume_label(), 11);
        field!("fil_sys_type", self.fil_sys_type(), 8);

        writeln!(f, "\nSignature 0x{:04X}: {:02X?}", 510, self.sig)?;
        writeln!(
            f,
            "FAT type is {}, volume has {} clusters (offset after Bpb: 0x{:04X})",
            self.layout.fat_type(),
            self.layout.cluster_count(),
            offset
        )?;

        Ok(())
    }
}
