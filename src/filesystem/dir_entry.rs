//! FAT directory entry structures and parsing.
//!
//! This module implements the 32-byte directory slots stored in FAT directories. A slot is
//! either a short (8.3) entry, which carries all the metadata of a file or directory, or a
//! long-name fragment holding 13 UTF-16 code units of the name of the short entry that
//! follows it. Raw slots never leave the `filesystem` module: only finalized [`DirEntry`]
//! values do.

use binread::{BinRead, BinReaderExt};
use getset::{CopyGetters, Getters};
use std::fmt;
use std::io;

use super::fat_error::FATError;

/// Size of a directory slot in bytes.
pub const DIR_ENTRY_SIZE: usize = 32;

pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
/// Attribute combination marking a long-name fragment.
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

/// First name byte of a deleted entry.
const DELETED_MARKER: u8 = 0xE5;
/// First name byte standing for a literal 0xE5 character.
const KANJI_E5: u8 = 0x05;

/// Short (8.3) directory entry as stored on disk.
///
/// # Notes
/// - The name field uses the legacy 8.3 format with space padding
/// - `fst_clus_hi` is always 0 on FAT12/FAT16 volumes
#[derive(BinRead, Debug, Clone)]
#[br(little)]
pub(super) struct ShortDirEntry {
    /// Filename in 8.3 format (8 characters name + 3 characters extension)
    name: [u8; 11],
    /// File attributes byte
    attr: u8,
    /// NT reserved (unused)
    _n_t_res: u8,
    /// Creation time in 10ms units
    crt_time_tenth: u8,
    /// Creation time
    crt_time: u16,
    /// Creation date
    crt_date: u16,
    /// Last access date
    lst_acc_date: u16,
    /// High 16 bits of first cluster number
    fst_clus_hi: u16,
    /// Last write time
    wrt_time: u16,
    /// Last write date
    wrt_date: u16,
    /// Low 16 bits of first cluster number
    fst_clus_lo: u16,
    /// File size in bytes (0 for directories)
    file_size: u32,
}

/// Long-name fragment as stored on disk.
#[derive(BinRead, Debug, Clone)]
#[br(little)]
pub(super) struct LongNameEntry {
    /// Ordinal of the fragment, 0x40 flags the last (first stored) one
    ord: u8,
    /// Characters 1-5 of the fragment
    name1: [u16; 5],
    /// Always ATTR_LONG_NAME
    _attr: u8,
    /// Always 0
    _ty: u8,
    /// Checksum of the short name the fragment belongs to
    chksum: u8,
    /// Characters 6-11 of the fragment
    name2: [u16; 6],
    /// Always 0
    _fst_clus_lo: u16,
    /// Characters 12-13 of the fragment
    name3: [u16; 2],
}

/// Classification of a raw 32-byte slot.
#[derive(Debug, Clone)]
pub(super) enum RawSlot {
    /// All 32 bytes are zero.
    Free,
    LongName(LongNameEntry),
    Short(ShortDirEntry),
}

impl RawSlot {
    /// Parses and classifies a 32-byte slot.
    ///
    /// # Errors
    /// - `FATError::BinReadError` if the slot is shorter than 32 bytes
    pub(super) fn parse(buf: &[u8]) -> Result<Self, FATError> {
        if buf.len() >= DIR_ENTRY_SIZE && buf[..DIR_ENTRY_SIZE].iter().all(|b| *b == 0) {
            return Ok(RawSlot::Free);
        }

        let mut reader = io::Cursor::new(buf);
        if buf.get(11) == Some(&ATTR_LONG_NAME) {
            Ok(RawSlot::LongName(reader.read_le()?))
        } else {
            Ok(RawSlot::Short(reader.read_le()?))
        }
    }
}

impl LongNameEntry {
    pub(super) fn ord(&self) -> u8 {
        self.ord
    }

    pub(super) fn chksum(&self) -> u8 {
        self.chksum
    }

    /// Returns the UTF-16 code units of the fragment, stopping at the first 0x0000 and
    /// dropping the 0xFFFF padding.
    pub(super) fn units(&self) -> Vec<u16> {
        self.name1
            .iter()
            .chain(self.name2.iter())
            .chain(self.name3.iter())
            .copied()
            .take_while(|unit| *unit != 0x0000)
            .filter(|unit| *unit != 0xFFFF)
            .collect()
    }
}

impl ShortDirEntry {
    pub(super) fn raw_name(&self) -> &[u8; 11] {
        &self.name
    }
}

/// Computes the checksum of an 11-byte short name, as stored in its long-name fragments.
pub fn lfn_checksum(name: &[u8; 11]) -> u8 {
    name.iter().fold(0u8, |sum, byte| {
        let rotated = if sum & 1 != 0 { 0x80u8 } else { 0 };
        rotated.wrapping_add(sum >> 1).wrapping_add(*byte)
    })
}

/// Converts the raw 11-byte short name to its displayed `BASE.EXT` form.
///
/// Bytes map one-to-one to characters (Latin-1). A first byte of 0x05 stands for 0xE5.
pub fn short_name_to_string(raw: &[u8; 11]) -> String {
    let latin1 = |bytes: &[u8]| -> String {
        bytes
            .iter()
            .map(|b| *b as char)
            .collect::<String>()
            .trim_end_matches(' ')
            .to_string()
    };

    let mut base_bytes = [0u8; 8];
    base_bytes.copy_from_slice(&raw[..8]);
    if base_bytes[0] == KANJI_E5 {
        base_bytes[0] = DELETED_MARKER;
    }

    let base = latin1(&base_bytes);
    let ext = latin1(&raw[8..]);

    if ext.is_empty() {
        base
    } else {
        format!("{base}.{ext}")
    }
}

/// Calendar date of a FAT timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct FatDate {
    year: u16,
    month: u8,
    day: u8,
}

impl FatDate {
    /// Decodes a packed date: bits 15-9 years since 1980, bits 8-5 month, bits 4-0 day.
    pub fn from_raw(raw: u16) -> Self {
        Self {
            year: 1980 + (raw >> 9),
            month: ((raw >> 5) & 0x0F) as u8,
            day: (raw & 0x1F) as u8,
        }
    }
}

impl fmt::Display for FatDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Time of day of a FAT timestamp, with a 2-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct FatTime {
    hour: u8,
    minute: u8,
    second: u8,
}

impl FatTime {
    /// Decodes a packed time: bits 15-11 hours, bits 10-5 minutes, bits 4-0 seconds / 2.
    pub fn from_raw(raw: u16) -> Self {
        Self {
            hour: (raw >> 11) as u8,
            minute: ((raw >> 5) & 0x3F) as u8,
            second: ((raw & 0x1F) * 2) as u8,
        }
    }
}

impl fmt::Display for FatTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// Date and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct FatTimestamp {
    date: FatDate,
    time: FatTime,
}

impl FatTimestamp {
    pub fn from_raw(date: u16, time: u16) -> Self {
        Self {
            date: FatDate::from_raw(date),
            time: FatTime::from_raw(time),
        }
    }
}

impl fmt::Display for FatTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.time)
    }
}

/// A decoded directory entry: a file, a directory or a volume label.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct DirEntry {
    /// Long name if one was stored, short name otherwise
    #[getset(get = "pub")]
    name: String,
    /// The 8.3 name in `BASE.EXT` form
    #[getset(get = "pub")]
    short_name: String,
    /// File attributes byte
    #[getset(get_copy = "pub")]
    attr: u8,
    /// Creation date and time
    #[getset(get_copy = "pub")]
    created: FatTimestamp,
    /// Creation time in 10ms units
    #[getset(get_copy = "pub")]
    created_tenths: u8,
    /// Last write date and time
    #[getset(get_copy = "pub")]
    modified: FatTimestamp,
    /// Last access date
    #[getset(get_copy = "pub")]
    accessed: FatDate,
    /// File size in bytes
    #[getset(get_copy = "pub")]
    file_size: u32,
    /// First cluster number, `(fst_clus_hi << 16) | fst_clus_lo`
    #[getset(get_copy = "pub")]
    first_cluster: u32,
    /// Whether the first byte of the short name marks the entry as deleted
    #[getset(get_copy = "pub")]
    deleted: bool,
}

impl DirEntry {
    /// Finalizes an entry from its short slot and its reconstructed long name, if any.
    pub(super) fn new(short: &ShortDirEntry, long_name: Option<String>) -> Self {
        let short_name = short_name_to_string(&short.name);

        DirEntry {
            name: long_name.unwrap_or_else(|| short_name.clone()),
            short_name,
            attr: short.attr,
            created: FatTimestamp::from_raw(short.crt_date, short.crt_time),
            created_tenths: short.crt_time_tenth,
            modified: FatTimestamp::from_raw(short.wrt_date, short.wrt_time),
            accessed: FatDate::from_raw(short.lst_acc_date),
            file_size: short.file_size,
            first_cluster: ((short.fst_clus_hi as u32) << 16) | short.fst_clus_lo as u32,
            deleted: short.name[0] == DELETED_MARKER,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.attr & ATTR_READ_ONLY != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.attr & ATTR_HIDDEN != 0
    }

    pub fn is_system(&self) -> bool {
        self.attr & ATTR_SYSTEM != 0
    }

    pub fn is_volume_id(&self) -> bool {
        self.attr & ATTR_VOLUME_ID != 0
    }

    /// Checks if this directory entry represents a directory.
    ///
    /// # Implementation Details
    /// Checks if the directory attribute bit (0x10) is set in the attributes field
    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    pub fn is_archive(&self) -> bool {
        self.attr & ATTR_ARCHIVE != 0
    }

    /// Checks if the entry is the `.` or `..` entry of a subdirectory.
    pub fn is_dot_entry(&self) -> bool {
        self.is_dir() && (self.short_name == "." || self.short_name == "..")
    }

    /// Checks if the entry is a directory other than `.` and `..`.
    pub fn is_regular_dir(&self) -> bool {
        self.is_dir() && !self.is_dot_entry()
    }

    /// Checks if the entry is a file: neither a directory nor a volume label.
    pub fn is_file(&self) -> bool {
        !self.is_dir() && !self.is_volume_id()
    }

    /// Returns the attributes as a fixed-width flag string, e.g. `d----a-`.
    pub fn flags(&self) -> String {
        [
            (self.is_dir(), 'd'),
            (self.is_read_only(), 'r'),
            (self.is_hidden(), 'h'),
            (self.is_system(), 's'),
            (self.is_volume_id(), 'v'),
            (self.is_archive(), 'a'),
            (self.deleted, 'x'),
        ]
        .iter()
        .map(|(set, flag)| if *set { *flag } else { '-' })
        .collect()
    }
}

impl fmt::Display for DirEntry {
    /// Formats the directory entry for display.
    ///
    /// # Returns
    /// - A string representation showing the flags, size, modification time and name
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>10}B {} \"{}\"",
            self.flags(),
            self.file_size,
            self.modified,
            self.name
        )
    }
}
