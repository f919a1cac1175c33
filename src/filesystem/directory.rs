//! Directory listings.
//!
//! A directory is decoded from the stream of its sectors, in on-disk order. Long-name
//! fragments are stored before the short entry they belong to, in descending order, and
//! a group of fragments may start at the end of one sector and finish in the next one:
//! the decoder keeps the entry under construction from one sector to the next.

use log::warn;
use std::rc::{Rc, Weak};

use super::dir_entry::{
    DIR_ENTRY_SIZE, DirEntry, LongNameEntry, RawSlot, ShortDirEntry, lfn_checksum,
};
use super::fat_error::FATError;

/// A listed directory.
#[derive(Debug)]
pub struct Directory {
    name: String,
    parent: Weak<Directory>,
    /// First cluster of the directory, 0 for a fixed FAT12/16 root directory
    first_cluster: u32,
    entries: Vec<DirEntry>,
}

impl Directory {
    pub(super) fn new(
        name: String,
        parent: Weak<Directory>,
        first_cluster: u32,
        entries: Vec<DirEntry>,
    ) -> Self {
        Self {
            name,
            parent,
            first_cluster,
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the directory this one was opened from, if it is still alive.
    pub fn parent(&self) -> Option<Rc<Directory>> {
        self.parent.upgrade()
    }

    pub fn first_cluster(&self) -> u32 {
        self.first_cluster
    }

    /// Entries in on-disk order.
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// Checks whether the directory has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    /// Finds an entry by name.
    ///
    /// The long name is compared as is, the short name ignoring ASCII case. Deleted entries
    /// are only returned when no live entry matches.
    pub fn find(&self, name: &str) -> Option<&DirEntry> {
        let matches = |entry: &&DirEntry| {
            entry.name() == name || entry.short_name().eq_ignore_ascii_case(name)
        };

        self.entries
            .iter()
            .filter(|entry| !entry.deleted())
            .find(matches)
            .or_else(|| self.entries.iter().find(matches))
    }

    /// Path from the root, built from the names of the parents.
    pub fn path(&self) -> String {
        match self.parent() {
            None => String::from("/"),
            Some(parent) => {
                let base = parent.path();
                if base.ends_with('/') {
                    format!("{base}{}", self.name)
                } else {
                    format!("{base}/{}", self.name)
                }
            }
        }
    }
}

/// Entry under construction: the long-name fragments seen so far.
#[derive(Default)]
struct EntryBuilder {
    /// Fragments in ascending ordinal order.
    fragments: Vec<LongNameEntry>,
}

impl EntryBuilder {
    /// Fragments are stored in descending order, so each new one goes first.
    fn prepend(&mut self, fragment: LongNameEntry) {
        self.fragments.insert(0, fragment);
    }

    fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns the long name of `short`, or `None` if a fragment was written for another
    /// short name.
    fn finish(self, short: &ShortDirEntry) -> Option<String> {
        let checksum = lfn_checksum(short.raw_name());
        if self.fragments.iter().any(|frag| frag.chksum() != checksum) {
            return None;
        }

        let units: Vec<u16> = self.fragments.iter().flat_map(|frag| frag.units()).collect();
        Some(String::from_utf16_lossy(&units))
    }
}

/// Decodes directory entries from a stream of sectors.
#[derive(Default)]
pub(super) struct EntryDecoder {
    pending: Option<EntryBuilder>,
    entries: Vec<DirEntry>,
}

impl EntryDecoder {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Decodes every slot of a sector. An entry left incomplete at the end of the sector
    /// is continued by the next call.
    ///
    /// # Errors
    /// - `FATError::BinReadError` if a slot cannot be parsed
    pub(super) fn feed_sector(&mut self, sector: &[u8]) -> Result<(), FATError> {
        for slot in sector.chunks_exact(DIR_ENTRY_SIZE) {
            match RawSlot::parse(slot)? {
                RawSlot::Free => {
                    if let Some(orphans) = self.pending.take() {
                        warn!(
                            "Dropping {} long-name fragment(s) not followed by a short entry",
                            orphans.len()
                        );
                    }
                }
                RawSlot::LongName(fragment) => {
                    self.pending
                        .get_or_insert_with(EntryBuilder::default)
                        .prepend(fragment);
                }
                RawSlot::Short(short) => match self.pending.take() {
                    None => self.entries.push(DirEntry::new(&short, None)),
                    Some(builder) => match builder.finish(&short) {
                        Some(long_name) => {
                            self.entries.push(DirEntry::new(&short, Some(long_name)))
                        }
                        None => warn!(
                            "Dropping entry {:?}: long-name checksum mismatch",
                            DirEntry::new(&short, None).short_name()
                        ),
                    },
                },
            }
        }

        Ok(())
    }

    /// Ends the stream and returns the decoded entries in on-disk order.
    pub(super) fn finish(self) -> Vec<DirEntry> {
        if let Some(orphans) = self.pending {
            warn!(
                "Dropping {} long-name fragment(s) at the end of the directory",
                orphans.len()
            );
        }

        self.entries
    }
}

/// Decodes the entries of a directory from its sectors.
pub(super) fn decode_sectors<'a, I>(sectors: I) -> Result<Vec<DirEntry>, FATError>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut decoder = EntryDecoder::new();
    for sector in sectors {
        decoder.feed_sector(sector)?;
    }

    Ok(decoder.finish())
}
