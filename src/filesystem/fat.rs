//! FAT volume structure and operations.
//!
//! This module implements the core functions to interact with a FAT volume, including:
//! - Reading and validating the boot sector
//! - Listing the root directory and subdirectories
//! - Opening files and reading them sector by sector
//! - Displaying the volume layout and directory tree

use log::{debug, warn};
use std::collections::HashSet;
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::Path;
use std::rc::{Rc, Weak};

use super::bpb::BootSector;
use super::chain::{self, ClusterChain};
use super::dir_entry::DirEntry;
use super::directory::{self, Directory};
use super::fat_error::FATError;
use super::fat_type::FATType;
use super::file::File;
use super::layout::VolumeLayout;
use crate::storage::host::{HostStorage, ImageStorage};
use crate::storage::sector_source::SectorSource;
use crate::traits::{LayoutDisplay, TreeDisplay};

/// A mounted FAT volume.
///
/// Every read goes through the sector source of the volume. Its geometry is computed once
/// at mount time and never changes.
pub struct FATVol<S: HostStorage> {
    source: SectorSource<S>,
    boot: BootSector,
    layout: VolumeLayout,
}

impl FATVol<ImageStorage<fs::File>> {
    /// Mounts the FAT volume stored in a disk image file.
    ///
    /// # Parameters
    /// - `path`: The path of the image
    /// - `validate`: Whether to perform validation checks on the Bpb
    ///
    /// # Errors
    /// - `FATError::Storage` if the image cannot be opened or read
    /// - See [`FATVol::mount`]
    pub fn from_file(path: &Path, validate: bool) -> Result<Self, FATError> {
        let storage = ImageStorage::open(path)?;
        Self::mount(storage, validate)
    }
}

impl<S: HostStorage> FATVol<S> {
    /// Reads the boot sector of a volume and optionally validates it.
    ///
    /// # Parameters
    /// - `storage`: The storage holding the volume, starting with its boot sector
    /// - `validate`: Whether to perform validation checks on the Bpb
    ///
    /// # Returns
    /// - `Ok(FATVol)`: The FAT volume
    /// - `Err(FATError)`: If reading fails, the geometry is implausible or validation fails
    pub fn mount(storage: S, validate: bool) -> Result<Self, FATError> {
        let mut source = SectorSource::new(storage);
        let boot = BootSector::read(&mut source, validate)?;
        let layout = *boot.layout();

        debug!(
            "Mounted {} volume: {} clusters of {} bytes, data at sector {}",
            layout.fat_type(),
            layout.cluster_count(),
            layout.cluster_size(),
            layout.data_start()
        );

        Ok(Self {
            source,
            boot,
            layout,
        })
    }

    pub fn boot_sector(&self) -> &BootSector {
        &self.boot
    }

    pub fn layout(&self) -> &VolumeLayout {
        &self.layout
    }

    pub fn fat_type(&self) -> FATType {
        self.layout.fat_type()
    }

    /// Returns the volume label stored in the boot sector.
    pub fn volume_label(&self) -> String {
        self.boot.volume_label()
    }

    /// Lists the root directory.
    ///
    /// The FAT12/16 root directory is the fixed region following the FATs; the FAT32 one
    /// is a cluster chain starting at the root cluster of the Bpb.
    pub fn root_dir(&mut self) -> Result<Rc<Directory>, FATError> {
        let (first_cluster, entries) = match self.layout.fat_type() {
            FATType::FAT32 => {
                let root_cluster = self.layout.root_cluster();
                (root_cluster, self.read_dir_clusters(root_cluster)?)
            }
            _ => (0, self.read_fixed_root()?),
        };

        Ok(Rc::new(Directory::new(
            String::from("/"),
            Weak::new(),
            first_cluster,
            entries,
        )))
    }

    /// Lists the directory described by `entry`, found in `parent`.
    ///
    /// `.` gives `parent` back. `..` gives the directory `parent` was opened from when it
    /// is still alive, and the root directory when its first cluster is 0 or the FAT32
    /// root cluster.
    ///
    /// # Errors
    /// - `FATError::NotADirectory` if `entry` is not a directory
    /// - `FATError::InvalidClusterError` if any other entry has a reserved first cluster
    /// - Chain and storage errors met while reading the directory
    pub fn open_dir(
        &mut self,
        parent: &Rc<Directory>,
        entry: &DirEntry,
    ) -> Result<Rc<Directory>, FATError> {
        if !entry.is_dir() {
            return Err(FATError::NotADirectory(entry.name().clone()));
        }

        match entry.short_name().as_str() {
            "." => return Ok(Rc::clone(parent)),
            ".." => {
                if let Some(grand_parent) = parent.parent() {
                    return Ok(grand_parent);
                }
                // `..` entries of first-level directories hold 0, or the FAT32 root cluster.
                if entry.first_cluster() == 0
                    || entry.first_cluster() == self.layout.root_cluster()
                {
                    return self.root_dir();
                }
            }
            _ => {}
        }

        let entries = self.read_dir_clusters(entry.first_cluster())?;
        Ok(Rc::new(Directory::new(
            entry.name().clone(),
            Rc::downgrade(parent),
            entry.first_cluster(),
            entries,
        )))
    }

    /// Opens the file described by `entry`, found in `parent`.
    ///
    /// The whole cluster chain of the file is resolved here.
    ///
    /// # Errors
    /// - `FATError::NotAFile` if `entry` is a directory or a volume label
    /// - `FATError::TruncatedChain` if a non-empty file has no cluster
    /// - Chain and storage errors met while walking the chain
    pub fn open_file(&mut self, parent: &Rc<Directory>, entry: &DirEntry) -> Result<File, FATError> {
        if !entry.is_file() {
            return Err(FATError::NotAFile(entry.name().clone()));
        }

        let chain = match (entry.first_cluster(), entry.file_size()) {
            (0, 0) => ClusterChain::empty(),
            (0, _) => return Err(FATError::TruncatedChain(entry.name().clone())),
            (first, _) => self.cluster_chain(first)?,
        };

        Ok(File::new(
            entry.name().clone(),
            Rc::downgrade(parent),
            chain,
            entry.file_size(),
            self.layout.sectors_per_cluster(),
        ))
    }

    /// Reads the next chunk of a file: the rest of the file or one sector, whichever is
    /// smaller.
    ///
    /// # Returns
    /// - `Ok(Some(bytes))`: The next chunk
    /// - `Ok(None)`: The end of the file was reached
    ///
    /// # Errors
    /// - `FATError::TruncatedChain` if the chain ends before the declared size
    /// - `FATError::Storage` if the sector cannot be read
    pub fn read_chunk(&mut self, file: &mut File) -> Result<Option<Vec<u8>>, FATError> {
        let Some((sector, len)) = file.next_chunk(&self.layout)? else {
            return Ok(None);
        };

        let mut buf = self
            .source
            .read_sector(sector, self.layout.bytes_per_sector() as usize)?;
        buf.truncate(len);
        file.advance(len);

        Ok(Some(buf))
    }

    /// Walks the cluster chain starting at `first`.
    pub fn cluster_chain(&mut self, first: u32) -> Result<ClusterChain, FATError> {
        chain::walk(&mut self.source, &self.layout, first, None)
    }

    /// Marks a file as deleted.
    pub fn delete_file(&mut self, entry: &DirEntry) -> Result<(), FATError> {
        Err(FATError::NotImplemented(format!("deleting `{}`", entry.name())))
    }

    /// Restores a deleted file.
    pub fn undelete_file(&mut self, entry: &DirEntry) -> Result<(), FATError> {
        Err(FATError::NotImplemented(format!(
            "undeleting `{}`",
            entry.name()
        )))
    }

    /// Overwrites the content of a file before deleting it.
    pub fn wipe_file(&mut self, entry: &DirEntry) -> Result<(), FATError> {
        Err(FATError::NotImplemented(format!("wiping `{}`", entry.name())))
    }

    /// Repairs the FATs and directories of the volume.
    pub fn repair(&mut self) -> Result<(), FATError> {
        Err(FATError::NotImplemented(String::from("repairing the volume")))
    }

    /// Closes the underlying storage.
    pub fn unmount(mut self) -> Result<(), FATError> {
        self.source.close()?;
        Ok(())
    }

    fn read_fixed_root(&mut self) -> Result<Vec<DirEntry>, FATError> {
        let bps = self.layout.bytes_per_sector() as usize;
        let start = self.layout.root_start() as u64;

        let mut sectors = Vec::with_capacity(self.layout.root_dir_sectors() as usize);
        for sector in start..start + self.layout.root_dir_sectors() as u64 {
            sectors.push(self.source.read_sector(sector, bps)?);
        }

        directory::decode_sectors(sectors.iter().map(Vec::as_slice))
    }

    fn read_dir_clusters(&mut self, first_cluster: u32) -> Result<Vec<DirEntry>, FATError> {
        let chain = self.cluster_chain(first_cluster)?;
        let bps = self.layout.bytes_per_sector() as usize;
        let spc = self.layout.sectors_per_cluster() as u64;

        let mut sectors = Vec::with_capacity(chain.len() * spc as usize);
        for cluster in chain.clusters() {
            let first_sector = self.layout.sector_for_cluster(*cluster)?;
            for sector in first_sector..first_sector + spc {
                sectors.push(self.source.read_sector(sector, bps)?);
            }
        }

        directory::decode_sectors(sectors.iter().map(Vec::as_slice))
    }

    /// Recursively renders the directory tree below `dir`.
    ///
    /// # Parameters
    /// - `dir`: The directory to render
    /// - `indent`: The indentation level for pretty-printing
    /// - `visited`: First clusters of the directories already rendered
    /// - `out`: The output buffer
    ///
    /// A subdirectory that cannot be read is logged and skipped.
    fn display_dir_rec(
        &mut self,
        dir: &Rc<Directory>,
        indent: usize,
        visited: &mut HashSet<u32>,
        out: &mut String,
    ) {
        for entry in dir.entries() {
            if entry.is_volume_id() {
                continue;
            }
            out.push_str(&format!("{}{}\n", " ".repeat(indent), entry));

            if !entry.is_regular_dir() || entry.deleted() {
                continue;
            }
            if !visited.insert(entry.first_cluster()) {
                warn!(
                    "Directory {:?} at cluster {} was already listed",
                    entry.name(),
                    entry.first_cluster()
                );
                continue;
            }

            match self.open_dir(dir, entry) {
                Ok(sub_dir) => self.display_dir_rec(&sub_dir, indent + 3, visited, out),
                Err(err) => warn!("Skipping directory {:?}: {err}", entry.name()),
            }
        }
    }
}

/// Implements the LayoutDisplay trait for FATVol
impl<S: HostStorage> LayoutDisplay for FATVol<S> {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error> {
        let mut out = String::from("");
        let indent = " ".repeat(indent.into());
        let layout = &self.layout;
        let title = format!(" {} Volume Layout ", layout.fat_type());

        writeln!(out, "{}┌{:─^55}┐", indent, title)?;
        writeln!(
            out,
            "{}├{:^12}┬{:^12}┬{:^12}┬{:^16}┤",
            indent, "Region", "Start", "End", "Description"
        )?;
        writeln!(
            out,
            "{}├{:─<12}┼{:─<12}┼{:─<12}┼{:─<16}┤",
            indent, "", "", "", ""
        )?;

        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent,
            "Reserved",
            0,
            layout.fat_start(),
            "Boot + Reserved"
        )?;
        for i in 0..layout.fat_count() {
            let fat_i_start = layout.fat_start() as u64 + i as u64 * layout.fat_size() as u64;
            let fat_i_end = fat_i_start + layout.fat_size() as u64;
            writeln!(
                out,
                "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
                indent,
                format!("FAT #{}", i),
                fat_i_start,
                fat_i_end,
                "FAT Tables"
            )?;
        }
        if layout.fat_type() != FATType::FAT32 {
            writeln!(
                out,
                "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
                indent,
                "Root Dir",
                layout.root_start(),
                layout.data_start(),
                "Root Directory"
            )?;
        }
        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent,
            "Data",
            layout.data_start(),
            layout.data_end(),
            "Cluster Data"
        )?;
        if layout.data_end() < layout.total_sectors() as u64 {
            writeln!(
                out,
                "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
                indent,
                "",
                layout.data_end(),
                layout.total_sectors(),
                "Volume Slack"
            )?;
        }

        writeln!(
            out,
            "{}└{:─<12}┴{:─<12}┴{:─<12}┴{:─<16}┘",
            indent, "", "", "", ""
        )?;

        Ok(out)
    }
}

impl<S: HostStorage> TreeDisplay for FATVol<S> {
    fn display_tree(&mut self) -> Result<String, FATError> {
        let root = self.root_dir()?;
        let mut visited = HashSet::from([root.first_cluster()]);
        let mut out = String::from("/\n");

        self.display_dir_rec(&root, 3, &mut visited, &mut out);

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    type MemVol = FATVol<ImageStorage<Cursor<Vec<u8>>>>;

    /// FAT12 volume: 512 B sectors, 1 sector per cluster, 1 FAT of 1 sector, 16 root
    /// entries (1 sector), 100 sectors. Cluster 2 is sector 3.
    fn tiny_fat12() -> Vec<u8> {
        let mut image = vec![0u8; 512 * 100];
        let boot = &mut image[..512];
        boot[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        boot[11..13].copy_from_slice(&512u16.to_le_bytes());
        boot[13] = 1;
        boot[14..16].copy_from_slice(&1u16.to_le_bytes());
        boot[16] = 1;
        boot[17..19].copy_from_slice(&16u16.to_le_bytes());
        boot[19..21].copy_from_slice(&100u16.to_le_bytes());
        boot[22..24].copy_from_slice(&1u16.to_le_bytes());
        boot[43..54].copy_from_slice(b"TINY       ");
        boot[510] = 0x55;
        boot[511] = 0xAA;

        // FAT: 0 and 1 reserved, 2 -> 3 -> EOC (file), 4 -> EOC (directory).
        image[512..512 + 8].copy_from_slice(&[0xF8, 0xFF, 0xFF, 0x03, 0xF0, 0xFF, 0xFF, 0x0F]);

        let mut root = vec![];
        let mut file = [0u8; 32];
        file[..11].copy_from_slice(b"DATA    BIN");
        file[26..28].copy_from_slice(&2u16.to_le_bytes());
        file[28..32].copy_from_slice(&600u32.to_le_bytes());
        root.extend_from_slice(&file);
        let mut dir = [0u8; 32];
        dir[..11].copy_from_slice(b"SUB        ");
        dir[11] = 0x10;
        dir[26..28].copy_from_slice(&4u16.to_le_bytes());
        root.extend_from_slice(&dir);
        image[1024..1024 + root.len()].copy_from_slice(&root);

        // Subdirectory at cluster 4 (sector 5): `.`, `..` pointing to the root.
        let mut sub = vec![];
        let mut dot = [0u8; 32];
        dot[..11].copy_from_slice(b".          ");
        dot[11] = 0x10;
        dot[26..28].copy_from_slice(&4u16.to_le_bytes());
        sub.extend_from_slice(&dot);
        let mut dotdot = [0u8; 32];
        dotdot[..11].copy_from_slice(b"..         ");
        dotdot[11] = 0x10;
        sub.extend_from_slice(&dotdot);
        image[512 * 5..512 * 5 + sub.len()].copy_from_slice(&sub);

        for (i, byte) in image[512 * 3..512 * 5].iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        image
    }

    fn mount(image: Vec<u8>) -> MemVol {
        FATVol::mount(ImageStorage::new(Cursor::new(image)), true).unwrap()
    }

    #[test]
    fn mounts_and_lists_root() {
        let mut vol = mount(tiny_fat12());
        assert_eq!(vol.fat_type(), FATType::FAT12);
        assert_eq!(vol.volume_label(), "TINY");

        let root = vol.root_dir().unwrap();
        let names: Vec<&str> = root.entries().iter().map(|e| e.name().as_str()).collect();
        assert_eq!(names, ["DATA.BIN", "SUB"]);
        assert!(root.is_root());
        assert_eq!(root.name(), "/");
    }

    #[test]
    fn reads_file_in_sector_chunks() {
        let mut vol = mount(tiny_fat12());
        let root = vol.root_dir().unwrap();
        let entry = root.find("data.bin").unwrap().clone();
        let mut file = vol.open_file(&root, &entry).unwrap();
        assert_eq!(file.chain().clusters(), &[2, 3]);

        let first = vol.read_chunk(&mut file).unwrap().unwrap();
        let second = vol.read_chunk(&mut file).unwrap().unwrap();
        assert_eq!(first.len(), 512);
        assert_eq!(second.len(), 88);
        assert_eq!(second[0], (512 % 251) as u8);
        assert!(vol.read_chunk(&mut file).unwrap().is_none());
        assert!(file.is_eof());
        assert_eq!(file.directory().unwrap().name(), "/");
    }

    #[test]
    fn navigates_into_and_out_of_subdirectory() {
        let mut vol = mount(tiny_fat12());
        let root = vol.root_dir().unwrap();
        let sub_entry = root.find("SUB").unwrap().clone();

        let sub = vol.open_dir(&root, &sub_entry).unwrap();
        assert_eq!(sub.path(), "/SUB");
        assert_eq!(sub.entries().len(), 2);

        let dot = sub.find(".").unwrap().clone();
        assert!(Rc::ptr_eq(&vol.open_dir(&sub, &dot).unwrap(), &sub));

        let dotdot = sub.find("..").unwrap().clone();
        assert!(Rc::ptr_eq(&vol.open_dir(&sub, &dotdot).unwrap(), &root));
    }

    #[test]
    fn dotdot_with_cluster_zero_is_root() {
        let mut vol = mount(tiny_fat12());
        let root = vol.root_dir().unwrap();
        let sub_entry = root.find("SUB").unwrap().clone();
        let sub = vol.open_dir(&root, &sub_entry).unwrap();
        let dotdot = sub.find("..").unwrap().clone();
        drop(root);

        let back = vol.open_dir(&sub, &dotdot).unwrap();
        assert!(back.is_root());
        assert_eq!(back.entries().len(), 2);
    }

    #[test]
    fn directory_with_cluster_zero_is_not_the_root() {
        let mut image = tiny_fat12();
        // SUB is the second root entry.
        image[1024 + 32 + 26..1024 + 32 + 28].copy_from_slice(&0u16.to_le_bytes());
        let mut vol = mount(image);
        let root = vol.root_dir().unwrap();
        let sub = root.find("SUB").unwrap().clone();

        assert!(matches!(
            vol.open_dir(&root, &sub),
            Err(FATError::InvalidClusterError(0))
        ));
    }

    #[test]
    fn kind_mismatches_are_errors() {
        let mut vol = mount(tiny_fat12());
        let root = vol.root_dir().unwrap();
        let file = root.find("DATA.BIN").unwrap().clone();
        let dir = root.find("SUB").unwrap().clone();

        assert!(matches!(
            vol.open_dir(&root, &file),
            Err(FATError::NotADirectory(_))
        ));
        assert!(matches!(
            vol.open_file(&root, &dir),
            Err(FATError::NotAFile(_))
        ));
    }

    #[test]
    fn unsupported_operations() {
        let mut vol = mount(tiny_fat12());
        let root = vol.root_dir().unwrap();
        let entry = root.find("DATA.BIN").unwrap().clone();

        assert!(matches!(vol.delete_file(&entry), Err(FATError::NotImplemented(_))));
        assert!(matches!(vol.undelete_file(&entry), Err(FATError::NotImplemented(_))));
        assert!(matches!(vol.wipe_file(&entry), Err(FATError::NotImplemented(_))));
        assert!(matches!(vol.repair(), Err(FATError::NotImplemented(_))));
    }

    #[test]
    fn layout_table_lists_regions() {
        let vol = mount(tiny_fat12());
        let table = vol.display_layout(2).unwrap();

        assert!(table.contains("FAT12 Volume Layout"));
        assert!(table.contains("FAT #0"));
        assert!(table.contains("Root Dir"));
        assert!(table.contains("Cluster Data"));
    }

    #[test]
    fn tree_lists_subdirectories_once() {
        let mut vol = mount(tiny_fat12());
        let tree = vol.display_tree().unwrap();

        assert!(tree.starts_with("/\n"));
        assert!(tree.contains("\"DATA.BIN\""));
        assert!(tree.contains("\"SUB\""));
        assert!(tree.contains("\"..\""));
    }

    #[test]
    fn unmount_closes_storage() {
        let vol = mount(tiny_fat12());
        assert!(vol.unmount().is_ok());
    }

    #[test]
    fn tiny_sectors_are_rejected_without_validation() {
        let mut image = tiny_fat12();
        image[11..13].copy_from_slice(&1u16.to_le_bytes());
        image[19..21].copy_from_slice(&2000u16.to_le_bytes());

        let result = FATVol::mount(ImageStorage::new(Cursor::new(image)), false);
        assert!(matches!(result, Err(FATError::InvalidGeometry(_))));
    }

    #[test]
    fn mount_rejects_garbage() {
        let result = FATVol::mount(ImageStorage::new(Cursor::new(vec![0u8; 4096])), false);
        assert!(matches!(result, Err(FATError::InvalidGeometry(_))));
    }
}
