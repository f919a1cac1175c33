//! Cluster chain traversal.
//!
//! Files and directories stored in the data region are linked lists of clusters: the FAT
//! entry of a cluster holds the number of the next one. The walker follows those links
//! through the first FAT copy until an end-of-chain marker, refusing anything that would
//! make it loop or leave the data region.

use log::trace;

use super::fat_error::FATError;
use super::layout::VolumeLayout;
use crate::storage::host::HostStorage;
use crate::storage::sector_source::SectorSource;

/// Ordered list of the clusters backing a file or a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterChain {
    clusters: Vec<u32>,
}

impl ClusterChain {
    /// A chain holding no cluster, used for empty files.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn clusters(&self) -> &[u32] {
        &self.clusters
    }

    pub fn first(&self) -> Option<u32> {
        self.clusters.first().copied()
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.clusters.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// Reads the FAT entry of `cluster` from the first FAT.
///
/// The entry is located with the real sector size of the volume. A FAT12 entry whose
/// second byte lies in the next FAT sector is assembled from both sectors.
///
/// # Errors
/// - `FATError::Storage` if a FAT sector cannot be read
pub fn read_fat_entry<S: HostStorage>(
    source: &mut SectorSource<S>,
    layout: &VolumeLayout,
    cluster: u32,
) -> Result<u32, FATError> {
    let fat_type = layout.fat_type();
    let bps = layout.bytes_per_sector() as usize;
    let len = fat_type.entry_len();
    let (sector, offset) = layout.fat_entry_location(cluster);

    let mut buf = source.read_sector(sector, bps)?;
    let raw = if offset + len <= bps {
        buf[offset..offset + len].to_vec()
    } else {
        // Only a FAT12 entry can straddle two sectors.
        let next = source.read_sector(sector + 1, bps)?;
        buf.extend_from_slice(&next[..len]);
        buf[offset..offset + len].to_vec()
    };

    Ok(fat_type.decode_entry(cluster, &raw))
}

/// Walks the chain starting at `first`.
///
/// # Parameters
/// - `source`: The sector source of the volume
/// - `layout`: The layout of the volume
/// - `first`: The first cluster of the chain
/// - `max_len`: Optional bound on the chain length, lower than the cluster count of the
///   volume. The cluster count is used when `None` is given.
///
/// # Errors
/// - `FATError::InvalidClusterError` if `first` is not a data cluster
/// - `FATError::BadClusterInChain` if a bad-cluster marker is met
/// - `FATError::InvalidClusterInChain` if a link points to a free, reserved or
///   out-of-range cluster
/// - `FATError::ChainTooLong` if the bound is exceeded, typically because of a cycle
pub fn walk<S: HostStorage>(
    source: &mut SectorSource<S>,
    layout: &VolumeLayout,
    first: u32,
    max_len: Option<u32>,
) -> Result<ClusterChain, FATError> {
    if !layout.is_data_cluster(first) {
        return Err(FATError::InvalidClusterError(first));
    }

    let fat_type = layout.fat_type();
    let limit = max_len.map_or(layout.cluster_count(), |max| {
        max.min(layout.cluster_count())
    });

    let mut clusters = vec![first];
    let mut current = first;

    loop {
        let next = read_fat_entry(source, layout, current)?;

        if fat_type.is_eoc(next) {
            break;
        }
        if fat_type.is_bad_cluster(next) {
            return Err(FATError::BadClusterInChain(current));
        }
        if !layout.is_data_cluster(next) {
            return Err(FATError::InvalidClusterInChain {
                cluster: current,
                next,
            });
        }
        if clusters.len() as u32 >= limit {
            return Err(FATError::ChainTooLong { first, limit });
        }

        clusters.push(next);
        current = next;
    }

    trace!("Chain from cluster {first}: {} clusters", clusters.len());
    Ok(ClusterChain { clusters })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::bpb::BootSector;
    use crate::filesystem::fat_type::FATType;
    use crate::storage::host::ImageStorage;
    use std::io::Cursor;

    type MemSource = SectorSource<ImageStorage<Cursor<Vec<u8>>>>;

    /// Builds a FAT16 volume (512 B sectors, 1 sector per cluster, 8 FAT sectors) whose
    /// FAT holds `entries` from entry 0.
    fn fat16_volume(entries: &[u16]) -> (MemSource, VolumeLayout) {
        let mut image = vec![0u8; 512 * 10];
        let boot = &mut image[..512];
        boot[11..13].copy_from_slice(&512u16.to_le_bytes());
        boot[13] = 1;
        boot[14..16].copy_from_slice(&1u16.to_le_bytes());
        boot[16] = 1;
        boot[17..19].copy_from_slice(&16u16.to_le_bytes());
        boot[19..21].copy_from_slice(&5000u16.to_le_bytes());
        boot[22..24].copy_from_slice(&8u16.to_le_bytes());

        for (n, value) in entries.iter().enumerate() {
            let off = 512 + n * 2;
            image[off..off + 2].copy_from_slice(&value.to_le_bytes());
        }

        let layout = *BootSector::from_bytes(&image).unwrap().layout();
        (SectorSource::new(ImageStorage::new(Cursor::new(image))), layout)
    }

    #[test]
    fn follows_links_to_end_of_chain() {
        let (mut source, layout) = fat16_volume(&[0xFFF8, 0xFFFF, 3, 5, 0, 4, 0xFFFF]);
        assert_eq!(layout.fat_type(), FATType::FAT16);

        let chain = walk(&mut source, &layout, 2, None).unwrap();
        assert_eq!(chain.clusters(), &[2, 3, 5, 4]);
        assert_eq!(chain.first(), Some(2));
        assert_eq!(chain.len(), 4);
    }

    #[test]
    fn single_cluster_chain() {
        let (mut source, layout) = fat16_volume(&[0xFFF8, 0xFFFF, 0xFFF8]);
        let chain = walk(&mut source, &layout, 2, None).unwrap();
        assert_eq!(chain.clusters(), &[2]);
    }

    #[test]
    fn cycle_is_reported() {
        let (mut source, layout) = fat16_volume(&[0xFFF8, 0xFFFF, 3, 4, 2]);
        assert!(matches!(
            walk(&mut source, &layout, 2, None),
            Err(FATError::ChainTooLong { first: 2, .. })
        ));
    }

    #[test]
    fn caller_bound_is_honored() {
        let (mut source, layout) = fat16_volume(&[0xFFF8, 0xFFFF, 3, 4, 5, 0xFFFF]);
        assert!(walk(&mut source, &layout, 2, Some(4)).is_ok());
        assert!(matches!(
            walk(&mut source, &layout, 2, Some(3)),
            Err(FATError::ChainTooLong { first: 2, limit: 3 })
        ));
    }

    #[test]
    fn chain_as_long_as_the_data_region() {
        // FAT12: 1 reserved sector, 1 FAT sector, 1 root sector and 5 data clusters.
        let mut image = vec![0u8; 512 * 8];
        let boot = &mut image[..512];
        boot[11..13].copy_from_slice(&512u16.to_le_bytes());
        boot[13] = 1;
        boot[14..16].copy_from_slice(&1u16.to_le_bytes());
        boot[16] = 1;
        boot[17..19].copy_from_slice(&16u16.to_le_bytes());
        boot[19..21].copy_from_slice(&8u16.to_le_bytes());
        boot[22..24].copy_from_slice(&1u16.to_le_bytes());

        // Entries 0 to 7: reserved, reserved, 2 -> 3 -> 4 -> 5 -> 6 -> EOC, free.
        image[512..512 + 12].copy_from_slice(&[
            0xF8, 0xFF, 0xFF, 0x03, 0x40, 0x00, 0x05, 0x60, 0x00, 0xFF, 0x0F, 0x00,
        ]);

        let layout = *BootSector::from_bytes(&image).unwrap().layout();
        assert_eq!(layout.fat_type(), FATType::FAT12);
        assert_eq!(layout.cluster_count(), 5);
        let mut source = SectorSource::new(ImageStorage::new(Cursor::new(image)));

        let chain = walk(&mut source, &layout, 2, None).unwrap();
        assert_eq!(chain.clusters(), &[2, 3, 4, 5, 6]);
    }

    #[test]
    fn bad_cluster_is_reported() {
        let (mut source, layout) = fat16_volume(&[0xFFF8, 0xFFFF, 3, 0xFFF7]);
        assert!(matches!(
            walk(&mut source, &layout, 2, None),
            Err(FATError::BadClusterInChain(3))
        ));
    }

    #[test]
    fn free_and_reserved_links_are_reported() {
        let (mut source, layout) = fat16_volume(&[0xFFF8, 0xFFFF, 0, 1]);
        assert!(matches!(
            walk(&mut source, &layout, 2, None),
            Err(FATError::InvalidClusterInChain { cluster: 2, next: 0 })
        ));
        assert!(matches!(
            walk(&mut source, &layout, 3, None),
            Err(FATError::InvalidClusterInChain { cluster: 3, next: 1 })
        ));
    }

    #[test]
    fn out_of_range_link_is_reported() {
        let (mut source, layout) = fat16_volume(&[0xFFF8, 0xFFFF, 0x9000]);
        assert!(matches!(
            walk(&mut source, &layout, 2, None),
            Err(FATError::InvalidClusterInChain { next: 0x9000, .. })
        ));
    }

    #[test]
    fn reserved_first_cluster_is_rejected() {
        let (mut source, layout) = fat16_volume(&[0xFFF8, 0xFFFF]);
        assert!(matches!(
            walk(&mut source, &layout, 0, None),
            Err(FATError::InvalidClusterError(0))
        ));
        assert!(matches!(
            walk(&mut source, &layout, 1, None),
            Err(FATError::InvalidClusterError(1))
        ));
    }

    #[test]
    fn fat12_entry_straddling_two_sectors() {
        // FAT12 floppy: entry 341 occupies the last byte of FAT sector 1 and the first
        // byte of FAT sector 2.
        let mut image = vec![0u8; 512 * 40];
        let boot = &mut image[..512];
        boot[11..13].copy_from_slice(&512u16.to_le_bytes());
        boot[13] = 1;
        boot[14..16].copy_from_slice(&1u16.to_le_bytes());
        boot[16] = 2;
        boot[17..19].copy_from_slice(&224u16.to_le_bytes());
        boot[19..21].copy_from_slice(&2880u16.to_le_bytes());
        boot[22..24].copy_from_slice(&9u16.to_le_bytes());

        // Entry 341 is odd: its value is the high 12 bits of the word at offset 511.
        // Store 0xABC: low nibble 0xC in the high nibble of byte 511, 0xAB in byte 512.
        image[512 + 511] = 0xC0;
        image[512 + 512] = 0xAB;
        // Entry 340 (even, offset 510) terminates the chain it starts.
        image[512 + 510] = 0xFF;
        image[512 + 511] |= 0x0F;

        let layout = *BootSector::from_bytes(&image).unwrap().layout();
        assert_eq!(layout.fat_type(), FATType::FAT12);
        let mut source = SectorSource::new(ImageStorage::new(Cursor::new(image)));

        assert_eq!(read_fat_entry(&mut source, &layout, 341).unwrap(), 0xABC);
        assert_eq!(read_fat_entry(&mut source, &layout, 340).unwrap(), 0xFFF);
        assert_eq!(
            walk(&mut source, &layout, 340, None).unwrap().clusters(),
            &[340]
        );
    }
}
