//! Volume geometry derived from the Bpb.
//!
//! A FAT volume is made of four consecutive regions: the reserved sectors (starting with
//! the boot sector), the FAT copies, the fixed root directory (FAT12/16 only) and the data
//! region, cut into clusters numbered from 2.

use getset::CopyGetters;

use super::bpb::Bpb;
use super::dir_entry::DIR_ENTRY_SIZE;
use super::fat_error::FATError;
use super::fat_type::FATType;

/// Sector and cluster arithmetic of a mounted volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct VolumeLayout {
    /// Bytes per sector
    bytes_per_sector: u16,
    /// Sectors per cluster
    sectors_per_cluster: u8,
    /// Number of FAT copies
    fat_count: u8,
    /// Maximum number of entries in the fixed root directory (0 for FAT32)
    root_entry_count: u16,
    /// Total number of sectors on the volume
    total_sectors: u32,
    /// Size of one FAT copy in sectors
    fat_size: u32,
    /// First sector of the first FAT
    fat_start: u32,
    /// First sector of the fixed root directory
    root_start: u32,
    /// Number of sectors of the fixed root directory
    root_dir_sectors: u32,
    /// First sector of the data region (cluster 2)
    data_start: u32,
    /// Number of clusters in the data region
    cluster_count: u32,
    /// FAT variant, derived from the cluster count
    fat_type: FATType,
    /// First cluster of the root directory (FAT32 only, 0 otherwise)
    root_cluster: u32,
}

impl VolumeLayout {
    /// Computes the layout of a volume.
    ///
    /// # Parameters
    /// - `bpb`: The fields common to every FAT variant
    /// - `fat_sz_32`: The FAT32 FAT size, used only when the 16-bit FAT size is 0
    ///
    /// # Errors
    /// Returns `FATError::InvalidGeometry` when the regions cannot be computed: a sector
    /// size that does not hold whole directory entries, a null cluster size, no FAT, an arithmetic overflow, or metadata regions larger
    /// than the volume.
    pub fn new(bpb: &Bpb, fat_sz_32: u32) -> Result<Self, FATError> {
        let geometry = |msg: &str| FATError::InvalidGeometry(msg.to_string());

        let bytes_per_sector = bpb.bytes_per_sec();
        let sectors_per_cluster = bpb.sec_per_clus();
        let fat_count = bpb.num_fat();

        let entry_size = DIR_ENTRY_SIZE as u16;
        if bytes_per_sector < entry_size || bytes_per_sector % entry_size != 0 {
            return Err(FATError::InvalidGeometry(format!(
                "{bytes_per_sector} bytes per sector is not a multiple of the {DIR_ENTRY_SIZE}-byte directory entry"
            )));
        }
        if sectors_per_cluster == 0 {
            return Err(geometry("sectors per cluster is 0"));
        }
        if fat_count == 0 {
            return Err(geometry("volume has no FAT"));
        }

        let fat_size = if bpb.fat_sz_16() != 0 {
            bpb.fat_sz_16() as u32
        } else {
            fat_sz_32
        };
        if fat_size == 0 {
            return Err(geometry("FAT size is 0"));
        }

        let total_sectors = if bpb.tot_sec_16() != 0 {
            bpb.tot_sec_16() as u32
        } else {
            bpb.tot_sec_32()
        };

        let root_dir_sectors =
            (bpb.root_ent_cnt() as u32 * 32).div_ceil(bytes_per_sector as u32);

        let fat_start = bpb.rsvd_sec_cnt() as u32;
        let root_start = (fat_count as u32)
            .checked_mul(fat_size)
            .and_then(|fats| fats.checked_add(fat_start))
            .ok_or_else(|| geometry("FAT region overflows"))?;
        let data_start = root_start
            .checked_add(root_dir_sectors)
            .ok_or_else(|| geometry("root directory region overflows"))?;

        let data_sectors = total_sectors.checked_sub(data_start).ok_or_else(|| {
            FATError::InvalidGeometry(format!(
                "metadata regions end at sector {data_start}, beyond the {total_sectors} sectors of the volume"
            ))
        })?;
        let cluster_count = data_sectors / sectors_per_cluster as u32;
        if cluster_count == 0 {
            return Err(geometry("data region holds no cluster"));
        }

        Ok(VolumeLayout {
            bytes_per_sector,
            sectors_per_cluster,
            fat_count,
            root_entry_count: bpb.root_ent_cnt(),
            total_sectors,
            fat_size,
            fat_start,
            root_start,
            root_dir_sectors,
            data_start,
            cluster_count,
            fat_type: FATType::from_cluster_count(cluster_count),
            root_cluster: 0,
        })
    }

    /// Sets the first cluster of a FAT32 root directory.
    pub(super) fn with_root_cluster(mut self, root_cluster: u32) -> Self {
        self.root_cluster = root_cluster;
        self
    }

    /// Size of a cluster in bytes.
    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }

    /// Highest valid cluster number.
    pub fn max_cluster(&self) -> u32 {
        self.cluster_count + 1
    }

    /// Checks whether `cluster` addresses the data region.
    pub fn is_data_cluster(&self, cluster: u32) -> bool {
        (2..=self.max_cluster()).contains(&cluster)
    }

    /// First sector past the data region.
    pub fn data_end(&self) -> u64 {
        self.data_start as u64 + self.cluster_count as u64 * self.sectors_per_cluster as u64
    }

    /// Returns the first sector of a data cluster.
    ///
    /// # Errors
    /// Returns `FATError::InvalidClusterError` for the reserved clusters 0 and 1 and for
    /// clusters past the end of the data region.
    pub fn sector_for_cluster(&self, cluster: u32) -> Result<u64, FATError> {
        if !self.is_data_cluster(cluster) {
            return Err(FATError::InvalidClusterError(cluster));
        }

        Ok(self.data_start as u64 + (cluster as u64 - 2) * self.sectors_per_cluster as u64)
    }

    /// Locates the FAT entry of `cluster` in the first FAT.
    ///
    /// # Returns
    /// The absolute sector holding the first byte of the entry, and the byte offset of the
    /// entry in that sector. A FAT12 entry may continue in the next sector.
    pub fn fat_entry_location(&self, cluster: u32) -> (u64, usize) {
        let offset = self.fat_type.entry_offset(cluster);
        let bps = self.bytes_per_sector as u64;

        (
            self.fat_start as u64 + offset / bps,
            (offset % bps) as usize,
        )
    }
}
