//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use fat_recovery::filesystem::file::File;
use fat_recovery::{FATVol, ImageStorage};
use std::io::Cursor;

pub type MemVol = FATVol<ImageStorage<Cursor<Vec<u8>>>>;

pub const SECTOR: usize = 512;
pub const FIRST_FILE_SIZE: usize = 12411;
const FIRST_FILE_LINE: &str = "this is the text in the file this_is_a_test.txt.\n";
pub const DELETED_CONTENT: &[u8] = b"deleted data";

/// FAT entries of the fixture, from entry 0.
const FAT: [u16; 32] = [
    0xFFF0, 0xFFFF, // reserved
    0x0003, 0x0004, 0x0005, 0x0006, 0x0007, 0x0008, 0xFFFF, // this_is_a_test.txt
    0x000A, 0x0014, // test2.txt, continued at 0x14
    0x000C, 0x000D, 0x000E, 0x000F, 0x0010, 0x0011, 0xFFFF, // this_is_a_test_also.txt
    0x0000, 0xFFFF, // free, deleted.txt
    0x0015, 0x0016, 0x0019, 0xFFF7, 0xFFF7, 0x001A, 0xFFFF, // rest of test2.txt
    0x0000, 0x0000, 0xFFF7, 0x0000, 0x0000,
];

/// Content of `this_is_a_test.txt`.
pub fn first_file_content() -> Vec<u8> {
    FIRST_FILE_LINE
        .bytes()
        .cycle()
        .take(FIRST_FILE_SIZE)
        .collect()
}

/// Long-name fragment with its 13 code units: the text, a 0x0000 terminator if room is
/// left, then 0xFFFF padding.
fn lfn_slot(ord: u8, text: &str, checksum: u8) -> [u8; 32] {
    let mut units: Vec<u16> = text.encode_utf16().collect();
    if units.len() < 13 {
        units.push(0);
    }
    units.resize(13, 0xFFFF);

    let mut slot = [0u8; 32];
    slot[0] = ord;
    slot[11] = 0x0F;
    slot[13] = checksum;
    let offsets = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];
    for (unit, off) in units.iter().zip(offsets) {
        slot[off..off + 2].copy_from_slice(&unit.to_le_bytes());
    }
    slot
}

fn short_slot(name: &[u8; 11], attr: u8, cluster: u16, size: u32) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[..11].copy_from_slice(name);
    slot[11] = attr;
    slot[26..28].copy_from_slice(&cluster.to_le_bytes());
    slot[28..32].copy_from_slice(&size.to_le_bytes());
    slot
}

fn put(image: &mut [u8], sector: usize, slot: usize, bytes: &[u8; 32]) {
    let off = sector * SECTOR + slot * 32;
    image[off..off + 32].copy_from_slice(bytes);
}

/// A small FAT16 volume.
///
/// - sector 0: boot sector (512 B sectors, 4 sectors per cluster, 1 FAT of 1 sector,
///   32 root entries, 32516 sectors: 8128 clusters)
/// - sector 1: the FAT
/// - sectors 2-3: the root directory
/// - sector 4 onwards: the data region, cluster 2 first
///
/// The root directory holds `this_is_a_test.txt`, `test2.txt`,
/// `this_is_a_test_also.txt` (whose long name straddles the two root sectors) and a
/// deleted `deleted.txt`. Only the image bytes that are read are stored.
pub fn fat16_fixture() -> Vec<u8> {
    let mut image = vec![0u8; 128 * SECTOR];

    let boot = &mut image[..SECTOR];
    boot[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
    boot[3..11].copy_from_slice(b"MSWIN4.1");
    boot[11..13].copy_from_slice(&512u16.to_le_bytes());
    boot[13] = 4;
    boot[14..16].copy_from_slice(&1u16.to_le_bytes());
    boot[16] = 1;
    boot[17..19].copy_from_slice(&32u16.to_le_bytes());
    boot[19..21].copy_from_slice(&32516u16.to_le_bytes());
    boot[21] = 0xF8;
    boot[22..24].copy_from_slice(&1u16.to_le_bytes());
    boot[36] = 0x80;
    boot[38] = 0x29;
    boot[39..43].copy_from_slice(&0x0BAD_F00Du32.to_le_bytes());
    boot[43..54].copy_from_slice(b"FIXTURE    ");
    boot[54..62].copy_from_slice(b"FAT16   ");
    boot[510] = 0x55;
    boot[511] = 0xAA;

    for (n, value) in FAT.iter().enumerate() {
        set_fat16_entry(&mut image, n as u32, *value);
    }

    // Root sector 0
    put(&mut image, 2, 0, &lfn_slot(0x42, "t.txt", 125));
    put(&mut image, 2, 1, &lfn_slot(0x01, "this_is_a_tes", 125));
    put(&mut image, 2, 2, &short_slot(b"this_i~1txt", 0x01, 0x02, 12411));
    put(&mut image, 2, 3, &short_slot(b"test2   txt", 0x01, 0x09, 0x000D_0608));
    put(&mut image, 2, 15, &lfn_slot(0x42, "t_also.txt", 93));
    // Root sector 1
    put(&mut image, 3, 0, &lfn_slot(0x01, "this_is_a_tes", 93));
    put(&mut image, 3, 1, &short_slot(b"this_i~2txt", 0x01, 0x0B, 0x000C_0305));
    let mut deleted = short_slot(b"\xE5eleted txt", 0x01, 0x13, 12);
    deleted[13] = b'd';
    put(&mut image, 3, 2, &deleted);

    // this_is_a_test.txt fills clusters 2 to 8, contiguous from sector 4.
    let content = first_file_content();
    image[4 * SECTOR..4 * SECTOR + content.len()].copy_from_slice(&content);

    // deleted.txt lives in cluster 0x13.
    let off = cluster_offset(0x13);
    image[off..off + DELETED_CONTENT.len()].copy_from_slice(DELETED_CONTENT);

    image
}

/// Byte offset of a data cluster of the fixture.
pub fn cluster_offset(cluster: u32) -> usize {
    (4 + (cluster as usize - 2) * 4) * SECTOR
}

/// Overwrites entry `n` of the fixture's FAT.
pub fn set_fat16_entry(image: &mut [u8], n: u32, value: u16) {
    let off = SECTOR + n as usize * 2;
    image[off..off + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn mount(image: Vec<u8>) -> MemVol {
    FATVol::mount(ImageStorage::new(Cursor::new(image)), true).unwrap()
}

/// Reads a file chunk by chunk until the end, returning the chunks.
pub fn read_chunks(vol: &mut MemVol, file: &mut File) -> Vec<Vec<u8>> {
    let mut chunks = vec![];
    while let Some(chunk) = vol.read_chunk(file).unwrap() {
        chunks.push(chunk);
    }
    chunks
}
