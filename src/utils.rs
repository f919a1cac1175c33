use std::io;
use std::io::{Read, Seek, SeekFrom};

/// Reads a specific sector from a seekable image into a buffer.
///
/// # Arguments
///
/// - `reader`: A mutable reference to the image to read from.
/// - `sector`: The sector number to read.
/// - `sector_size`: The size in bytes of a sector.
/// - `buffer`: A mutable reference to a vector where the sector data will be stored.
///
/// The buffer will be resized to match the sector size.
///
/// # Errors
///
/// Returns an `io::Error` if the sector offset overflows or the sector cannot be read.
pub fn read_sector<T: Read + Seek>(
    reader: &mut T,
    sector: u64,
    sector_size: usize,
    buffer: &mut Vec<u8>,
) -> io::Result<()> {
    buffer.resize(sector_size, 0);

    let offset = (sector_size as u64).checked_mul(sector).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Sector {sector} lies beyond the addressable range"),
        )
    })?;
    reader.seek(SeekFrom::Start(offset))?;

    reader.read_exact(buffer).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Failed to read sector {sector}: {err}"),
        )
    })?;

    Ok(())
}

/// Extracts a 32-bit unsigned integer from a buffer at a given offset.
///
/// # Panics
///
/// Panics if the slice does not contain enough bytes starting from the offset.
pub fn u32_at(buffer: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ])
}

/// Extracts a 16-bit unsigned integer from a buffer at a given offset.
///
/// # Panics
///
/// Panics if the slice does not contain enough bytes starting from the offset.
pub fn u16_at(buffer: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buffer[offset], buffer[offset + 1]])
}

/// Converts a fixed-size on-disk string to text, one character per byte, trimming the
/// space padding.
pub fn padded_str(raw: &[u8]) -> String {
    raw.iter()
        .map(|b| *b as char)
        .collect::<String>()
        .trim_end_matches([' ', '\0'])
        .to_string()
}
