//! Heightmap decoding
//!
//! Heights are one palette index per cell, rows bottom-up. The legacy `.ozb`
//! container is read raw past its header; anything else must be an
//! uncompressed 8 bpp bitmap, whose header is parsed here because a generic
//! decoder would expand the palette.

use super::{TerrainError, TERRAIN_CELLS, TERRAIN_SIZE};

/// Legacy wrapper plus bitmap file, info and palette headers
pub const OZB_HEADER_SIZE: usize = 4 + 1080;

const BITMAP_HEADER_SIZE: usize = 14 + 40;

/// Decode a heightmap file into `TERRAIN_CELLS` raw bytes
pub fn decode_heightmap(extension: &str, bytes: &[u8]) -> Result<Vec<u8>, TerrainError> {
    if extension == "ozb" {
        let cells = bytes
            .get(OZB_HEADER_SIZE..OZB_HEADER_SIZE + TERRAIN_CELLS)
            .ok_or(TerrainError::Truncated {
                what: "heightmap",
                needed: OZB_HEADER_SIZE + TERRAIN_CELLS,
                actual: bytes.len(),
            })?;
        return Ok(cells.to_vec());
    }

    decode_bitmap(bytes)
}

/// World heights from raw cells
pub fn to_heights(cells: &[u8], multiplier: f32) -> Vec<f32> {
    cells.iter().map(|&cell| f32::from(cell) * multiplier).collect()
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    bytes.get(at..at + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    bytes.get(at..at + 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn decode_bitmap(bytes: &[u8]) -> Result<Vec<u8>, TerrainError> {
    if bytes.len() < BITMAP_HEADER_SIZE {
        return Err(TerrainError::Truncated {
            what: "heightmap header",
            needed: BITMAP_HEADER_SIZE,
            actual: bytes.len(),
        });
    }
    if &bytes[0..2] != b"BM" {
        return Err(TerrainError::UnsupportedBitmap("missing BM signature".into()));
    }

    let header = |at| read_u32(bytes, at).unwrap_or_default();
    let pixel_offset = header(10) as usize;
    let width = header(18) as i32;
    let height = header(22) as i32;
    let bits_per_pixel = read_u16(bytes, 28).unwrap_or_default();
    let compression = header(30);

    let size = TERRAIN_SIZE as i32;
    if width != size || height.abs() != size {
        return Err(TerrainError::InvalidDimensions {
            what: "heightmap",
            width: width.unsigned_abs(),
            height: height.unsigned_abs(),
        });
    }
    if bits_per_pixel != 8 {
        return Err(TerrainError::InvalidBitsPerPixel(bits_per_pixel));
    }
    if compression != 0 {
        return Err(TerrainError::UnsupportedBitmap(format!("compression mode {compression}")));
    }

    // rows are padded to four bytes
    let pitch = (width as usize * usize::from(bits_per_pixel)).div_ceil(32) * 4;
    if pitch != TERRAIN_SIZE as usize {
        return Err(TerrainError::UnsupportedBitmap(format!("row pitch {pitch}")));
    }

    let pixels = bytes
        .get(pixel_offset..pixel_offset + TERRAIN_CELLS)
        .ok_or(TerrainError::Truncated {
            what: "heightmap",
            needed: pixel_offset + TERRAIN_CELLS,
            actual: bytes.len(),
        })?;

    if height < 0 {
        // top-down bitmap, store bottom-up like every other raster
        return Ok(pixels.chunks_exact(pitch).rev().flatten().copied().collect());
    }
    Ok(pixels.to_vec())
}
