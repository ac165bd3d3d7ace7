//! Cell attributes
//!
//! Attribute files come in two sizes: the legacy layout stores one byte per
//! cell, the extended one two. Both are XOR-encrypted and Bux-converted and
//! start with a four byte header.

use bitflags::bitflags;

use super::crypt::{bux_convert, xor_decrypt};
use super::{TerrainError, TERRAIN_CELLS};

/// Size of a legacy (8-bit) attribute file
pub const ATTRIBUTES_LEGACY_SIZE: usize = 65540;

/// Size of an extended (16-bit) attribute file
pub const ATTRIBUTES_EXTENDED_SIZE: usize = 131_076;

const HEADER_SIZE: usize = 4;
const HEADER_GRID: u8 = 255;

bitflags! {
    /// Gameplay flags of one terrain cell
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TerrainAttribute: u16 {
        /// No combat
        const SAFE_ZONE = 0x01;
        /// Occupied by a character
        const CHARACTER = 0x02;
        /// Not walkable
        const NO_MOVE = 0x04;
        /// No ground to render
        const NO_GROUND = 0x08;
        /// Water surface
        const WATER = 0x10;
        /// Scripted action cell
        const ACTION = 0x20;
        /// Height-blocked
        const HEIGHT = 0x40;
        /// Raise the camera
        const CAMERA_UP = 0x80;
        /// No attacks, extended files only
        const NO_ATTACK_ZONE = 0x100;
    }
}

/// Decrypt and decode an attribute file into raw `u16` cells
pub fn decode_attributes(bytes: &[u8]) -> Result<Vec<u16>, TerrainError> {
    let extended = match bytes.len() {
        ATTRIBUTES_LEGACY_SIZE => false,
        ATTRIBUTES_EXTENDED_SIZE => true,
        size => return Err(TerrainError::InvalidAttributesSize(size)),
    };

    let mut plain = bytes.to_vec();
    xor_decrypt(&mut plain);
    bux_convert(&mut plain);

    let (version, width, height) = (plain[0], plain[2], plain[3]);
    if version != 0 || width != HEADER_GRID || height != HEADER_GRID {
        return Err(TerrainError::InvalidAttributesHeader { version, width, height });
    }

    let body = &plain[HEADER_SIZE..];
    let cells = if extended {
        body.chunks_exact(2)
            .take(TERRAIN_CELLS)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    } else {
        body.iter().take(TERRAIN_CELLS).map(|&cell| u16::from(cell)).collect()
    };
    Ok(cells)
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::terrain::crypt::xor_encrypt;

    /// Encode an attribute file the way the map tools write it
    pub(in crate::terrain) fn attribute_file(header: [u8; 4], cells: &[u16], extended: bool) -> Vec<u8> {
        let mut bytes = header.to_vec();
        for &cell in cells {
            if extended {
                bytes.extend_from_slice(&cell.to_le_bytes());
            } else {
                bytes.push(cell as u8);
            }
        }
        bux_convert(&mut bytes);
        xor_encrypt(&mut bytes);
        bytes
    }

    fn cells(value: u16) -> Vec<u16> {
        vec![value; TERRAIN_CELLS]
    }

    #[test]
    fn test_legacy_cells_widened() {
        let bytes = attribute_file([0, 3, 255, 255], &cells(0x14), false);
        assert_eq!(bytes.len(), ATTRIBUTES_LEGACY_SIZE);

        let decoded = decode_attributes(&bytes).unwrap();
        assert_eq!(decoded.len(), TERRAIN_CELLS);
        let flags = TerrainAttribute::from_bits_retain(decoded[100]);
        assert_eq!(flags, TerrainAttribute::NO_MOVE | TerrainAttribute::WATER);
    }

    #[test]
    fn test_extended_cells() {
        let bytes = attribute_file([0, 3, 255, 255], &cells(0x101), true);
        assert_eq!(bytes.len(), ATTRIBUTES_EXTENDED_SIZE);

        let decoded = decode_attributes(&bytes).unwrap();
        let flags = TerrainAttribute::from_bits_retain(decoded[TERRAIN_CELLS - 1]);
        assert!(flags.contains(TerrainAttribute::NO_ATTACK_ZONE | TerrainAttribute::SAFE_ZONE));
    }

    #[test]
    fn test_size_must_match_exactly() {
        for size in [0, 65539, 65541, 131_075, 131_077] {
            assert!(matches!(
                decode_attributes(&vec![0; size]),
                Err(TerrainError::InvalidAttributesSize(s)) if s == size
            ));
        }
    }

    #[test]
    fn test_header_rejected() {
        for header in [[1, 0, 255, 255], [0, 0, 254, 255], [0, 0, 255, 0]] {
            let bytes = attribute_file(header, &cells(0), false);
            assert!(matches!(
                decode_attributes(&bytes),
                Err(TerrainError::InvalidAttributesHeader { .. })
            ));
        }
    }
}
