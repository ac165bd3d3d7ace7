//! Texture mapping decoding
//!
//! The mapping file assigns every cell two ground layers and a blend
//! factor between them. Raw ids are remapped to array layers; an id with no
//! layer disables blending for that cell.

use std::collections::HashMap;

use super::crypt::xor_decrypt;
use super::{TerrainError, TERRAIN_CELLS};

/// Layer value for ids without a texture
pub const INVALID_LAYER: u8 = 0xFF;

const HEADER_SIZE: usize = 2;

/// Minimum mapping file size: header plus three planes
pub const MAPPING_FILE_SIZE: usize = HEADER_SIZE + 3 * TERRAIN_CELLS;

/// One cell of the `Rgba8Uint` mapping texture
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MappingCell {
    /// First ground layer
    pub layer1: u8,
    /// Second ground layer
    pub layer2: u8,
    /// Blend from the first layer to the second
    pub alpha: u8,
    /// Grass layer chosen by the first id
    pub grass: u8,
}

fn layer(map: &HashMap<u32, u32>, id: u8) -> u8 {
    map.get(&u32::from(id))
        .and_then(|&layer| u8::try_from(layer).ok())
        .unwrap_or(INVALID_LAYER)
}

/// Decrypt and remap a mapping file
pub fn decode_mappings(
    bytes: &[u8],
    textures: &HashMap<u32, u32>,
    grass: &HashMap<u32, u32>,
) -> Result<Vec<MappingCell>, TerrainError> {
    if bytes.len() < MAPPING_FILE_SIZE {
        return Err(TerrainError::Truncated {
            what: "mapping",
            needed: MAPPING_FILE_SIZE,
            actual: bytes.len(),
        });
    }

    let mut plain = bytes.to_vec();
    xor_decrypt(&mut plain);

    let planes = &plain[HEADER_SIZE..MAPPING_FILE_SIZE];
    let (first, rest) = planes.split_at(TERRAIN_CELLS);
    let (second, alpha) = rest.split_at(TERRAIN_CELLS);

    Ok(first
        .iter()
        .zip(second)
        .zip(alpha)
        .map(|((&id1, &id2), &alpha)| {
            let layer1 = layer(textures, id1);
            let layer2 = layer(textures, id2);
            let alpha = if layer1 == INVALID_LAYER || layer2 == INVALID_LAYER { 0 } else { alpha };
            MappingCell { layer1, layer2, alpha, grass: layer(grass, id1) }
        })
        .collect())
}
