//! Terrain vertex and index buffers
//!
//! Every cell owns a quad of four vertices that carry only the corner and
//! the cell coordinates; positions, heights and UVs are fetched in the
//! vertex shader. The last row and column of quads are never indexed.

use bytemuck::{Pod, Zeroable};

use crate::render::api::{BackendResult, BindFlags, BufferDesc, BufferHandle, GraphicsDevice};

use super::{TERRAIN_INDEX_COUNT, TERRAIN_SIZE};

/// One quad corner
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct TerrainVertex {
    /// Corner x within the cell (0 or 1)
    pub corner_x: u8,
    /// Corner y within the cell (0 or 1)
    pub corner_y: u8,
    /// Cell column
    pub cell_x: u8,
    /// Cell row
    pub cell_y: u8,
}

const QUAD: [(u8, u8); 4] = [(0, 0), (1, 0), (1, 1), (0, 1)];

/// Four vertices per cell, row-major
pub fn terrain_vertices() -> Vec<TerrainVertex> {
    let cells = (0..TERRAIN_SIZE).flat_map(|y| (0..TERRAIN_SIZE).map(move |x| (x as u8, y as u8)));
    cells
        .flat_map(|(cell_x, cell_y)| {
            QUAD.iter().map(move |&(corner_x, corner_y)| TerrainVertex { corner_x, corner_y, cell_x, cell_y })
        })
        .collect()
}

/// Two triangles per drawn cell
pub fn terrain_indices() -> Vec<u32> {
    let mut indices = Vec::with_capacity(TERRAIN_INDEX_COUNT as usize);
    let mut vertex = 0;
    for _ in 0..TERRAIN_SIZE - 1 {
        for _ in 0..TERRAIN_SIZE - 1 {
            indices.extend_from_slice(&[vertex, vertex + 1, vertex + 2, vertex, vertex + 2, vertex + 3]);
            vertex += 4;
        }
        // skip the undrawn last quad of the row
        vertex += 4;
    }
    indices
}

/// Immutable vertex and index buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainGeometry {
    /// Quad corners
    pub vertex_buffer: BufferHandle,
    /// 32-bit indices
    pub index_buffer: BufferHandle,
}

impl TerrainGeometry {
    /// Upload both buffers
    pub fn new(device: &mut dyn GraphicsDevice) -> BackendResult<Self> {
        let vertices = terrain_vertices();
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let vertex_buffer = device.create_buffer(
            &BufferDesc::immutable("TerrainVertices", vertex_bytes.len(), BindFlags::VERTEX_BUFFER),
            Some(vertex_bytes),
        )?;

        let indices = terrain_indices();
        let index_bytes: &[u8] = bytemuck::cast_slice(&indices);
        let index_buffer = match device.create_buffer(
            &BufferDesc::immutable("TerrainIndices", index_bytes.len(), BindFlags::INDEX_BUFFER),
            Some(index_bytes),
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                device.release_buffer(vertex_buffer);
                return Err(e);
            }
        };

        Ok(Self { vertex_buffer, index_buffer })
    }

    /// Release both buffers
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.release_buffer(self.vertex_buffer);
        device.release_buffer(self.index_buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::RecordingDevice;

    #[test]
    fn test_vertex_layout() {
        let vertices = terrain_vertices();
        assert_eq!(vertices.len(), 4 * 256 * 256);
        assert_eq!(vertices[2], TerrainVertex { corner_x: 1, corner_y: 1, cell_x: 0, cell_y: 0 });
        // second row starts after 256 quads
        assert_eq!(vertices[4 * 256 + 3], TerrainVertex { corner_x: 0, corner_y: 1, cell_x: 0, cell_y: 1 });
    }

    #[test]
    fn test_index_layout() {
        let indices = terrain_indices();
        assert_eq!(indices.len(), TERRAIN_INDEX_COUNT as usize);
        assert_eq!(&indices[..6], &[0, 1, 2, 0, 2, 3]);
        // first cell of the second row skips the last quad of the first
        let row = 255 * 6;
        assert_eq!(indices[row], 4 * 256);
        let max = indices.iter().copied().max().unwrap();
        assert!((max as usize) < 4 * 256 * 256);
    }

    #[test]
    fn test_buffers_created() {
        let mut device = RecordingDevice::new();
        let geometry = TerrainGeometry::new(&mut device).unwrap();
        assert_eq!(device.buffer(geometry.vertex_buffer).unwrap().data.len(), 4 * 4 * 256 * 256);
        assert_eq!(device.buffer(geometry.index_buffer).unwrap().data.len(), 4 * TERRAIN_INDEX_COUNT as usize);

        geometry.release(&mut device);
        assert_eq!(device.buffer_count(), 0);
    }
}
