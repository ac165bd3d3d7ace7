//! Per-cell face normals

use crate::foundation::math::Vec3;

use super::{mask_index, TERRAIN_SCALE, TERRAIN_SIZE};

/// Normal of the cell at `(x, y)` from the triangle to its upper right.
///
/// Neighbours past the last row or column wrap around through the grid mask.
pub fn cell_normal(heights: &[f32], x: u32, y: u32) -> Vec3 {
    let height = |x: u32, y: u32| heights[mask_index(x, y)];
    let (fx, fy) = (x as f32 * TERRAIN_SCALE, y as f32 * TERRAIN_SCALE);
    let (nx, ny) = ((x + 1) as f32 * TERRAIN_SCALE, (y + 1) as f32 * TERRAIN_SCALE);

    let p1 = Vec3::new(nx, fy, height(x + 1, y));
    let p2 = Vec3::new(nx, ny, height(x + 1, y + 1));
    let p3 = Vec3::new(fx, ny, height(x, y + 1));

    (p2 - p1).cross(&(p3 - p1)).normalize()
}

/// Normals for every cell, row-major
pub fn generate_normals(heights: &[f32]) -> Vec<Vec3> {
    (0..TERRAIN_SIZE)
        .flat_map(|y| (0..TERRAIN_SIZE).map(move |x| (x, y)))
        .map(|(x, y)| cell_normal(heights, x, y))
        .collect()
}

/// Pack normals as `Rgba16Unorm` texels of `(n, 0)`.
///
/// Negative components clamp to zero.
pub fn pack_normals(normals: &[Vec3]) -> Vec<[u16; 4]> {
    let unorm = |v: f32| (v.clamp(0.0, 1.0) * f32::from(u16::MAX)).round() as u16;
    normals
        .iter()
        .map(|n| [unorm(n.x), unorm(n.y), unorm(n.z), 0])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TERRAIN_CELLS;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_field_points_up() {
        let heights = vec![42.0; TERRAIN_CELLS];
        let normals = generate_normals(&heights);
        assert_eq!(normals.len(), TERRAIN_CELLS);
        for normal in [normals[0], normals[1000], normals[TERRAIN_CELLS - 1]] {
            assert_relative_eq!(normal, Vec3::z(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_slope_tilts_against_rise() {
        // height rises by one scale unit per column
        let heights: Vec<f32> = (0..TERRAIN_CELLS)
            .map(|i| (i % TERRAIN_SIZE as usize) as f32 * TERRAIN_SCALE)
            .collect();
        let normal = cell_normal(&heights, 10, 10);
        let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
        assert_relative_eq!(normal, expected, epsilon = 1e-5);
    }

    #[test]
    fn test_pack_clamps_negative() {
        let packed = pack_normals(&[Vec3::new(-0.5, 0.5, 1.0)]);
        assert_eq!(packed[0], [0, 32768, 65535, 0]);
    }
}
