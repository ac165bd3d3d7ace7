//! Lightmap decoding and sun shading

use image::ImageFormat;

use crate::assets::ImageData;
use crate::foundation::math::Vec3;

use super::{TerrainError, TERRAIN_SIZE};

/// Legacy header in front of the JPEG stream of `.ozj` files
pub const OZJ_HEADER_SIZE: usize = 24;

/// Decode a lightmap into RGBA8 texels, rows bottom-up
pub fn decode_lightmap(extension: &str, bytes: &[u8]) -> Result<Vec<u8>, TerrainError> {
    let skip = if extension == "ozj" { OZJ_HEADER_SIZE } else { 0 };
    let payload = bytes.get(skip..).ok_or(TerrainError::Truncated {
        what: "lightmap",
        needed: skip,
        actual: bytes.len(),
    })?;

    let image = ImageData::from_bytes_with_format(payload, ImageFormat::Jpeg)?;
    if image.width != TERRAIN_SIZE || image.height != TERRAIN_SIZE {
        return Err(TerrainError::InvalidDimensions {
            what: "lightmap",
            width: image.width,
            height: image.height,
        });
    }

    Ok(image.flipped_vertically().data)
}

/// Lightmap color scaled by how much each cell faces the sun.
///
/// `rgb * clamp(dot(normal, sun) + 0.5, 0, 1)`
pub fn shade(texels: &[u8], normals: &[Vec3], sun: &Vec3) -> Vec<Vec3> {
    texels
        .chunks_exact(4)
        .zip(normals)
        .map(|(texel, normal)| {
            let color = Vec3::new(f32::from(texel[0]), f32::from(texel[1]), f32::from(texel[2])) / 255.0;
            color * (normal.dot(sun) + 0.5).clamp(0.0, 1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    fn jpeg(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
        let image = RgbImage::from_fn(width, height, |x, y| image::Rgb(pixel(x, y)));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    #[test]
    fn test_ozj_rows_flipped_bottom_up() {
        // top half white, bottom half black
        let mut bytes = vec![0; OZJ_HEADER_SIZE];
        bytes.extend(jpeg(256, 256, |_, y| if y < 128 { [255; 3] } else { [0; 3] }));

        let texels = decode_lightmap("ozj", &bytes).unwrap();
        assert_eq!(texels.len(), 256 * 256 * 4);
        // first stored row is the bottom of the image
        assert!(texels[0] < 16);
        assert!(texels[(255 * 256) * 4] > 240);
        assert_eq!(texels[3], 255);
    }

    #[test]
    fn test_wrong_size_rejected() {
        let bytes = jpeg(64, 64, |_, _| [128; 3]);
        assert!(matches!(
            decode_lightmap("jpg", &bytes),
            Err(TerrainError::InvalidDimensions { what: "lightmap", width: 64, height: 64 })
        ));
    }

    #[test]
    fn test_garbage_is_asset_error() {
        assert!(matches!(decode_lightmap("jpg", &[1, 2, 3]), Err(TerrainError::Asset(_))));
    }

    #[test]
    fn test_shade_factor() {
        let texels = [255, 128, 0, 255, 255, 255, 255, 255];
        let sun = Vec3::new(0.5, -0.5, 0.5);
        let normals = [Vec3::z(), -Vec3::z()];

        let light = shade(&texels, &normals, &sun);
        assert_relative_eq!(light[0], Vec3::new(1.0, 128.0 / 255.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(light[1], Vec3::zeros());
    }
}
