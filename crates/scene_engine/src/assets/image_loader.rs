//! Image loading utilities for texture data
//!
//! Decodes PNG, JPEG, BMP and TGA images, including the legacy wrapped
//! variants (`.ozj`, `.ozt`, `.ozp`, `.ozb`) that prefix a standard image with
//! a small header.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage, ImageFormat, RgbaImage};

use crate::assets::AssetError;

/// Read a whole file, mapping a missing file to [`AssetError::NotFound`]
pub fn read_file(path: &Path) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AssetError::NotFound(path.display().to_string())
        } else {
            AssetError::IoError(e)
        }
    })
}

/// Lower-cased file extension, empty when absent
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Header bytes to skip and decoder to use for an extension
fn legacy_layout(extension: &str) -> Option<(usize, ImageFormat)> {
    match extension {
        "ozj" => Some((24, ImageFormat::Jpeg)),
        "ozt" => Some((4, ImageFormat::Tga)),
        "ozp" => Some((4, ImageFormat::Png)),
        "ozb" => Some((4, ImageFormat::Bmp)),
        "jpg" | "jpeg" => Some((0, ImageFormat::Jpeg)),
        "tga" => Some((0, ImageFormat::Tga)),
        "png" => Some((0, ImageFormat::Png)),
        "bmp" => Some((0, ImageFormat::Bmp)),
        _ => None,
    }
}

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data, rows top to bottom
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Whether any pixel is less than fully opaque
    pub has_alpha: bool,
}

impl ImageData {
    /// Load an image from a file path, unwrapping legacy headers by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();
        log::debug!("Loading image from: {:?}", path_ref);

        let bytes = read_file(path_ref)?;
        let image = Self::from_legacy_bytes(&extension_of(path_ref), &bytes)?;

        log::debug!("Loaded image {}x{} from {:?}", image.width, image.height, path_ref);
        Ok(image)
    }

    /// Decode bytes whose container is identified by `extension`
    pub fn from_legacy_bytes(extension: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        match legacy_layout(extension) {
            Some((skip, format)) => {
                let payload = bytes.get(skip..).ok_or_else(|| {
                    AssetError::InvalidData(format!(".{extension} file shorter than its {skip} byte header"))
                })?;
                Self::from_bytes_with_format(payload, format)
            }
            None => Self::from_bytes(bytes),
        }
    }

    /// Load image from memory, guessing the format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image from bytes: {e}")))?;
        Ok(Self::from_dynamic(&img))
    }

    /// Load image from memory with an explicit format
    pub fn from_bytes_with_format(bytes: &[u8], format: ImageFormat) -> Result<Self, AssetError> {
        let img = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to decode {format:?} image: {e}")))?;
        Ok(Self::from_dynamic(&img))
    }

    fn from_dynamic(img: &DynamicImage) -> Self {
        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();
        // An alpha channel that is fully opaque everywhere does not count
        let has_alpha = rgba_img.pixels().any(|pixel| pixel.0[3] < 255);

        Self {
            data: rgba_img.into_raw(),
            width,
            height,
            has_alpha,
        }
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);

        for _ in 0..pixel_count {
            data.extend_from_slice(&color);
        }

        Self {
            data,
            width,
            height,
            has_alpha: color[3] < 255,
        }
    }

    /// Bicubic (Catmull-Rom) rescale to `width` x `height`
    pub fn resized(&self, width: u32, height: u32) -> Result<Self, AssetError> {
        if (width, height) == (self.width, self.height) {
            return Ok(self.clone());
        }
        let source = self.to_rgba_image()?;
        let scaled = image::imageops::resize(&source, width, height, FilterType::CatmullRom);

        Ok(Self {
            data: scaled.into_raw(),
            width,
            height,
            has_alpha: self.has_alpha,
        })
    }

    /// Rows in reverse order (bottom-up storage)
    pub fn flipped_vertically(&self) -> Self {
        let row = self.row_pitch();
        let data = self
            .data
            .chunks_exact(row.max(1))
            .rev()
            .flatten()
            .copied()
            .collect();

        Self { data, ..*self }
    }

    fn to_rgba_image(&self) -> Result<RgbaImage, AssetError> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| AssetError::InvalidData("pixel buffer does not match dimensions".into()))
    }

    /// Bytes per row
    pub fn row_pitch(&self) -> usize {
        self.width as usize * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert!(!img.has_alpha);
        assert_eq!(img.data.len(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_opaque_rgba_png_has_no_alpha() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, image::Rgba([9, 8, 7, 255])));
        let img = ImageData::from_bytes(&encode(&source, ImageFormat::Png)).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert!(!img.has_alpha);
    }

    #[test]
    fn test_single_translucent_pixel_sets_alpha() {
        let mut pixels = RgbaImage::from_pixel(3, 2, image::Rgba([9, 8, 7, 255]));
        pixels.put_pixel(2, 1, image::Rgba([9, 8, 7, 254]));
        let img = ImageData::from_bytes(&encode(&DynamicImage::ImageRgba8(pixels), ImageFormat::Png)).unwrap();
        assert!(img.has_alpha);
    }

    #[test]
    fn test_rgb_png_has_no_alpha() {
        let source = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3])));
        let img = ImageData::from_bytes(&encode(&source, ImageFormat::Png)).unwrap();
        assert!(!img.has_alpha);
        assert_eq!(&img.data[0..4], &[1, 2, 3, 255]);
    }

    #[test]
    fn test_legacy_png_header_is_skipped() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 3, image::Rgba([1, 2, 3, 128])));
        let mut wrapped = vec![0xAA; 4];
        wrapped.extend(encode(&source, ImageFormat::Png));

        let img = ImageData::from_legacy_bytes("ozp", &wrapped).unwrap();
        assert_eq!((img.width, img.height), (2, 3));
        assert!(img.has_alpha);
        assert_eq!(&img.data[0..4], &[1, 2, 3, 128]);
    }

    #[test]
    fn test_truncated_legacy_header() {
        let result = ImageData::from_legacy_bytes("ozj", &[0; 10]);
        assert!(matches!(result, Err(AssetError::InvalidData(_))));
    }

    #[test]
    fn test_resize_and_flip() {
        let mut img = ImageData::solid_color(2, 2, [10, 20, 30, 255]);
        img.data[0] = 99; // top-left red
        let flipped = img.flipped_vertically();
        assert_eq!(flipped.data[8], 99);

        let scaled = ImageData::solid_color(2, 2, [40, 40, 40, 255]).resized(8, 4).unwrap();
        assert_eq!((scaled.width, scaled.height), (8, 4));
        assert_eq!(scaled.data.len(), 8 * 4 * 4);
        assert!(scaled.data.chunks(4).all(|p| p[0].abs_diff(40) <= 1 && p[3] >= 254));
    }
}
