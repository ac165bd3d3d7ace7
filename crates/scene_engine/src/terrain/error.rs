//! Terrain load errors

use thiserror::Error;

use crate::assets::AssetError;
use crate::config::ConfigError;
use crate::render::RenderError;

/// Why a terrain asset failed to load.
///
/// Every variant is fatal to the asset being loaded; [`Terrain::load`](super::Terrain::load)
/// stops at the first one.
#[derive(Error, Debug)]
pub enum TerrainError {
    /// File missing, unreadable or undecodable
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Device refused to create a resource
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Terrain definition could not be read
    #[error(transparent)]
    Definition(#[from] ConfigError),

    /// Raster is not `TERRAIN_SIZE` square
    #[error("{what} must be 256x256, got {width}x{height}")]
    InvalidDimensions {
        /// Which raster
        what: &'static str,
        /// Decoded width
        width: u32,
        /// Decoded height
        height: u32,
    },

    /// Heightmap bitmap is not 8 bits per pixel
    #[error("heightmap must be 8 bits per pixel, got {0}")]
    InvalidBitsPerPixel(u16),

    /// Heightmap bitmap layout the loader does not read
    #[error("unsupported heightmap bitmap: {0}")]
    UnsupportedBitmap(String),

    /// File ends before its payload does
    #[error("{what} truncated: need {needed} bytes, got {actual}")]
    Truncated {
        /// Which file
        what: &'static str,
        /// Bytes required
        needed: usize,
        /// Bytes available
        actual: usize,
    },

    /// Attribute file size matches neither known layout
    #[error("invalid attributes size ({0} bytes)")]
    InvalidAttributesSize(usize),

    /// Attribute header is not version 0 with a 255x255 grid
    #[error("invalid attributes header (version {version}, {width}x{height})")]
    InvalidAttributesHeader {
        /// Header version
        version: u8,
        /// Declared width
        width: u8,
        /// Declared height
        height: u8,
    },

    /// A texture list with no entries
    #[error("{0} list is empty")]
    EmptyTextureList(&'static str),

    /// A step ran before the data it depends on was loaded
    #[error("{0} has not been loaded")]
    NotLoaded(&'static str),
}
