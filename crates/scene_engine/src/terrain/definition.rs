//! Terrain definition document
//!
//! One per world directory, naming the terrain files and listing the ground
//! and grass textures with their water and wind parameters.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// A ground texture layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainTextureEntry {
    /// Id referenced by the mapping file
    pub id: u32,
    /// Image path relative to the world directory
    pub path: String,
    /// Use the scaled UV repeat
    #[serde(default)]
    pub scaled: bool,
    /// Animate as water
    #[serde(default)]
    pub water: bool,
}

/// A grass texture layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrassTextureEntry {
    /// Id referenced by the first mapping plane
    pub id: u32,
    /// Image path relative to the world directory
    pub path: String,
}

/// Water scroll period and speed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterSettings {
    /// World time period
    pub modulus: f32,
    /// Scale applied to the wrapped time
    pub multiplier: f32,
}

impl Default for WaterSettings {
    fn default() -> Self {
        Self { modulus: 1.0, multiplier: 1.0 }
    }
}

/// Grass sway
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSettings {
    /// Sway amplitude
    pub scale: f32,
    /// World time period
    pub modulus: f32,
    /// Scale applied to the wrapped time
    pub multiplier: f32,
}

impl Default for WindSettings {
    fn default() -> Self {
        Self { scale: 10.0, modulus: 1.0, multiplier: 1.0 }
    }
}

/// Files and layers making up one terrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainDefinition {
    /// Heightmap file (`.ozb` or `.bmp`)
    pub heightmap: String,
    /// Lightmap file (`.ozj` or `.jpg`)
    pub lightmap: String,
    /// Encrypted texture mapping file
    pub mapping: String,
    /// Encrypted attribute file
    pub attributes: String,
    /// Ground layers
    pub textures: Vec<TerrainTextureEntry>,
    /// Grass layers; no grass pass is drawn when empty
    pub grass: Vec<GrassTextureEntry>,
    /// Water animation
    pub water: WaterSettings,
    /// Grass animation
    pub wind: WindSettings,
}

impl Default for TerrainDefinition {
    fn default() -> Self {
        Self {
            heightmap: "terrain_height.ozb".to_string(),
            lightmap: "terrain_light.ozj".to_string(),
            mapping: "terrain.map".to_string(),
            attributes: "terrain.att".to_string(),
            textures: Vec::new(),
            grass: Vec::new(),
            water: WaterSettings::default(),
            wind: WindSettings::default(),
        }
    }
}

impl Config for TerrainDefinition {}
