//! # Scene Configuration
//!
//! Configuration for the per-frame scene core. A single [`SceneConfig`]
//! document carries the environment scheduling mode, terrain constants and
//! logging defaults, and can be read from TOML or RON through [`Config`].
//!
//! ## Configuration Categories
//!
//! - **Environment**: which update strategy runs the entity phases
//! - **Terrain**: height multiplier, sun direction and ground texture sampling
//! - **Logging**: default `env_logger` filter

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};
use crate::render::api::{TextureAddress, TextureFilter};
use crate::render::skeleton::DEFAULT_BONE_CAPACITY;

/// Scheduling strategy for the entity update phases.
///
/// All strategies produce identical per-entity results; they differ only in
/// how work is spread across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStrategyKind {
    /// Three sequential passes on the calling thread
    Single,
    /// Contiguous index ranges dispatched to a fixed worker pool, one phase at a time
    #[default]
    Pooled,
    /// A single fused per-entity pass run as a parallel-for
    DataParallel,
}

/// # Environment Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Update strategy, fixed for the lifetime of the environment
    pub strategy: UpdateStrategyKind,
    /// Worker count for the pooled and data-parallel strategies (0 = available parallelism)
    pub worker_threads: usize,
    /// Entities per task in the data-parallel strategy
    pub grain_size: usize,
    /// Bones the shared bone buffer holds per frame
    pub bone_capacity: usize,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            strategy: UpdateStrategyKind::default(),
            worker_threads: 0,
            grain_size: 64,
            bone_capacity: DEFAULT_BONE_CAPACITY,
        }
    }
}

impl EnvironmentConfig {
    /// Builder pattern: Set the update strategy
    pub fn with_strategy(mut self, strategy: UpdateStrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder pattern: Set the worker count
    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = workers;
        self
    }

    /// Builder pattern: Set the data-parallel grain size
    pub fn with_grain_size(mut self, grain_size: usize) -> Self {
        self.grain_size = grain_size;
        self
    }

    /// Worker count with 0 resolved against the machine's parallelism
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

/// # Terrain Configuration
///
/// Load-time constants shared by every terrain in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// World height per heightmap texel unit
    pub height_multiplier: f32,
    /// Sun direction used to shade the lightmap
    pub sun_direction: [f32; 3],
    /// Light position handed to the model shaders
    pub light_position: [f32; 4],
    /// Filter for the ground texture arrays
    pub texture_filter: TextureFilter,
    /// Address mode for the ground texture arrays
    pub texture_address: TextureAddress,
    /// UV repeat for unscaled ground layers
    pub uv_normal: f32,
    /// UV repeat for layers flagged `scaled`
    pub uv_scaled: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            height_multiplier: 1.5,
            sun_direction: [0.5, -0.5, 0.5],
            light_position: [1.3, 0.0, 2.0, 0.0],
            texture_filter: TextureFilter::Anisotropic,
            texture_address: TextureAddress::Wrap,
            uv_normal: 1.0,
            uv_scaled: 2.0,
        }
    }
}

/// # Logging Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter applied when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

/// # Complete Scene Configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Entity update scheduling
    pub environment: EnvironmentConfig,
    /// Terrain constants
    pub terrain: TerrainConfig,
    /// Logging defaults
    pub logging: LoggingConfig,
}

impl SceneConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.grain_size == 0 {
            return Err(ConfigError::Invalid("environment.grain_size must be > 0".into()));
        }
        if self.environment.bone_capacity == 0 {
            return Err(ConfigError::Invalid("environment.bone_capacity must be > 0".into()));
        }
        if !(self.terrain.height_multiplier.is_finite()) {
            return Err(ConfigError::Invalid("terrain.height_multiplier must be finite".into()));
        }
        if self.terrain.uv_normal <= 0.0 || self.terrain.uv_scaled <= 0.0 {
            return Err(ConfigError::Invalid("terrain uv repeats must be positive".into()));
        }
        Ok(())
    }
}

impl Config for SceneConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = SceneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.environment.strategy, UpdateStrategyKind::Pooled);
        assert_relative_eq!(config.terrain.height_multiplier, 1.5);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = SceneConfig::from_toml_str(
            r#"
            [environment]
            strategy = "data_parallel"
            worker_threads = 3

            [terrain]
            height_multiplier = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.environment.strategy, UpdateStrategyKind::DataParallel);
        assert_eq!(config.environment.resolved_worker_threads(), 3);
        assert_eq!(config.environment.grain_size, 64);
        assert_relative_eq!(config.terrain.height_multiplier, 2.0);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_zero_grain_size_rejected() {
        let mut config = SceneConfig::default();
        config.environment.grain_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = SceneConfig::load_from_file("scene.json");
        assert!(result.is_err());
    }
}
