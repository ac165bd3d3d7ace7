//! # Core Module
//!
//! Shared configuration for the scene subsystems.
//!
//! ## Organization
//!
//! - **Config**: Scene, environment, terrain and logging settings

pub mod config;

pub use config::{
    SceneConfig,
    EnvironmentConfig,
    UpdateStrategyKind,
    TerrainConfig,
    LoggingConfig,
    Config,
    ConfigError,
};
