//! Body light component
//!
//! A closed set of light sources, resolved once per visible entity per tick.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Vec3, Vec4};
use crate::terrain::Terrain;

/// How an entity's body light is obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Light {
    /// Sampled from the terrain lightmap under the entity, plus a bias color
    Terrain {
        /// Added to the sampled light
        color: Vec3,
        /// Sample the per-tick primary layer instead of the static back layer
        primary: bool,
    },
    /// Constant color
    Fixed {
        /// Light color
        color: Vec3,
    },
    /// Grey level pulsing with world time
    SinWorldTime {
        /// Scale applied to world time before `sin`
        time_multiplier: f32,
        /// Amplitude
        multiplier: f32,
        /// Offset
        add: f32,
    },
}

impl Default for Light {
    fn default() -> Self {
        Self::Fixed { color: Vec3::new(1.0, 1.0, 1.0) }
    }
}

/// Shared inputs needed to resolve a [`Light`]
#[derive(Clone, Copy)]
pub struct LightEnvironment<'a> {
    /// Terrain sampled by terrain lights
    pub terrain: &'a Terrain,
    /// World time in milliseconds
    pub world_time: f32,
}

impl Light {
    /// Body light for an entity standing at `position`; alpha is always 1
    pub fn resolve(&self, position: &Vec3, environment: &LightEnvironment<'_>) -> Vec4 {
        match *self {
            Self::Terrain { color, primary } => {
                let sampled = if primary {
                    environment.terrain.calculate_primary_light(position.x, position.y)
                } else {
                    environment.terrain.calculate_back_light(position.x, position.y)
                };
                (color + sampled).push(1.0)
            }
            Self::Fixed { color } => color.push(1.0),
            Self::SinWorldTime { time_multiplier, multiplier, add } => {
                let luminosity = (environment.world_time * time_multiplier).sin() * multiplier + add;
                Vec4::new(luminosity, luminosity, luminosity, 1.0)
            }
        }
    }
}
