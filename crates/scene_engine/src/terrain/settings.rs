//! Time-driven terrain shader constants

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::utils;
use crate::render::api::{BackendResult, BufferDesc, BufferHandle, GraphicsDevice};

use super::definition::{WaterSettings, WindSettings};

/// `TerrainSettings` constant buffer layout
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct TerrainSettings {
    /// Water texture scroll
    pub water_move: f32,
    /// Grass sway amplitude
    pub wind_scale: f32,
    /// Grass sway phase
    pub wind_speed: f32,
    /// Keeps the block 16 bytes
    pub _padding: f32,
}

impl TerrainSettings {
    /// Constants at `world_time`
    pub fn at(world_time: f32, water: &WaterSettings, wind: &WindSettings) -> Self {
        Self {
            water_move: utils::modulo(world_time, water.modulus) * water.multiplier,
            wind_scale: wind.scale,
            wind_speed: utils::modulo(world_time, wind.modulus) * wind.multiplier,
            _padding: 0.0,
        }
    }
}

/// The terrain constant buffer and the parameters that drive it
#[derive(Debug)]
pub struct SettingsUniform {
    buffer: BufferHandle,
    water: WaterSettings,
    wind: WindSettings,
    current: TerrainSettings,
}

impl SettingsUniform {
    /// Create the dynamic constant buffer
    pub fn new(device: &mut dyn GraphicsDevice, water: WaterSettings, wind: WindSettings) -> BackendResult<Self> {
        let buffer = device.create_buffer(
            &BufferDesc::dynamic_uniform("TerrainSettings", std::mem::size_of::<TerrainSettings>()),
            None,
        )?;
        Ok(Self { buffer, water, wind, current: TerrainSettings::default() })
    }

    /// Recompute for `world_time` and upload with a discard write
    pub fn configure(&mut self, device: &mut dyn GraphicsDevice, world_time: f32) -> BackendResult<()> {
        self.current = TerrainSettings::at(world_time, &self.water, &self.wind);
        device.write_buffer_discard(self.buffer, bytemuck::bytes_of(&self.current))
    }

    /// Last uploaded constants
    pub fn current(&self) -> &TerrainSettings {
        &self.current
    }

    /// Constant buffer handle
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// Release the constant buffer
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        device.release_buffer(self.buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::RecordingDevice;
    use approx::assert_relative_eq;

    #[test]
    fn test_settings_wrap_world_time() {
        let water = WaterSettings { modulus: 4.0, multiplier: 0.5 };
        let wind = WindSettings { scale: 12.0, modulus: 3.0, multiplier: 2.0 };

        let settings = TerrainSettings::at(10.0, &water, &wind);
        assert_relative_eq!(settings.water_move, 1.0);
        assert_relative_eq!(settings.wind_scale, 12.0);
        assert_relative_eq!(settings.wind_speed, 2.0);
    }

    #[test]
    fn test_configure_uploads() {
        let mut device = RecordingDevice::new();
        let mut uniform = SettingsUniform::new(&mut device, WaterSettings::default(), WindSettings::default()).unwrap();
        uniform.configure(&mut device, 2.5).unwrap();

        let recorded = device.buffer(uniform.buffer()).unwrap();
        assert_eq!(recorded.desc.size, 16);
        assert_eq!(recorded.writes, 1);
        let uploaded: TerrainSettings = bytemuck::pod_read_unaligned(&recorded.data);
        assert_relative_eq!(uploaded.water_move, 0.5);
        assert_relative_eq!(uploaded.wind_scale, 10.0);
    }
}
