//! Per-draw constant blocks of the model shaders

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Vec3, Vec4};
use crate::render::pipeline::BlendFactor;

/// Depth reference the model shaders compare against
pub const Z_TEST_REF: f32 = -3000.0;

/// `ModelViewProj` block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelViewSettings {
    /// Model matrix, transposed
    pub model: [[f32; 4]; 4],
    /// View-projection, transposed
    pub view_proj: [[f32; 4]; 4],
}

/// `ModelSettings` block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ModelSettings {
    /// Terrain light position
    pub light_position: [f32; 4],
    /// Body light after premultiplication
    pub body_light: [f32; 4],
    /// Body origin, w is zero
    pub body_origin: [f32; 4],
    /// First bone in the skeleton texture
    pub bone_offset: f32,
    /// Normal extrusion, unused by models
    pub normal_scale: f32,
    /// 1 when lighting applies
    pub enable_light: f32,
    /// Alpha test threshold
    pub alpha_test: f32,
    /// 1 when the shader premultiplies alpha
    pub premultiply_alpha: f32,
    /// World time in milliseconds
    pub world_time: f32,
    /// Depth reference
    pub z_test_ref: f32,
    /// Padding
    pub dummy1: f32,
    /// Texture coordinate offset for blended textures
    pub blend_tex_coord: [f32; 2],
    /// Padding
    pub dummy2: f32,
    /// Padding
    pub dummy3: f32,
}

/// Body light as uploaded: either `(rgb * a, 1)` or `(rgb, a)`
pub fn body_light_uniform(light: &Vec3, alpha: f32, premultiply_light: bool) -> [f32; 4] {
    if premultiply_light {
        [light.x * alpha, light.y * alpha, light.z * alpha, 1.0]
    } else {
        [light.x, light.y, light.z, alpha]
    }
}

/// Whether the shader must premultiply alpha itself
///
/// Opaque textures need it whenever a source blend factor is set; textures
/// with alpha need it unless the blend already scales by source alpha.
pub fn needs_premultiplied_alpha(requested: bool, has_alpha: bool, src_blend: BlendFactor) -> bool {
    requested
        && if has_alpha {
            !matches!(src_blend, BlendFactor::SrcAlpha | BlendFactor::SrcAlphaSat)
        } else {
            src_blend != BlendFactor::Undefined
        }
}

/// Flatten a vector into a shader `float4`
pub fn vec4_array(v: &Vec4) -> [f32; 4] {
    [v.x, v.y, v.z, v.w]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sizes() {
        assert_eq!(std::mem::size_of::<ModelViewSettings>(), 128);
        assert_eq!(std::mem::size_of::<ModelSettings>(), 96);
    }

    #[test]
    fn test_body_light_premultiply() {
        let light = Vec3::new(0.5, 1.0, 0.25);
        assert_eq!(body_light_uniform(&light, 0.5, true), [0.25, 0.5, 0.125, 1.0]);
        assert_eq!(body_light_uniform(&light, 0.5, false), [0.5, 1.0, 0.25, 0.5]);
    }

    #[test]
    fn test_premultiply_alpha_rule() {
        assert!(!needs_premultiplied_alpha(false, false, BlendFactor::One));
        assert!(needs_premultiplied_alpha(true, false, BlendFactor::One));
        assert!(!needs_premultiplied_alpha(true, false, BlendFactor::Undefined));
        assert!(needs_premultiplied_alpha(true, true, BlendFactor::One));
        assert!(!needs_premultiplied_alpha(true, true, BlendFactor::SrcAlpha));
        assert!(!needs_premultiplied_alpha(true, true, BlendFactor::SrcAlphaSat));
    }
}
