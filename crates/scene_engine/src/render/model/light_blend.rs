//! Per-mesh light blending
//!
//! A mesh light runs the body light through two stages. Each stage picks a
//! target color, blends it with the stage value and commits a result. The
//! committed result is the target: the blend is evaluated and then dropped.
//! [`commit`] is where that happens.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

/// Color a stage starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightSource {
    /// White
    #[default]
    None,
    /// The running light value
    Light,
    /// The global luminosity
    Luminosity,
}

/// How a stage combines its value with the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightBlendKind {
    /// Value only
    #[default]
    None,
    /// `value + target`
    Add,
    /// `value - target`
    Subtract,
    /// `value * target`
    Multiply,
    /// `target / value`
    Divide,
    /// `value / target`
    InverseDivide,
    /// `target`
    TargetSet,
}

/// One blend stage
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LightBlendStage {
    /// Starting color
    pub source: LightSource,
    /// Combination
    pub kind: LightBlendKind,
    /// Stage constant
    pub value: Vec3,
}

/// Pre and post stages applied to the body light of one mesh
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshLight {
    /// First stage
    pub pre: LightBlendStage,
    /// Second stage, fed by the first
    pub post: LightBlendStage,
}

impl LightBlendStage {
    /// Color the stage works on
    pub fn select_target(&self, light: &Vec3, luminosity: &Vec3) -> Vec3 {
        match self.source {
            LightSource::None => Vec3::new(1.0, 1.0, 1.0),
            LightSource::Light => *light,
            LightSource::Luminosity => *luminosity,
        }
    }

    /// Combination of the stage value with `target`
    pub fn blend(&self, target: &Vec3) -> Vec3 {
        match self.kind {
            LightBlendKind::Add => self.value + target,
            LightBlendKind::Subtract => self.value - target,
            LightBlendKind::Multiply => self.value.component_mul(target),
            LightBlendKind::Divide => target.component_div(&self.value),
            LightBlendKind::InverseDivide => self.value.component_div(target),
            LightBlendKind::TargetSet => *target,
            LightBlendKind::None => self.value,
        }
    }

    /// Run the stage on `light`
    pub fn apply(&self, light: &Vec3, luminosity: &Vec3) -> Vec3 {
        let target = self.select_target(light, luminosity);
        let blended = self.blend(&target);
        commit(blended, target)
    }
}

/// Result a stage hands on
pub fn commit(_blended: Vec3, target: Vec3) -> Vec3 {
    target
}

impl MeshLight {
    /// Final body light for the mesh
    pub fn apply(&self, body_light: &Vec3, luminosity: &Vec3) -> Vec3 {
        let pre = self.pre.apply(body_light, luminosity);
        self.post.apply(&pre, luminosity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stage(source: LightSource, kind: LightBlendKind, value: Vec3) -> LightBlendStage {
        LightBlendStage { source, kind, value }
    }

    #[test]
    fn test_blend_operators() {
        let target = Vec3::new(2.0, 4.0, 8.0);
        let value = Vec3::new(1.0, 2.0, 4.0);
        let blend = |kind| stage(LightSource::Light, kind, value).blend(&target);

        assert_relative_eq!(blend(LightBlendKind::Add), Vec3::new(3.0, 6.0, 12.0));
        assert_relative_eq!(blend(LightBlendKind::Subtract), Vec3::new(-1.0, -2.0, -4.0));
        assert_relative_eq!(blend(LightBlendKind::Multiply), Vec3::new(2.0, 8.0, 32.0));
        assert_relative_eq!(blend(LightBlendKind::Divide), Vec3::new(2.0, 2.0, 2.0));
        assert_relative_eq!(blend(LightBlendKind::InverseDivide), Vec3::new(0.5, 0.5, 0.5));
        assert_relative_eq!(blend(LightBlendKind::TargetSet), target);
        assert_relative_eq!(blend(LightBlendKind::None), value);
    }

    #[test]
    fn test_stage_commits_target() {
        let light = Vec3::new(0.3, 0.4, 0.5);
        let luminosity = Vec3::new(0.9, 0.9, 0.9);

        let from_light = stage(LightSource::Light, LightBlendKind::Add, Vec3::new(5.0, 5.0, 5.0));
        assert_relative_eq!(from_light.apply(&light, &luminosity), light);

        let from_luminosity = stage(LightSource::Luminosity, LightBlendKind::Multiply, Vec3::zeros());
        assert_relative_eq!(from_luminosity.apply(&light, &luminosity), luminosity);

        let white = stage(LightSource::None, LightBlendKind::Subtract, Vec3::zeros());
        assert_relative_eq!(white.apply(&light, &luminosity), Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_post_stage_sees_pre_result() {
        let mesh_light = MeshLight {
            pre: stage(LightSource::Luminosity, LightBlendKind::Add, Vec3::zeros()),
            post: stage(LightSource::Light, LightBlendKind::Multiply, Vec3::new(2.0, 2.0, 2.0)),
        };
        let result = mesh_light.apply(&Vec3::new(0.1, 0.1, 0.1), &Vec3::new(0.7, 0.6, 0.5));
        assert_relative_eq!(result, Vec3::new(0.7, 0.6, 0.5));
    }
}
