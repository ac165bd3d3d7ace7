//! Animation cursor component

use crate::render::skeleton::AnimationFrame;

/// Current and prior action/frame pair driving the interpolated pose
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Animation {
    /// Action being played
    pub current_action: u16,
    /// Action played on the previous tick
    pub prior_action: u16,
    /// Frame within the current action
    pub current_frame: f32,
    /// Frame within the prior action
    pub prior_frame: f32,
}

impl Animation {
    /// Start playing `action` from frame 0
    pub fn playing(action: u16) -> Self {
        Self {
            current_action: action,
            prior_action: action,
            ..Default::default()
        }
    }

    /// Current action and frame
    pub fn current(&self) -> AnimationFrame {
        AnimationFrame { action: self.current_action, frame: self.current_frame }
    }

    /// Prior action and frame
    pub fn prior(&self) -> AnimationFrame {
        AnimationFrame { action: self.prior_action, frame: self.prior_frame }
    }
}
