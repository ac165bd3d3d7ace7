//! Frame timing state
//!
//! The update pipeline is driven by a fixed simulation tick. [`FrameClock`]
//! turns wall-clock time into tick counts and produces the [`FrameState`]
//! snapshot each frame consumes.

use std::time::Duration;

use crate::foundation::math::Vec3;

/// Default simulation rate in ticks per second
pub const DEFAULT_TICK_RATE: f32 = 25.0;

/// Per-frame global state read by the environment, terrain and model renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    /// Whole simulation ticks crossed since the previous frame (0 on frames
    /// that did not reach a tick boundary, and on the very first frame)
    pub update_count: u32,
    /// Elapsed time since the previous frame, in ticks
    pub update_time: f32,
    /// Elapsed world time in milliseconds
    pub world_time: f32,
    /// Global luminosity scalar
    pub luminosity: f32,
}

impl Default for FrameState {
    fn default() -> Self {
        Self {
            update_count: 0,
            update_time: 0.0,
            world_time: 0.0,
            luminosity: 1.0,
        }
    }
}

impl FrameState {
    /// Luminosity broadcast to an rgb vector
    pub fn luminosity_vector(&self) -> Vec3 {
        Vec3::repeat(self.luminosity)
    }
}

/// Accumulates frame durations into simulation ticks
#[derive(Debug, Clone)]
pub struct FrameClock {
    tick_rate: f32,
    tick_accumulator: f32,
    world_time: f32,
    luminosity: f32,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE)
    }
}

impl FrameClock {
    /// Create a clock running at `tick_rate` ticks per second
    pub fn new(tick_rate: f32) -> Self {
        Self {
            tick_rate: tick_rate.max(f32::EPSILON),
            tick_accumulator: 0.0,
            world_time: 0.0,
            luminosity: 1.0,
            frame_count: 0,
        }
    }

    /// Set the luminosity reported by subsequent frames
    pub fn set_luminosity(&mut self, luminosity: f32) {
        self.luminosity = luminosity;
    }

    /// Advance by `elapsed` wall time and return the frame snapshot.
    ///
    /// The first frame never reports ticks so that tick-gated work (terrain
    /// reset and upload) starts from loaded state.
    pub fn advance(&mut self, elapsed: Duration) -> FrameState {
        let seconds = elapsed.as_secs_f32();
        let update_time = seconds * self.tick_rate;
        self.world_time += seconds * 1000.0;

        let update_count = if self.frame_count == 0 {
            0
        } else {
            self.tick_accumulator += update_time;
            let whole = self.tick_accumulator.floor();
            self.tick_accumulator -= whole;
            whole as u32
        };
        self.frame_count += 1;

        FrameState {
            update_count,
            update_time,
            world_time: self.world_time,
            luminosity: self.luminosity,
        }
    }

    /// Number of frames advanced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_frame_has_no_ticks() {
        let mut clock = FrameClock::new(25.0);
        let state = clock.advance(Duration::from_millis(100));
        assert_eq!(state.update_count, 0);
        assert_relative_eq!(state.world_time, 100.0, epsilon = 1e-3);
    }

    #[test]
    fn test_ticks_accumulate_across_frames() {
        let mut clock = FrameClock::new(4.0);
        clock.advance(Duration::from_millis(0));
        // 125ms at 4Hz is half a tick
        assert_eq!(clock.advance(Duration::from_millis(125)).update_count, 0);
        assert_eq!(clock.advance(Duration::from_millis(125)).update_count, 1);
        let state = clock.advance(Duration::from_millis(375));
        assert_eq!(state.update_count, 1);
        assert_relative_eq!(state.update_time, 1.5, epsilon = 1e-5);
        assert_eq!(clock.advance(Duration::from_millis(125)).update_count, 1);
    }
}
