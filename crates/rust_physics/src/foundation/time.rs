//! Time management utilities
//!
//! [`Timer`] measures wall-clock frame deltas; [`FixedTimestep`] turns those
//! deltas into a bounded number of fixed physics steps per frame.

use std::time::Instant;

/// High-precision timer for frame timing
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.delta_time = elapsed.as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Fixed-timestep accumulator
///
/// Frame time is banked and spent in whole `fixed_dt` slices. The bank is
/// capped at `max_substeps` slices so a long frame cannot trigger a runaway
/// catch-up spiral; the excess is dropped.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    fixed_dt: f32,
    max_substeps: u32,
    accumulator: f32,
}

impl FixedTimestep {
    /// Create an accumulator for the given step length and per-frame cap
    pub fn new(fixed_dt: f32, max_substeps: u32) -> Self {
        Self {
            fixed_dt,
            max_substeps,
            accumulator: 0.0,
        }
    }

    /// Fixed step length in seconds
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Time banked but not yet simulated
    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    /// Bank `frame_dt` and return how many fixed steps to run now
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        if self.fixed_dt <= 0.0 {
            return 0;
        }

        self.accumulator += frame_dt.max(0.0);
        let cap = self.fixed_dt * self.max_substeps as f32;
        if self.accumulator > cap {
            self.accumulator = cap;
        }

        let mut steps = 0;
        while self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        steps
    }

    /// Drop any banked time
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_timer_counts_frames() {
        let mut timer = Timer::new();
        assert_eq!(timer.frame_count(), 0);
        timer.update();
        timer.update();
        assert_eq!(timer.frame_count(), 2);
        assert!(timer.delta_time() >= 0.0);
        assert!(timer.total_time() >= timer.delta_time());
    }

    #[test]
    fn test_fixed_timestep_banks_partial_frames() {
        let mut clock = FixedTimestep::new(0.02, 3);
        assert_eq!(clock.accumulate(0.01), 0);
        assert_eq!(clock.accumulate(0.015), 1);
        assert_relative_eq!(clock.accumulated(), 0.005, epsilon = 1e-6);
    }

    #[test]
    fn test_fixed_timestep_caps_catch_up() {
        let mut clock = FixedTimestep::new(0.25, 3);
        assert_eq!(clock.accumulate(10.0), 3);
        assert_relative_eq!(clock.accumulated(), 0.0);
    }

    #[test]
    fn test_fixed_timestep_ignores_negative_frames() {
        let mut clock = FixedTimestep::new(0.02, 3);
        assert_eq!(clock.accumulate(-0.5), 0);
        assert_relative_eq!(clock.accumulated(), 0.0);
    }
}
