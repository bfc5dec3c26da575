//! Frame timing utilities

use std::time::{Duration, Instant};

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
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer (should be called once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.advance(elapsed.as_secs_f32());
        self.last_frame = now;
    }

    /// Advance the timer by a fixed step instead of measuring wall time
    pub fn advance(&mut self, delta_time: f32) {
        self.delta_time = delta_time;
        self.total_time += delta_time;
        self.frame_count += 1;
    }

    /// Restart the measurement window without counting a frame
    pub fn reset_clock(&mut self) {
        self.last_frame = Instant::now();
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

    /// Get the average FPS since timer creation
    #[allow(clippy::cast_precision_loss)]
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }

    /// Get the current FPS (based on last frame time)
    pub fn current_fps(&self) -> f32 {
        if self.delta_time > 0.0 {
            1.0 / self.delta_time
        } else {
            0.0
        }
    }
}

/// Caps the frame rate by sleeping off the rest of each frame budget
pub struct FrameLimiter {
    budget: Option<Duration>,
    frame_start: Instant,
}

impl FrameLimiter {
    /// Create a limiter for the given frame rate; 0 disables limiting
    pub fn new(target_fps: u32) -> Self {
        let budget = (target_fps > 0).then(|| Duration::from_nanos(1_000_000_000 / u64::from(target_fps)));
        Self {
            budget,
            frame_start: Instant::now(),
        }
    }

    /// Frame budget, if limiting is enabled
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Block until the current frame has used its whole budget, then start the next one
    pub fn wait(&mut self) {
        if let Some(budget) = self.budget {
            let spent = self.frame_start.elapsed();
            if spent < budget {
                std::thread::sleep(budget - spent);
            }
        }
        self.frame_start = Instant::now();
    }
}
