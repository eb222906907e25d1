//! Frame statistics

use std::collections::VecDeque;
use std::fmt;

/// Rolling frame time statistics over the most recent frames
#[derive(Debug, Clone)]
pub struct FrameStats {
    /// Frame times in seconds, oldest first
    frame_times: VecDeque<f64>,
    max_samples: usize,
    total_frames: u64,
    total_time: f64,
}

impl FrameStats {
    /// Default number of frames averaged over
    pub const DEFAULT_SAMPLES: usize = 120;

    /// Create a tracker averaging over [`Self::DEFAULT_SAMPLES`] frames
    #[must_use]
    pub fn new() -> Self {
        Self::with_samples(Self::DEFAULT_SAMPLES)
    }

    /// Create a tracker averaging over `max_samples` frames
    #[must_use]
    pub fn with_samples(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples,
            total_frames: 0,
            total_time: 0.0,
        }
    }

    /// Record a frame that took `dt` seconds
    pub fn record_frame(&mut self, dt: f64) {
        self.total_frames += 1;
        self.total_time += dt;
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(dt);
    }

    /// Frames per second over the sample window
    #[must_use]
    pub fn fps(&self) -> f64 {
        let total: f64 = self.frame_times.iter().sum();
        if total > 0.0 {
            self.frame_times.len() as f64 / total
        } else {
            0.0
        }
    }

    /// Average frame time in milliseconds
    #[must_use]
    pub fn avg_frame_time_ms(&self) -> f64 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.frame_times.iter().sum::<f64>() / self.frame_times.len() as f64 * 1000.0
    }

    /// Shortest frame time in the window, in milliseconds
    #[must_use]
    pub fn min_frame_time_ms(&self) -> f64 {
        self.frame_times.iter().copied().reduce(f64::min).unwrap_or(0.0) * 1000.0
    }

    /// Longest frame time in the window, in milliseconds
    #[must_use]
    pub fn max_frame_time_ms(&self) -> f64 {
        self.frame_times.iter().copied().reduce(f64::max).unwrap_or(0.0) * 1000.0
    }

    /// Frames recorded since creation
    #[must_use]
    pub const fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Seconds recorded since creation
    #[must_use]
    pub const fn total_time(&self) -> f64 {
        self.total_time
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FPS: {:.1} | Frame: {:.2}ms (min: {:.2}, max: {:.2})",
            self.fps(),
            self.avg_frame_time_ms(),
            self.min_frame_time_ms(),
            self.max_frame_time_ms()
        )
    }
}
