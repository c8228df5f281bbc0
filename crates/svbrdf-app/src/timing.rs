use std::time::{Duration, Instant};

/// Frames averaged per reported frame time.
pub const FRAME_TIME_SAMPLES: usize = 30;

/// Rolling frame-time measurement, toggled at runtime.
#[derive(Debug)]
pub struct FrameTimer {
    enabled: bool,
    last: Option<Instant>,
    samples: Vec<Duration>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            enabled: false,
            last: None,
            samples: Vec::with_capacity(FRAME_TIME_SAMPLES),
        }
    }

    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.last = None;
        self.samples.clear();
        self.enabled
    }

    /// Mark the end of a frame. Returns the mean frame time each time a full
    /// batch of samples has been collected.
    pub fn frame_finished(&mut self, now: Instant) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        let previous = self.last.replace(now)?;
        self.samples.push(now.saturating_duration_since(previous));
        if self.samples.len() < FRAME_TIME_SAMPLES {
            return None;
        }
        let total: Duration = self.samples.drain(..).sum();
        Some(total / FRAME_TIME_SAMPLES as u32)
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}
