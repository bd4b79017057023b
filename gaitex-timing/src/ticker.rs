use std::time::{Duration, Instant};

/// Wall-clock frame-delta source for the host tick loop.
///
/// The state machine itself only ever sees the returned deltas; jitter in
/// their delivery is measured, logged, and accepted rather than corrected.
#[derive(Debug, Clone)]
pub struct FrameTicker {
    last: Instant,
    frame_times: Vec<Duration>,
    max_samples: usize,
}

#[derive(Debug, Clone)]
pub struct TickStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_hz: f64,
}

impl FrameTicker {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }

    /// Seconds since the previous call; records the sample for stats.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last);
        self.last = now;

        if self.frame_times.len() >= self.max_samples {
            self.frame_times.remove(0);
        }
        self.frame_times.push(delta);

        delta.as_secs_f32()
    }

    pub fn stats(&self) -> TickStats {
        let times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        if times.is_empty() {
            return TickStats {
                average_frame_time_ns: 0.0,
                jitter_ns: 0.0,
                min_frame_time_ns: 0.0,
                max_frame_time_ns: 0.0,
                effective_hz: 0.0,
            };
        }
        let sum: f64 = times.iter().sum();
        let avg = sum / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        TickStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_hz: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

impl Default for FrameTicker {
    fn default() -> Self {
        Self::new()
    }
}
