use gaitex_core::{EventSink, Side};

/// Captures at most one scored response per trial.
///
/// The window opens at stimulus onset and stays open until the trial resets:
/// a response arriving after the formal timeout is still recorded as long as
/// timeout handling has not advanced the trial yet. Later submissions
/// overwrite the recorded side, but the response marker is one-shot.
#[derive(Debug, Clone, Default)]
pub struct ResponseCollector {
    window_open: bool,
    stimulus_onset: Option<f32>,
    side: Option<Side>,
    latency: Option<f32>,
    marker_sent: bool,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called on the stimulus-onset edge with the trial-clock timestamp.
    pub fn open_window(&mut self, onset_time: f32) {
        self.window_open = true;
        self.stimulus_onset = Some(onset_time);
    }

    pub fn is_window_open(&self) -> bool {
        self.window_open
    }

    /// Records a response at `at_time` (trial-clock seconds). Returns `false`
    /// if no window is open and the response was discarded.
    pub fn record<E: EventSink>(&mut self, side: Side, at_time: f32, events: &mut E) -> bool {
        if !self.window_open {
            events.write(&format!(
                "controller response (outside response time): {}",
                side.label()
            ));
            return false;
        }

        let onset = self.stimulus_onset.unwrap_or(at_time);
        self.side = Some(side);
        self.latency = Some(at_time - onset);

        if !self.marker_sent {
            self.marker_sent = true;
            events.write(&format!("controller response: {}", side.label()));
        }
        true
    }

    pub fn has_response(&self) -> bool {
        self.side.is_some()
    }

    pub fn response(&self) -> Option<(Side, f32)> {
        match (self.side, self.latency) {
            (Some(side), Some(latency)) => Some((side, latency)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaitex_core::MemorySink;

    #[test]
    fn latency_is_relative_to_stimulus_onset() {
        let mut collector = ResponseCollector::new();
        let mut sink = MemorySink::new();

        collector.open_window(1.2);
        assert!(collector.record(Side::Left, 1.5, &mut sink));

        let (side, latency) = collector.response().unwrap();
        assert_eq!(side, Side::Left);
        assert!((latency - 0.3).abs() < 1e-6);
    }

    #[test]
    fn response_before_onset_is_discarded() {
        let mut collector = ResponseCollector::new();
        let mut sink = MemorySink::new();

        assert!(!collector.record(Side::Right, 0.4, &mut sink));
        assert!(!collector.has_response());
        assert!(sink.contains("outside response time"));
    }

    #[test]
    fn marker_is_one_shot_but_side_overwrites() {
        let mut collector = ResponseCollector::new();
        let mut sink = MemorySink::new();

        collector.open_window(1.0);
        collector.record(Side::Left, 1.3, &mut sink);
        collector.record(Side::Right, 1.6, &mut sink);

        assert_eq!(sink.count_containing("controller response:"), 1);
        let (side, latency) = collector.response().unwrap();
        assert_eq!(side, Side::Right);
        assert!((latency - 0.6).abs() < 1e-6);
    }
}
