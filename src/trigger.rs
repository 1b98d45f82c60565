use std::time::{Duration, Instant};

/// Debounced alert trigger.
///
/// Converts the per-frame hit signal into discrete alert events: a hit
/// extends the current run, a miss resets it, and a run reaching
/// `trigger_frames` fires exactly once. Firing resets the counter, so the
/// trigger re-arms immediately and a persistent detection fires again after
/// every full window — the historical behavior.
///
/// `min_interval` is a policy knob on top of that: when nonzero, a fire
/// that would land inside the interval is suppressed (the completed run is
/// still consumed). The default interval of zero keeps the legacy
/// fire-as-fast-as-the-window-allows behavior.
pub struct DebounceTrigger {
    trigger_frames: u32,
    min_interval: Duration,
    consecutive_hits: u32,
    last_fired: Option<Instant>,
}

impl DebounceTrigger {
    /// Create a trigger requiring `trigger_frames` consecutive hits.
    /// Values below 1 are clamped to 1.
    pub fn new(trigger_frames: u32) -> Self {
        Self {
            trigger_frames: trigger_frames.max(1),
            min_interval: Duration::ZERO,
            consecutive_hits: 0,
            last_fired: None,
        }
    }

    /// Require at least `interval` between fires.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Feed one tick's hit signal. Returns true iff an alert fires now.
    pub fn observe(&mut self, hit: bool) -> bool {
        if !hit {
            self.consecutive_hits = 0;
            return false;
        }

        self.consecutive_hits += 1;
        if self.consecutive_hits < self.trigger_frames {
            return false;
        }

        // Full window reached: consume the run whether or not we fire.
        self.consecutive_hits = 0;

        let now = Instant::now();
        if let Some(last) = self.last_fired {
            if now.duration_since(last) < self.min_interval {
                tracing::debug!("alert suppressed by minimum inter-alert interval");
                return false;
            }
        }

        self.last_fired = Some(now);
        true
    }

    /// Current run length of consecutive hits.
    pub fn consecutive_hits(&self) -> u32 {
        self.consecutive_hits
    }

    /// Clear the run and the inter-alert clock.
    pub fn reset(&mut self) {
        self.consecutive_hits = 0;
        self.last_fired = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fires(trigger: &mut DebounceTrigger, hits: &[bool]) -> Vec<usize> {
        hits.iter()
            .enumerate()
            .filter_map(|(i, &hit)| trigger.observe(hit).then_some(i + 1))
            .collect()
    }

    #[test]
    fn test_fires_once_on_sixth_input() {
        // The reference sequence: [T,T,F,T,T,T] with a window of 3.
        let mut trigger = DebounceTrigger::new(3);
        let fired = fires(&mut trigger, &[true, true, false, true, true, true]);
        assert_eq!(fired, vec![6]);
    }

    #[test]
    fn test_miss_resets_run() {
        let mut trigger = DebounceTrigger::new(3);

        assert!(!trigger.observe(true));
        assert!(!trigger.observe(true));
        assert_eq!(trigger.consecutive_hits(), 2);

        assert!(!trigger.observe(false));
        assert_eq!(trigger.consecutive_hits(), 0);
    }

    #[test]
    fn test_rearms_immediately_after_firing() {
        let mut trigger = DebounceTrigger::new(2);
        let fired = fires(&mut trigger, &[true, true, true, true, true]);
        // Windows complete at inputs 2 and 4; input 5 starts a fresh run.
        assert_eq!(fired, vec![2, 4]);
        assert_eq!(trigger.consecutive_hits(), 1);
    }

    #[test]
    fn test_window_of_one_fires_every_hit() {
        let mut trigger = DebounceTrigger::new(1);
        let fired = fires(&mut trigger, &[true, true, false, true]);
        assert_eq!(fired, vec![1, 2, 4]);
    }

    #[test]
    fn test_zero_window_clamped_to_one() {
        let mut trigger = DebounceTrigger::new(0);
        assert!(trigger.observe(true));
    }

    #[test]
    fn test_min_interval_suppresses_refire() {
        let mut trigger =
            DebounceTrigger::new(1).with_min_interval(Duration::from_millis(80));

        assert!(trigger.observe(true));
        assert!(!trigger.observe(true)); // inside the interval

        std::thread::sleep(Duration::from_millis(90));
        assert!(trigger.observe(true));
    }

    #[test]
    fn test_reset_clears_interval_clock() {
        let mut trigger =
            DebounceTrigger::new(1).with_min_interval(Duration::from_secs(60));

        assert!(trigger.observe(true));
        assert!(!trigger.observe(true));

        trigger.reset();
        assert!(trigger.observe(true));
    }
}
