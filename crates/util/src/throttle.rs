use std::time::{Duration, Instant};

/// Timer-gated coalescing primitive.
///
/// The first event after a quiet period is emitted immediately (leading edge).
/// Events arriving within `interval` of the last emission are folded into a single
/// pending emission that becomes due at [`FrameThrottle::next_deadline`].
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
    pending: bool,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            pending: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Records an event; returns true when it should be emitted right away.
    pub fn record(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.interval => {
                self.pending = true;
                false
            }
            _ => {
                self.last_emit = Some(now);
                self.pending = false;
                true
            }
        }
    }

    /// Emits a pending event once its deadline has passed.
    pub fn flush(&mut self, now: Instant) -> bool {
        match self.next_deadline() {
            Some(deadline) if now >= deadline => {
                self.last_emit = Some(now);
                self.pending = false;
                true
            }
            _ => false,
        }
    }

    /// When the folded event becomes due, if one is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.pending {
            return None;
        }
        Some(self.last_emit.map_or_else(Instant::now, |last| last + self.interval))
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_leading_edge_and_folds_bursts() {
        let start = Instant::now();
        let mut throttle = FrameThrottle::new(Duration::from_millis(16));

        assert!(throttle.record(start));
        assert!(!throttle.record(start + Duration::from_millis(2)));
        assert!(!throttle.record(start + Duration::from_millis(5)));
        assert_eq!(throttle.next_deadline(), Some(start + Duration::from_millis(16)));

        assert!(!throttle.flush(start + Duration::from_millis(10)));
        assert!(throttle.flush(start + Duration::from_millis(16)));
        assert!(!throttle.has_pending());
        assert!(!throttle.flush(start + Duration::from_millis(40)));
    }

    #[test]
    fn quiet_period_resets_the_window() {
        let start = Instant::now();
        let mut throttle = FrameThrottle::new(Duration::from_millis(16));
        assert!(throttle.record(start));
        assert!(throttle.record(start + Duration::from_millis(20)));
        assert_eq!(throttle.next_deadline(), None);
    }
}
