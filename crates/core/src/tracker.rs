use std::time::{Duration, Instant};

use crate::detect::{spans_overlap, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapState {
    #[default]
    NotOverlapping,
    Overlapping,
}

/// Rising-edge detector over the indicator/target overlap.
///
/// Only `NotOverlapping -> Overlapping` produces a click request; holding an
/// overlap or leaving it is silent.
#[derive(Debug, Clone, Default)]
pub struct OverlapTracker {
    state: OverlapState,
}

impl OverlapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this tick's spans. Returns true when a click should be requested.
    pub fn observe(&mut self, indicator: Option<Span>, target: Option<Span>) -> bool {
        self.update(spans_overlap(indicator, target))
    }

    pub fn update(&mut self, overlap_now: bool) -> bool {
        let rising = overlap_now && self.state == OverlapState::NotOverlapping;
        self.state = if overlap_now {
            OverlapState::Overlapping
        } else {
            OverlapState::NotOverlapping
        };
        rising
    }

    pub fn state(&self) -> OverlapState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = OverlapState::NotOverlapping;
    }
}

/// Minimum-interval rate limiter on synthesized clicks.
#[derive(Debug, Clone)]
pub struct ClickGate {
    min_interval: Duration,
    last: Option<Instant>,
}

impl ClickGate {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, last: None }
    }

    /// Honor a request at `now` if the interval since the last honored one has passed.
    /// A dropped request is forgotten.
    pub fn try_pass(&mut self, now: Instant) -> bool {
        let open = self
            .last
            .map_or(true, |t| now.saturating_duration_since(t) >= self.min_interval);
        if open {
            self.last = Some(now);
        }
        open
    }

    pub fn last_click(&self) -> Option<Instant> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_request_per_overlap_run() {
        let mut t = OverlapTracker::new();
        let seq = [false, false, true, true, true, false, true];
        let fired: Vec<usize> = seq
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| t.update(v).then_some(i))
            .collect();
        assert_eq!(fired, vec![2, 6]);
    }

    #[test]
    fn test_absent_span_is_not_overlap() {
        let mut t = OverlapTracker::new();
        let red = Some(Span { top: 10, bottom: 20 });
        assert!(!t.observe(red, None));
        assert!(!t.observe(None, red));
        assert!(t.observe(red, Some(Span { top: 18, bottom: 30 })));
        assert_eq!(t.state(), OverlapState::Overlapping);
        assert!(!t.observe(red, None));
        assert_eq!(t.state(), OverlapState::NotOverlapping);
    }

    #[test]
    fn test_reset_clears_overlap() {
        let mut t = OverlapTracker::new();
        assert!(t.update(true));
        t.reset();
        assert!(t.update(true));
    }

    #[test]
    fn test_gate_drops_within_interval() {
        let t0 = Instant::now();
        let mut gate = ClickGate::new(Duration::from_millis(150));
        assert!(gate.try_pass(t0));
        assert!(!gate.try_pass(t0 + Duration::from_millis(100)));
        assert_eq!(gate.last_click(), Some(t0));
    }

    #[test]
    fn test_gate_opens_at_exact_interval() {
        let t0 = Instant::now();
        let mut gate = ClickGate::new(Duration::from_millis(150));
        assert!(gate.try_pass(t0));
        assert!(gate.try_pass(t0 + Duration::from_millis(150)));
        // dropped request does not move the reference point
        assert!(!gate.try_pass(t0 + Duration::from_millis(200)));
        assert!(gate.try_pass(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_gate_reset_allows_immediate_click() {
        let t0 = Instant::now();
        let mut gate = ClickGate::new(Duration::from_secs(10));
        assert!(gate.try_pass(t0));
        gate.reset();
        assert!(gate.try_pass(t0 + Duration::from_millis(1)));
    }
}
