/// Requires `threshold` consecutive agreeing observations before firing.
///
/// The counter saturates at the threshold, so a condition that keeps holding fires
/// exactly once; any failing observation (or [`Debouncer::reset`]) re-arms it.
#[derive(Debug, Clone)]
pub struct Debouncer {
    hits: u32,
    threshold: u32,
}

impl Debouncer {
    pub fn new(threshold: u32) -> Self {
        Self { hits: 0, threshold: threshold.max(1) }
    }

    /// Feed one tick. Returns true only on the tick the threshold is reached.
    pub fn observe(&mut self, holds: bool) -> bool {
        if !holds {
            self.hits = 0;
            return false;
        }
        if self.hits >= self.threshold {
            return false;
        }
        self.hits += 1;
        self.hits == self.threshold
    }

    pub fn reset(&mut self) {
        self.hits = 0;
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fired(d: &mut Debouncer, seq: &[bool]) -> Vec<usize> {
        seq.iter()
            .enumerate()
            .filter_map(|(i, &v)| d.observe(v).then_some(i))
            .collect()
    }

    #[test]
    fn test_fires_once_on_fourth_hit() {
        let mut d = Debouncer::new(4);
        assert_eq!(fired(&mut d, &[true; 5]), vec![3]);
        assert_eq!(d.hits(), 4);
    }

    #[test]
    fn test_miss_restarts_count() {
        let mut d = Debouncer::new(4);
        let seq = [true, true, true, false, true, true, true, true];
        assert_eq!(fired(&mut d, &seq), vec![7]);
    }

    #[test]
    fn test_reset_rearms() {
        let mut d = Debouncer::new(2);
        assert_eq!(fired(&mut d, &[true, true, true]), vec![1]);
        d.reset();
        assert_eq!(d.hits(), 0);
        assert_eq!(fired(&mut d, &[true, true]), vec![1]);
    }

    #[test]
    fn test_counter_stays_within_threshold() {
        let mut d = Debouncer::new(3);
        for i in 0..50 {
            d.observe(i % 7 != 0);
            assert!(d.hits() <= d.threshold());
        }
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let mut d = Debouncer::new(0);
        assert_eq!(d.threshold(), 1);
        assert!(d.observe(true));
    }
}
