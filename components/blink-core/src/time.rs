use embassy_time::{Duration, Instant};

/// Time passed from `since` to `now`, computed on raw ticks so a wrapped counter
/// still yields the forward distance.
pub fn elapsed(now: Instant, since: Instant) -> Duration {
    Duration::from_ticks(now.as_ticks().wrapping_sub(since.as_ticks()))
}

pub fn has_elapsed(now: Instant, since: Instant, period: Duration) -> bool {
    elapsed(now, since) >= period
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn elapsed_forward() {
        let since = Instant::from_millis(1_000);
        let now = Instant::from_millis(1_750);
        assert_eq!(elapsed(now, since), Duration::from_millis(750));
        assert!(has_elapsed(now, since, Duration::from_millis(750)));
        assert!(!has_elapsed(now, since, Duration::from_millis(751)));
    }

    #[test]
    fn elapsed_across_counter_wrap() {
        let since = Instant::from_ticks(u64::MAX - 4);
        let now = Instant::from_ticks(5);
        assert_eq!(elapsed(now, since), Duration::from_ticks(10));
    }

    #[test]
    fn zero_period_always_elapsed() {
        let t = Instant::from_millis(42);
        assert!(has_elapsed(t, t, Duration::from_ticks(0)));
    }
}
