#[cfg(test)]
mod tests {
    use super::super::{SlidingWindowLimiter, WindowUnit};
    use crate::core::{KeyLimiter, LimiterError, ManualClock};

    const SOME_IP: &str = "127.0.0.1";
    const OTHER_IP: &str = "192.168.1.1";

    fn limiter_with_clock(
        max_requests: u64,
        unit: WindowUnit,
    ) -> (SlidingWindowLimiter, ManualClock) {
        let clock = ManualClock::new();
        let limiter = SlidingWindowLimiter::builder(max_requests, unit)
            .clock(clock.clone())
            .build()
            .unwrap();
        (limiter, clock)
    }

    fn exhaust(limiter: &SlidingWindowLimiter, key: &str) -> usize {
        let mut admitted = 0;
        while limiter.allow(key) {
            admitted += 1;
        }
        admitted
    }

    #[test]
    fn test_window_unit_intervals() {
        assert_eq!(WindowUnit::Second.interval(), 1);
        assert_eq!(WindowUnit::Minute.interval(), 60);
        assert_eq!(WindowUnit::Hour.interval(), 3600);
    }

    #[test]
    fn test_window_unit_from_str() {
        assert_eq!("second".parse::<WindowUnit>().unwrap(), WindowUnit::Second);
        assert_eq!("MINUTE".parse::<WindowUnit>().unwrap(), WindowUnit::Minute);
        assert_eq!("hour".parse::<WindowUnit>().unwrap(), WindowUnit::Hour);
        assert_eq!(
            "day".parse::<WindowUnit>(),
            Err(LimiterError::UnknownWindowUnit("day".to_string()))
        );
        assert_eq!(WindowUnit::Minute.to_string(), "minute");
    }

    #[test]
    fn test_allow_until_full() {
        let limiter = SlidingWindowLimiter::new(3, WindowUnit::Second).unwrap();

        for i in 0..3 {
            assert!(limiter.allow(SOME_IP), "Request {} should be allowed", i + 1);
        }
    }

    #[test]
    fn test_allow_until_throttled() {
        let (limiter, _clock) = limiter_with_clock(3, WindowUnit::Second);

        for _ in 0..3 {
            assert!(limiter.allow(SOME_IP));
        }

        assert!(!limiter.allow(SOME_IP));
    }

    #[test]
    fn test_keys_have_different_windows() {
        let (limiter, _clock) = limiter_with_clock(3, WindowUnit::Second);

        for _ in 0..3 {
            assert!(limiter.allow(SOME_IP));
            assert!(limiter.allow(OTHER_IP));
        }

        assert!(!limiter.allow(SOME_IP));
        assert!(!limiter.allow(OTHER_IP));
    }

    #[test]
    fn test_allow_as_window_moves() {
        let (limiter, clock) = limiter_with_clock(10, WindowUnit::Second);

        assert_eq!(exhaust(&limiter, SOME_IP), 10);

        // 90% of the previous window is still in view
        clock.advance(1.1);
        assert!(limiter.allow(SOME_IP));
        assert!(!limiter.allow(SOME_IP));

        clock.advance(0.1);
        assert!(limiter.allow(SOME_IP));
    }

    #[test]
    fn test_previous_window_fades_out() {
        let (limiter, clock) = limiter_with_clock(4, WindowUnit::Second);

        exhaust(&limiter, SOME_IP);

        // Rolling count floor(0 + 0.5 * 4) = 2
        clock.set(1.5);
        assert_eq!(limiter.remaining(SOME_IP), 2);

        // Rolling count floor(0 + 0.25 * 4) = 1
        clock.set(1.75);
        assert_eq!(limiter.remaining(SOME_IP), 3);
    }

    #[test]
    fn test_idle_key_starts_fresh() {
        let (limiter, clock) = limiter_with_clock(3, WindowUnit::Second);

        exhaust(&limiter, SOME_IP);

        // More than one full window without traffic
        clock.advance(2.5);
        assert_eq!(limiter.remaining(SOME_IP), 3);
        assert_eq!(exhaust(&limiter, SOME_IP), 3);
    }

    #[test]
    fn test_stale_previous_window_is_ignored() {
        let (limiter, clock) = limiter_with_clock(4, WindowUnit::Minute);

        clock.set(30.0);
        assert!(limiter.allow(SOME_IP));

        // Window 0 becomes the previous window, worth half a call at t=90
        clock.set(90.0);
        assert_eq!(exhaust(&limiter, SOME_IP), 4);

        // Window 2 had no traffic, so window 1 is not adjacent any more and
        // the recorded previous window (0) is stale
        clock.set(181.0);
        assert_eq!(limiter.remaining(SOME_IP), 4);
        assert_eq!(exhaust(&limiter, SOME_IP), 4);
    }

    #[test]
    fn test_window_id_at_lower_bound() {
        // floor(now / interval) saturates to i64::MIN
        let limiter = SlidingWindowLimiter::builder(3, WindowUnit::Second)
            .clock(|| -1e300)
            .build()
            .unwrap();

        assert_eq!(exhaust(&limiter, SOME_IP), 3);
        assert_eq!(limiter.remaining(SOME_IP), 0);
        assert_eq!(limiter.retry_after(SOME_IP), 1);
    }

    #[test]
    fn test_sliding_window_limit() {
        let limiter = SlidingWindowLimiter::new(5, WindowUnit::Second).unwrap();

        assert_eq!(limiter.limit(SOME_IP), 5);
        assert_eq!(limiter.max_requests(), 5);
        assert_eq!(limiter.window_unit(), WindowUnit::Second);
    }

    #[test]
    fn test_sliding_window_remaining() {
        let (limiter, clock) = limiter_with_clock(5, WindowUnit::Second);

        assert_eq!(limiter.remaining(SOME_IP), 5);

        limiter.allow(SOME_IP);
        assert_eq!(limiter.remaining(SOME_IP), 4);

        for _ in 0..4 {
            limiter.allow(SOME_IP);
        }

        assert_eq!(limiter.remaining(SOME_IP), 0);
        assert!(!limiter.allow(SOME_IP));

        clock.advance(1.2);
        assert_eq!(limiter.remaining(SOME_IP), 1);
        assert!(limiter.allow(SOME_IP));
    }

    #[test]
    fn test_sliding_window_retry_after() {
        let (limiter, _clock) = limiter_with_clock(5, WindowUnit::Second);

        assert_eq!(limiter.retry_after(SOME_IP), 0);

        for _ in 0..5 {
            limiter.allow(SOME_IP);
        }

        assert_eq!(limiter.retry_after(SOME_IP), 1);
    }

    #[test]
    fn test_sliding_window_retry_after_minute() {
        let (limiter, clock) = limiter_with_clock(5, WindowUnit::Minute);

        for _ in 0..5 {
            limiter.allow(SOME_IP);
        }

        assert_eq!(limiter.retry_after(SOME_IP), 60);

        clock.advance(45.0);
        assert_eq!(limiter.retry_after(SOME_IP), 15);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let (limiter, clock) = limiter_with_clock(1, WindowUnit::Minute);

        clock.set(10.5);
        assert!(limiter.allow(SOME_IP));
        // 49.5s left in the window
        assert_eq!(limiter.retry_after(SOME_IP), 50);
    }

    #[test]
    fn test_check_reports_consistent_state() {
        let (limiter, clock) = limiter_with_clock(2, WindowUnit::Minute);

        let first = limiter.check(SOME_IP);
        assert!(first.allowed);
        assert_eq!(first.limit, 2);
        assert_eq!(first.remaining, 1);
        assert_eq!(first.retry_after, 0);

        clock.advance(20.0);
        let second = limiter.check(SOME_IP);
        assert!(second.allowed);
        assert_eq!(second.remaining, 0);
        assert_eq!(second.retry_after, 40);

        let third = limiter.check(SOME_IP);
        assert!(!third.allowed);
        assert_eq!(third.remaining, 0);
        assert_eq!(third.retry_after, 40);
    }

    #[test]
    fn test_queries_do_not_consume() {
        let (limiter, clock) = limiter_with_clock(3, WindowUnit::Second);

        for _ in 0..10 {
            assert_eq!(limiter.remaining(SOME_IP), 3);
            assert_eq!(limiter.limit(SOME_IP), 3);
            assert_eq!(limiter.retry_after(SOME_IP), 0);
            clock.advance(0.05);
        }

        assert_eq!(exhaust(&limiter, SOME_IP), 3);
    }

    #[test]
    fn test_state_expires_after_two_windows() {
        let (limiter, clock) = limiter_with_clock(2, WindowUnit::Second);

        exhaust(&limiter, SOME_IP);
        clock.advance(2.0);
        exhaust(&limiter, OTHER_IP);

        assert_eq!(limiter.store.lock().len(), 1);
    }

    #[test]
    fn test_invalid_max_requests() {
        assert!(matches!(
            SlidingWindowLimiter::new(0, WindowUnit::Hour),
            Err(LimiterError::InvalidMaxRequests)
        ));
    }
}
