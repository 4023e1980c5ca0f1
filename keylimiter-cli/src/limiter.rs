//! Limiter factory
//!
//! Builds the configured algorithm behind a shared `Arc<dyn KeyLimiter>` so
//! the modes never care which one they drive.

use crate::config::{Algorithm, LimiterConfig};
use anyhow::Result;
use keylimiter::{KeyLimiter, SlidingWindowLimiter, TokenBucketLimiter};
use std::sync::Arc;

/// Create the configured rate limiter
///
/// # Errors
///
/// Returns an error if the selected algorithm rejects its parameters.
pub fn create_limiter(config: &LimiterConfig) -> Result<Arc<dyn KeyLimiter>> {
    match config.algorithm {
        Algorithm::TokenBucket => {
            let limiter = TokenBucketLimiter::builder(config.bucket_size, config.refill_rate)
                .capacity(config.capacity)
                .build()?;
            Ok(Arc::new(limiter))
        }
        Algorithm::SlidingWindow => {
            let limiter = SlidingWindowLimiter::builder(config.max_requests, config.window_unit)
                .capacity(config.capacity)
                .build()?;
            Ok(Arc::new(limiter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keylimiter::WindowUnit;

    fn config(algorithm: Algorithm) -> LimiterConfig {
        LimiterConfig {
            algorithm,
            bucket_size: 3,
            refill_rate: 1.0,
            max_requests: 5,
            window_unit: WindowUnit::Hour,
            capacity: 16,
        }
    }

    #[test]
    fn test_creates_selected_algorithm() {
        let bucket = create_limiter(&config(Algorithm::TokenBucket)).unwrap();
        assert_eq!(bucket.limit("key"), 3);

        let window = create_limiter(&config(Algorithm::SlidingWindow)).unwrap();
        assert_eq!(window.limit("key"), 5);
    }

    #[test]
    fn test_invalid_parameters_are_reported() {
        let mut bad = config(Algorithm::TokenBucket);
        bad.refill_rate = -2.0;
        let err = create_limiter(&bad).err().unwrap();
        assert!(err.to_string().contains("refill rate"));

        let mut bad = config(Algorithm::SlidingWindow);
        bad.max_requests = 0;
        assert!(create_limiter(&bad).is_err());
    }
}
