// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Per-user token-bucket rate limiting (GCRA via `governor`).

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Token bucket for human strokes, keyed by user id.
pub struct StrokeLimiter {
    /// `None` disables limiting (configured limit of 0).
    limiter: Option<KeyedLimiter>,
}

impl StrokeLimiter {
    pub fn per_minute(max_per_minute: u32) -> Self {
        let limiter = NonZeroU32::new(max_per_minute)
            .map(|n| RateLimiter::keyed(Quota::per_minute(n).allow_burst(n)));
        Self { limiter }
    }

    /// True when the stroke is admitted.
    pub fn check(&self, user_id: &str) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check_key(&user_id.to_string()).is_ok(),
            None => true,
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_burst_then_rejects() {
        let limiter = StrokeLimiter::per_minute(60);
        let admitted = (0..61).filter(|_| limiter.check("alice")).count();
        assert_eq!(admitted, 60);
    }

    #[test]
    fn users_have_independent_buckets() {
        let limiter = StrokeLimiter::per_minute(2);
        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[test]
    fn zero_disables_limiting() {
        let limiter = StrokeLimiter::per_minute(0);
        assert!((0..1000).all(|_| limiter.check("a")));
    }
}
