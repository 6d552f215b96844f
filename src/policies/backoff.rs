//! # Backoff between worker respawns.
//!
//! The delay for the `n`-th respawn past the crash limit is
//! `first × factor^n`, clamped to `max`, then jittered. The base is derived from
//! `n` alone, so jitter never feeds back into later delays.
//!
//! ```rust
//! use std::time::Duration;
//! use workvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(1),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(2), Duration::from_millis(400));
//! assert_eq!(backoff.next(10), Duration::from_secs(1));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Exponential respawn delay.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay for the first respawn past the limit.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Growth factor per additional crash (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied after clamping.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 100ms`, `factor = 2.0`, `max = 30s`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Delay before respawn number `n` (0-based) past the crash limit.
    ///
    /// Non-finite or negative intermediate values clamp to `max`.
    pub fn next(&self, n: u32) -> Duration {
        let exp = n.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        let base = if secs.is_finite() && secs >= 0.0 && secs <= self.max.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        };
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(first_ms: u64, max_ms: u64, factor: f64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn grows_geometrically() {
        let p = plain(100, 30_000, 2.0);
        let got: Vec<u64> = (0..5).map(|n| p.next(n).as_millis() as u64).collect();
        assert_eq!(got, vec![100, 200, 400, 800, 1600]);
    }

    #[test]
    fn constant_when_factor_is_one() {
        let p = plain(250, 30_000, 1.0);
        assert!((0..20).all(|n| p.next(n) == Duration::from_millis(250)));
    }

    #[test]
    fn clamps_to_max() {
        assert_eq!(plain(100, 1_000, 2.0).next(10), Duration::from_secs(1));
        assert_eq!(plain(10_000, 5_000, 2.0).next(0), Duration::from_secs(5));
        assert_eq!(plain(100, 10_000, 2.0).next(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn jitter_never_exceeds_base() {
        let p = BackoffPolicy {
            jitter: JitterPolicy::Full,
            ..plain(100, 30_000, 2.0)
        };
        for n in 0..12 {
            let base = plain(100, 30_000, 2.0).next(n);
            assert!(p.next(n) <= base);
        }
    }
}
