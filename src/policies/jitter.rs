//! # Jitter for respawn delays.
//!
//! - [`JitterPolicy::None`] — exact delay
//! - [`JitterPolicy::Full`] — uniform in `[0, delay]`
//! - [`JitterPolicy::Equal`] — `delay/2` plus uniform in `[0, delay/2]`

use std::time::Duration;

use rand::Rng;

/// Randomization applied to a computed backoff delay.
///
/// Several executors in one process restarting crashed workers at the same
/// instant hammer whatever made them crash; jitter spreads them out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the delay as computed.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// `delay/2 + uniform[0, delay/2]`.
    Equal,
}

impl JitterPolicy {
    /// Applies this jitter to `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return delay;
        }
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rand::rng().random_range(0..=ms - half))
            }
        }
    }
}
