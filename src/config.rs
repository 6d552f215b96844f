//! # Executor configuration.
//!
//! Provides [`Config`], the explicit configuration value passed into the
//! [`Executor`](crate::Executor). Nothing inside the pool consults global state;
//! external config loaders fill this struct and hand it over.
//!
//! ## Sentinel values
//! - `queue_size = 0` → unbounded queue
//! - `timeout = 0s` → no per-task timeout
//! - `grace = 0s` → wait for workers without limit during shutdown (default)
//!
//! ## Profiles
//! [`Profile`] mirrors the two deployment environments daemons are usually
//! configured with. Parse it from the environment name and call
//! [`Config::for_profile`]:
//!
//! ```rust
//! use std::time::Duration;
//! use workvisor::{Config, Profile};
//!
//! let profile: Profile = "production".parse().unwrap();
//! let cfg = Config::for_profile(profile);
//! assert_eq!(cfg.delay, Duration::from_millis(500));
//! assert_eq!(cfg.respawn_limit, 4);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::BackoffPolicy;

/// Shortest poll interval the supervisor and workers will use.
const MIN_POLL: Duration = Duration::from_millis(1);

/// What the executor's driving loop does after a generation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveMode {
    /// Generate and submit one batch, then shut down (batch driver).
    #[default]
    Once,
    /// Regenerate every `delay` until stopped (persistent daemon).
    Loop,
}

/// What happens to queued, not yet claimed tasks when shutdown begins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShutdownPolicy {
    /// Workers keep claiming until the queue is empty, then exit.
    #[default]
    Drain,
    /// Queued tasks are removed and reported as [`TaskError::Canceled`](crate::TaskError::Canceled).
    Discard,
}

/// Deployment environment presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    /// Short retry interval, three attempts before escalating.
    Development,
    /// Relaxed retry interval, four attempts before escalating.
    Production,
}

impl Profile {
    /// Returns the canonical lowercase profile name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Development => "development",
            Profile::Production => "production",
        }
    }

    fn retry_interval(&self) -> Duration {
        match self {
            Profile::Development => Duration::from_millis(100),
            Profile::Production => Duration::from_millis(500),
        }
    }

    fn attempts(&self) -> u32 {
        match self {
            Profile::Development => 3,
            Profile::Production => 4,
        }
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Profile::Development),
            "production" | "prod" => Ok(Profile::Production),
            _ => Err(ConfigError::UnknownProfile(s.to_string())),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the executor, its supervisor and workers.
///
/// ## Field semantics
/// - `delay`: supervisor poll interval, worker dequeue timeout and the pause
///   between generation passes in [`DriveMode::Loop`]
/// - `workers_count`: desired pool size (`0` = no workers)
/// - `queue_size`: task queue capacity (`0` = unbounded)
/// - `mode`: run-once vs. run-forever driving loop
/// - `shutdown`: drain or discard queued tasks on shutdown
/// - `grace`: max wait for workers to finish during shutdown (`0s` = no limit)
/// - `abort_stuck`: abort workers still busy one grace period after cancellation
/// - `timeout`: default per-task timeout (`0s` = none)
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `respawn_limit`: consecutive worker crashes tolerated before escalation
/// - `respawn_backoff`: delay between respawns once the limit is reached
/// - `handle_signals`: whether [`Executor::run`](crate::Executor::run) listens for OS signals
///
/// ## Notes
/// All fields are public. Prefer the accessors below over sprinkling
/// sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Poll / retry interval.
    pub delay: Duration,
    /// Desired number of live workers.
    pub workers_count: usize,
    /// Queue capacity; `0` means unbounded.
    pub queue_size: usize,
    /// Driving loop mode.
    pub mode: DriveMode,
    /// Policy for queued tasks at shutdown.
    pub shutdown: ShutdownPolicy,
    /// Maximum time to wait for workers during shutdown.
    ///
    /// When exceeded, running tasks get their cancellation token fired and
    /// shutdown returns [`ExecutorError::GraceExceeded`](crate::ExecutorError::GraceExceeded)
    /// once they have reported.
    pub grace: Duration,
    /// After a grace overrun, wait one more grace period for cancelled tasks,
    /// then abort their workers and report each task as
    /// [`TaskError::Canceled`](crate::TaskError::Canceled).
    ///
    /// Off by default: cancellation stays cooperative and shutdown waits.
    pub abort_stuck: bool,
    /// Default per-task timeout; tasks may override it.
    pub timeout: Duration,
    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
    /// Consecutive crashes before the supervisor reports
    /// [`PoolError::RespawnExhausted`](crate::PoolError::RespawnExhausted).
    pub respawn_limit: u32,
    /// Delay policy for respawns after the limit is reached.
    pub respawn_backoff: BackoffPolicy,
    /// Listen for SIGINT/SIGTERM/SIGQUIT (Ctrl-C on non-unix) in `run()`.
    pub handle_signals: bool,
}

impl Config {
    /// Builds a configuration from an environment profile.
    ///
    /// The profile's retry interval becomes `delay` and its attempt count
    /// becomes `respawn_limit`; everything else keeps its default.
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            delay: profile.retry_interval(),
            respawn_limit: profile.attempts(),
            ..Self::default()
        }
    }

    /// Returns the poll interval, clamped to at least 1ms.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.delay.max(MIN_POLL)
    }

    /// Returns the queue capacity as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` queued tasks
    #[inline]
    pub fn queue_capacity(&self) -> Option<usize> {
        match self.queue_size {
            0 => None,
            n => Some(n),
        }
    }

    /// Returns the default per-task timeout as an `Option`.
    #[inline]
    pub fn task_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Returns the shutdown grace period as an `Option` (`None` = no limit).
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `delay = 100ms`, `workers_count = 4`, `queue_size = 64`
    /// - `mode = Once`, `shutdown = Drain`
    /// - `grace = 0s` (no limit), `abort_stuck = false`
    /// - `timeout = 0s` (none), `bus_capacity = 1024`
    /// - `respawn_limit = 3`, `respawn_backoff = BackoffPolicy::default()`
    /// - `handle_signals = true`
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            workers_count: 4,
            queue_size: 64,
            mode: DriveMode::default(),
            shutdown: ShutdownPolicy::default(),
            grace: Duration::ZERO,
            abort_stuck: false,
            timeout: Duration::ZERO,
            bus_capacity: 1024,
            respawn_limit: 3,
            respawn_backoff: BackoffPolicy::default(),
            handle_signals: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_decode_to_none() {
        let cfg = Config {
            queue_size: 0,
            timeout: Duration::ZERO,
            grace: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.queue_capacity(), None);
        assert_eq!(cfg.task_timeout(), None);
        assert_eq!(cfg.grace_limit(), None);
    }

    #[test]
    fn default_shutdown_waits_for_running_tasks() {
        let cfg = Config::default();
        assert_eq!(cfg.grace_limit(), None);
        assert!(!cfg.abort_stuck);
    }

    #[test]
    fn poll_interval_never_zero() {
        let cfg = Config {
            delay: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.poll_interval(), MIN_POLL);
        assert_eq!(Config::default().poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn bus_capacity_clamped_to_one() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn profiles_parse_and_apply() {
        assert_eq!("Development".parse::<Profile>(), Ok(Profile::Development));
        assert_eq!(" prod ".parse::<Profile>(), Ok(Profile::Production));
        assert_eq!(
            "staging".parse::<Profile>(),
            Err(ConfigError::UnknownProfile("staging".into()))
        );

        let dev = Config::for_profile(Profile::Development);
        assert_eq!(dev.delay, Duration::from_millis(100));
        assert_eq!(dev.respawn_limit, 3);
        assert_eq!(dev.workers_count, Config::default().workers_count);
        assert_eq!(Profile::Production.to_string(), "production");
    }
}
