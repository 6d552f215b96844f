//! Respawn pacing policies.
//!
//! The supervisor replaces crashed workers immediately until a crash streak
//! reaches [`Config::respawn_limit`](crate::Config::respawn_limit). From then on
//! each respawn waits for a delay computed here, so a worker that dies on every
//! task cannot turn the supervisor into a spin loop.
//!
//! ## Contents
//! - [`BackoffPolicy`] how respawn delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization applied to each delay
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=30s, jitter=None.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
