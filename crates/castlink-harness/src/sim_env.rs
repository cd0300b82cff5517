//! Simulated environment for deterministic tests.
//!
//! Time comes from tokio's clock, so a runtime started with a paused clock
//! makes timeouts and artificial latency instantaneous and reproducible. The
//! wall clock is derived from that same clock, offset from a fixed epoch.
//! Randomness comes from a seeded ChaCha stream shared by all clones.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use castlink_core::env::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Wall clock reading at simulation start: 2024-01-01T00:00:00Z.
pub const SIM_EPOCH_MILLIS: u64 = 1_704_067_200_000;

/// Deterministic [`Environment`].
///
/// Clones share the RNG stream and the clock origin.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
    origin: tokio::time::Instant,
    epoch_millis: u64,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Environment seeded with 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with an explicit RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            origin: tokio::time::Instant::now(),
            epoch_millis: SIM_EPOCH_MILLIS,
        }
    }

    /// Start the wall clock at `epoch_millis` instead of [`SIM_EPOCH_MILLIS`].
    #[must_use]
    pub fn with_epoch_millis(mut self, epoch_millis: u64) -> Self {
        self.epoch_millis = epoch_millis;
        self
    }

    /// Virtual time elapsed since this environment was created.
    pub fn elapsed(&self) -> Duration {
        tokio::time::Instant::now().saturating_duration_since(self.origin)
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn wall_clock_millis(&self) -> u64 {
        let elapsed = u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.epoch_millis.saturating_add(elapsed)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_bytes() {
        let a = SimEnv::with_seed(42);
        let b = SimEnv::with_seed(42);

        assert_eq!(a.random_u64(), b.random_u64());
        assert_eq!(a.random_u32(), b.random_u32());
    }

    #[test]
    fn different_seeds_diverge() {
        assert_ne!(SimEnv::with_seed(1).random_u64(), SimEnv::with_seed(2).random_u64());
    }

    #[test]
    fn clones_share_the_stream() {
        let a = SimEnv::with_seed(7);
        let b = a.clone();
        let reference = SimEnv::with_seed(7);

        let first = reference.random_u64();
        let second = reference.random_u64();
        assert_eq!(a.random_u64(), first);
        assert_eq!(b.random_u64(), second);
    }

    #[tokio::test(start_paused = true)]
    async fn wall_clock_follows_virtual_time() {
        let env = SimEnv::new();
        assert_eq!(env.wall_clock_millis(), SIM_EPOCH_MILLIS);

        env.sleep(Duration::from_secs(3)).await;
        assert!(env.elapsed() >= Duration::from_secs(3));
        assert!(env.wall_clock_millis() >= SIM_EPOCH_MILLIS + 3_000);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_epoch() {
        let env = SimEnv::with_seed(3).with_epoch_millis(1_000);
        assert_eq!(env.wall_clock_millis(), 1_000);
    }
}
