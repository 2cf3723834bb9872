//! Coordinator configuration.

use authring_types::HashValue;
use std::time::Duration;

/// Simulated-failure predicate applied to a winner's published value.
pub type FailurePredicate = fn(HashValue) -> bool;

/// Default failure rule: multiples of 9 are perceived as invalid results.
///
/// An arbitrary stand-in for real block validation; swap in another
/// predicate via [`CoordinatorConfig::with_failure_predicate`].
pub fn default_failure(hash: HashValue) -> bool {
    hash.0 % 9 == 0
}

/// Configuration for round pacing and eviction.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// How long the origin waits for the winner to publish before closing
    /// the round.
    pub cycle_duration: Duration,

    /// How long an evicted node sits out before rejoining the pool.
    pub rejoin_cooldown: Duration,

    /// Seed for the coordinator's RNG (genesis value and mined hashes).
    pub seed: u64,

    /// Decides whether a published value counts as a failed mining
    /// attempt.
    pub simulated_failure: FailurePredicate,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            cycle_duration: Duration::from_secs(1),
            rejoin_cooldown: Duration::from_secs(2),
            seed: 42,
            simulated_failure: default_failure,
        }
    }
}

impl CoordinatorConfig {
    /// Create a config with the given round pacing.
    pub fn with_cycle_duration(cycle_duration: Duration) -> Self {
        Self {
            cycle_duration,
            ..Default::default()
        }
    }

    /// Override the rejoin cooldown.
    pub fn with_rejoin_cooldown(mut self, cooldown: Duration) -> Self {
        self.rejoin_cooldown = cooldown;
        self
    }

    /// Override the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Override the failure predicate.
    pub fn with_failure_predicate(mut self, predicate: FailurePredicate) -> Self {
        self.simulated_failure = predicate;
        self
    }
}
