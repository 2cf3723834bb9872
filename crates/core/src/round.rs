//! Per-round shared state.

use crate::node::Node;
use authring_types::{Cycle, HashValue};
use std::sync::Arc;

/// Round bookkeeping, mutated only by the origin during round start and
/// close-out.
pub struct RoundState {
    /// Monotonic round index, advanced once per round start.
    pub cycle: Cycle,

    /// The previous round's agreed value; this round's election input.
    pub last_hash: HashValue,

    /// The value published by this round's winner.
    pub new_hash: HashValue,

    /// The previous round's surviving winner, parked for exactly one round
    /// before being appended back at the tail of the pool.
    pub pending_rejoin: Option<Arc<Node>>,
}

impl RoundState {
    /// State before any node has been admitted.
    pub fn new() -> Self {
        Self {
            cycle: Cycle::ZERO,
            last_hash: HashValue::UNINIT,
            new_hash: HashValue::UNINIT,
            pending_rejoin: None,
        }
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}
