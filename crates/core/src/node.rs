//! Node identity and the per-round state machine.

use crate::barrier::{Wake, WakeReceiver};
use crate::coordinator::Coordinator;
use authring_types::NodeId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, trace};

/// A logical pool member.
///
/// Holds identity and liveness flags only; all coordination state lives in
/// the [`Coordinator`]. A node is created once per logical identity and
/// reused across evict/cooldown/rejoin so logs stay traceable.
pub struct Node {
    /// Assigned on first activation, then never changes.
    id: OnceLock<NodeId>,

    /// Cleared to make the round loop exit at its next iteration.
    running: AtomicBool,

    /// Set while the node is serving an eviction cooldown.
    denied: AtomicBool,
}

impl Node {
    /// Create an inactive node with no identity yet.
    pub fn new() -> Self {
        Self {
            id: OnceLock::new(),
            running: AtomicBool::new(false),
            denied: AtomicBool::new(false),
        }
    }

    /// The node's identity, once assigned by its first activation.
    pub fn id(&self) -> Option<NodeId> {
        self.id.get().copied()
    }

    /// Whether the round loop should keep going.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the node is currently serving an eviction cooldown.
    pub fn is_denied(&self) -> bool {
        self.denied.load(Ordering::SeqCst)
    }

    /// Deactivate without scheduling a rejoin.
    ///
    /// Takes effect at the top of the node's next loop iteration; a
    /// mid-round suspension is not interrupted (the teardown wake is).
    pub fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub(crate) fn assign_id_with(&self, make: impl FnOnce() -> NodeId) -> NodeId {
        *self.id.get_or_init(make)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub(crate) fn set_denied(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    /// Activate the node and begin its round loop.
    ///
    /// Assigns a persistent identity on first activation; re-starting a
    /// previously evicted node keeps its original id. Starting a node that
    /// is already active is a no-op. Must be called from within a Tokio
    /// runtime.
    pub fn start(self: &Arc<Self>, coordinator: &Arc<Coordinator>) {
        if !coordinator.activate(self) {
            return;
        }
        let task = tokio::spawn({
            let node = self.clone();
            let coordinator = coordinator.clone();
            async move { node.run(coordinator).await }
        });
        coordinator.register_task(task);
    }

    /// Round loop: runs until the node is deactivated or teardown begins.
    async fn run(self: Arc<Self>, coordinator: Arc<Coordinator>) {
        let mut wake = coordinator.subscribe();
        while self.is_running() && !coordinator.is_shutting_down() {
            self.cycle(&coordinator, &mut wake).await;
        }
        debug!(node = %self, "Node loop exited");
    }

    /// One full sync → elect → mine → close iteration.
    async fn cycle(self: &Arc<Self>, coordinator: &Arc<Coordinator>, wake: &mut WakeReceiver) {
        // Sync: the origin opens the round, everyone else waits for it.
        if coordinator.is_origin(self) {
            coordinator.start_round(self);
        } else if !self.await_round(coordinator, wake).await {
            return;
        }

        // Elect: one consistent snapshot of previous value and membership.
        let Some(view) = coordinator.round_view(self) else {
            return;
        };
        let Some(my_index) = view.my_index else {
            // Parked as the last winner, or freshly evicted: sit this
            // round out.
            trace!(node = %self, cycle = %view.cycle, "Not part of the current round");
            return;
        };

        // Mine: only the elected slot publishes.
        if view.winner_index == my_index {
            info!(node = %self, index = my_index, cycle = %view.cycle, "Elected to mine");
            let mined = coordinator.publish_candidate();
            info!(
                node = %self,
                index = my_index,
                mined = %mined,
                previous = %view.last_hash,
                "Published candidate value"
            );
        }

        // Close: the origin waits out the mining window, then settles the
        // round.
        if coordinator.is_origin(self) {
            tokio::time::sleep(coordinator.cycle_duration()).await;
            coordinator.close_round(view.winner_index);
        }
    }

    /// Block until the round opens. Returns `false` on teardown.
    ///
    /// A waiter woken by a membership change may have inherited the origin
    /// slot; if so it opens the round itself instead of waiting for a
    /// start signal nobody else would fire.
    async fn await_round(
        self: &Arc<Self>,
        coordinator: &Arc<Coordinator>,
        wake: &mut WakeReceiver,
    ) -> bool {
        loop {
            let event = wake.recv().await;
            // Wakes coalesce to the freshest tag, so a teardown that
            // overlaps a close-out may surface as a membership change;
            // the flag is authoritative.
            if coordinator.is_shutting_down() {
                return false;
            }
            match event {
                Some(Wake::RoundStarted) => return true,
                Some(Wake::MembershipChanged) => {
                    if coordinator.is_origin(self) {
                        coordinator.start_round(self);
                        return true;
                    }
                }
                Some(Wake::Shutdown) | None => return false,
            }
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id.get() {
            Some(id) => id.fmt(f),
            None => write!(f, "Node(?)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_inactive() {
        let node = Node::new();
        assert!(!node.is_running());
        assert!(!node.is_denied());
        assert_eq!(node.id(), None);
    }

    #[test]
    fn test_identity_is_assigned_once() {
        let node = Node::new();
        assert_eq!(node.assign_id_with(|| NodeId(1)), NodeId(1));
        // A second activation keeps the original identity.
        assert_eq!(node.assign_id_with(|| NodeId(2)), NodeId(1));
        assert_eq!(node.id(), Some(NodeId(1)));
    }

    #[test]
    fn test_halt_clears_running() {
        let node = Node::new();
        node.set_running(true);
        assert!(node.is_running());
        node.halt();
        assert!(!node.is_running());
    }

    #[test]
    fn test_display() {
        let node = Node::new();
        assert_eq!(node.to_string(), "Node(?)");
        node.assign_id_with(|| NodeId(7));
        assert_eq!(node.to_string(), "Node(7)");
    }
}
