//! Shared coordination state: membership, round bookkeeping, wake-ups and
//! rejoin scheduling.

use crate::barrier::{CycleBarrier, WakeReceiver};
use crate::config::CoordinatorConfig;
use crate::election::select_winner;
use crate::node::Node;
use crate::pool::NodePool;
use crate::round::RoundState;
use authring_types::{Cycle, HashValue, NodeId};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything behind the coordinator's single lock.
///
/// Pool membership and round state are read together by every node and
/// mutated together by the origin, so they share one critical section: no
/// reader can observe a half-applied close-out.
struct Shared {
    pool: NodePool,
    round: RoundState,
    rng: ChaCha8Rng,
    stats: CoordinatorStats,
}

/// A node's consistent snapshot of the election inputs for one round.
#[derive(Debug, Clone, Copy)]
pub struct RoundView {
    /// The round this snapshot belongs to.
    pub cycle: Cycle,
    /// Election input: the previous round's agreed value.
    pub last_hash: HashValue,
    /// Membership size at snapshot time.
    pub pool_size: usize,
    /// The snapshotting node's slot, if it is part of this round.
    pub my_index: Option<usize>,
    /// The slot elected to mine this round.
    pub winner_index: usize,
}

/// Counters kept across the lifetime of a coordinator.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoordinatorStats {
    /// Rounds opened by an origin.
    pub rounds_started: u64,
    /// Close-outs where the winner's value stood.
    pub hashes_accepted: u64,
    /// Winners removed for a failed result.
    pub evictions: u64,
    /// Evicted nodes re-admitted after their cooldown.
    pub rejoins: u64,
}

/// Owner of all cross-node state.
///
/// Constructed once per simulated network and handed to every node at
/// start. Only the origin's round start/close paths mutate the pool or the
/// round state; everything else reads through [`Coordinator::round_view`].
pub struct Coordinator {
    shared: Mutex<Shared>,
    barrier: CycleBarrier,
    config: CoordinatorConfig,
    next_id: AtomicU64,
    /// Pending cooldown timers, keyed by node id so teardown can cancel
    /// them before a fired timer re-activates its node.
    rejoins: Mutex<HashMap<NodeId, JoinHandle<()>>>,
    /// Handles of all spawned node loops, drained at teardown.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Once set, no node can be admitted and no rejoin can be scheduled;
    /// node loops exit at their next iteration.
    shutdown: AtomicBool,
}

impl Coordinator {
    /// Create a coordinator with the given configuration.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            shared: Mutex::new(Shared {
                pool: NodePool::new(),
                round: RoundState::new(),
                rng: ChaCha8Rng::seed_from_u64(config.seed),
                stats: CoordinatorStats::default(),
            }),
            barrier: CycleBarrier::new(),
            config,
            next_id: AtomicU64::new(1),
            rejoins: Mutex::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
            shutdown: AtomicBool::new(false),
        }
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().expect("coordinator state lock poisoned")
    }

    fn rejoin_timers(&self) -> MutexGuard<'_, HashMap<NodeId, JoinHandle<()>>> {
        self.rejoins.lock().expect("rejoin timer lock poisoned")
    }

    /// The configured mining window.
    pub fn cycle_duration(&self) -> Duration {
        self.config.cycle_duration
    }

    /// Subscribe to round wake-ups.
    pub fn subscribe(&self) -> WakeReceiver {
        self.barrier.subscribe()
    }

    /// Admit a node into the pool and mark it active.
    ///
    /// Assigns identity on first activation. The first admission seeds the
    /// round state with a random genesis value for the first election to
    /// run against. Returns `false` without admitting when the identity is
    /// already active (pooled or parked as the pending rejoin).
    pub(crate) fn activate(&self, node: &Arc<Node>) -> bool {
        let id = node.assign_id_with(|| NodeId(self.next_id.fetch_add(1, Ordering::Relaxed)));

        if self.is_shutting_down() {
            debug!(node = %id, "Shutting down, refusing activation");
            return false;
        }

        let (index, origin) = {
            let mut shared = self.shared();
            let already_active = shared.pool.index_of(node).is_some()
                || shared
                    .round
                    .pending_rejoin
                    .as_ref()
                    .is_some_and(|parked| Arc::ptr_eq(parked, node));
            if already_active {
                warn!(node = %id, "Node is already active, ignoring activation");
                return false;
            }
            if shared.pool.is_empty() {
                let genesis = HashValue::random(&mut shared.rng);
                shared.round.last_hash = genesis;
                shared.round.new_hash = genesis;
            }
            shared.pool.add(node.clone());
            let origin = shared.pool.origin().and_then(|o| o.id()).unwrap_or(id);
            (shared.pool.len() - 1, origin)
        };

        node.set_denied(false);
        node.set_running(true);

        info!(node = %id, index, origin = %origin, "Node starting");
        true
    }

    /// Open a new round: advance the cycle, roll the previous value
    /// forward, and release all waiters.
    ///
    /// Only the current origin may open a round; a stale caller that lost
    /// the slot between checking and calling is ignored and `false` is
    /// returned.
    pub fn start_round(&self, node: &Arc<Node>) -> bool {
        {
            let mut shared = self.shared();
            let is_origin = shared
                .pool
                .origin()
                .is_some_and(|origin| Arc::ptr_eq(origin, node));
            if !is_origin {
                return false;
            }

            shared.round.cycle = shared.round.cycle.next();
            shared.round.last_hash = shared.round.new_hash;
            shared.stats.rounds_started += 1;

            let pending = shared
                .round
                .pending_rejoin
                .as_ref()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "none".to_string());
            info!(
                origin = %node,
                cycle = %shared.round.cycle,
                pool = %shared.pool.summary(),
                pending = %pending,
                "Starting cycle"
            );
        }

        self.barrier.round_started();
        true
    }

    /// Snapshot the election inputs for the calling node.
    ///
    /// Previous value, membership size and slot assignments are read in
    /// one critical section, so every field of the view is mutually
    /// consistent. Returns `None` while the pool is empty.
    pub fn round_view(&self, node: &Arc<Node>) -> Option<RoundView> {
        let shared = self.shared();
        if shared.pool.is_empty() {
            return None;
        }
        Some(RoundView {
            cycle: shared.round.cycle,
            last_hash: shared.round.last_hash,
            pool_size: shared.pool.len(),
            my_index: shared.pool.index_of(node),
            winner_index: select_winner(shared.round.last_hash, shared.pool.len()),
        })
    }

    /// Whether the node currently holds the origin slot.
    pub fn is_origin(&self, node: &Arc<Node>) -> bool {
        self.shared()
            .pool
            .origin()
            .is_some_and(|origin| Arc::ptr_eq(origin, node))
    }

    /// Mint and publish this round's candidate value.
    pub fn publish_candidate(&self) -> HashValue {
        let mut shared = self.shared();
        let mined = HashValue::random(&mut shared.rng);
        shared.round.new_hash = mined;
        mined
    }

    /// Settle the round: judge the winner, rotate membership, and wake all
    /// waiters so a possible new origin takes over.
    ///
    /// Called by the origin once per round after the mining window. The
    /// membership-changed wake fires exactly once per close-out, whether
    /// or not membership actually changed.
    pub fn close_round(self: &Arc<Self>, winner_index: usize) {
        {
            let mut shared = self.shared();

            if let Some(winner) = shared.pool.get(winner_index).cloned() {
                let last = shared.round.last_hash;
                let new = shared.round.new_hash;
                let winner_is_origin = shared
                    .pool
                    .origin()
                    .is_some_and(|origin| Arc::ptr_eq(origin, &winner));

                let failed =
                    new == last || last.is_uninit() || (self.config.simulated_failure)(new);
                let evict = failed && !winner_is_origin && shared.pool.len() > 1;

                if evict {
                    warn!(
                        node = %winner,
                        index = winner_index,
                        last = %last,
                        new = %new,
                        "Winner failed mining, removing from pool"
                    );
                    shared.stats.evictions += 1;
                    winner.set_denied(true);
                    winner.halt();
                    self.schedule_rejoin(winner.clone());
                } else {
                    shared.stats.hashes_accepted += 1;
                }

                // Rotate: the winner leaves its slot for one round, and the
                // previously parked winner comes back at the tail.
                let rotated = if shared.pool.len() > 1 {
                    shared.pool.remove_at(winner_index).is_some()
                } else {
                    false
                };
                if let Some(returning) = shared.round.pending_rejoin.take() {
                    shared.pool.add(returning);
                }
                // An evicted winner returns through its cooldown timer, and
                // a lone origin never left its slot; neither is parked.
                shared.round.pending_rejoin = if evict || !rotated { None } else { Some(winner) };
            } else {
                // A racing rejoin can reshape the pool mid-round; nothing
                // to settle.
                warn!(
                    winner_index,
                    pool = %shared.pool.summary(),
                    "Winner slot vanished before close-out"
                );
            }
        }

        self.barrier.membership_changed();
    }

    /// Park an evicted node and bring it back after the cooldown.
    ///
    /// The timer is owned by the coordinator so teardown can cancel it
    /// before it re-activates the node.
    fn schedule_rejoin(self: &Arc<Self>, node: Arc<Node>) {
        if self.is_shutting_down() {
            return;
        }
        let Some(id) = node.id() else {
            // Pool members always carry an identity.
            return;
        };
        let cooldown = self.config.rejoin_cooldown;
        let handle = tokio::spawn({
            let coordinator = self.clone();
            async move {
                tokio::time::sleep(cooldown).await;
                coordinator.rejoin_timers().remove(&id);
                coordinator.shared().stats.rejoins += 1;
                debug!(node = %id, "Cooldown over, rejoining pool");
                node.start(&coordinator);
            }
        });
        if let Some(stale) = self.rejoin_timers().insert(id, handle) {
            stale.abort();
        }
    }

    /// Abort all pending rejoin timers. Called at teardown, before nodes
    /// are deactivated, so no timer can re-activate a node afterwards.
    pub fn cancel_rejoins(&self) {
        for (id, handle) in self.rejoin_timers().drain() {
            handle.abort();
            debug!(node = %id, "Rejoin cancelled");
        }
    }

    /// Begin teardown: refuse further activations and rejoins, and wake
    /// every blocked waiter so node loops can exit.
    pub fn announce_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.barrier.shutdown();
    }

    /// Whether teardown has been announced.
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub(crate) fn register_task(&self, task: JoinHandle<()>) {
        self.tasks
            .lock()
            .expect("task registry lock poisoned")
            .push(task);
    }

    /// Drain the spawned node-loop handles so the harness can await them.
    pub fn take_tasks(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *self.tasks.lock().expect("task registry lock poisoned"))
    }

    /// Current round index.
    pub fn cycle(&self) -> Cycle {
        self.shared().round.cycle
    }

    /// Current pool size.
    pub fn pool_size(&self) -> usize {
        self.shared().pool.len()
    }

    /// Ids of the current members, in slot order.
    pub fn member_ids(&self) -> Vec<NodeId> {
        self.shared().pool.iter().filter_map(|n| n.id()).collect()
    }

    /// Snapshot of the lifetime counters.
    pub fn stats(&self) -> CoordinatorStats {
        self.shared().stats
    }

    #[cfg(test)]
    fn set_hashes(&self, last: HashValue, new: HashValue) {
        let mut shared = self.shared();
        shared.round.last_hash = last;
        shared.round.new_hash = new;
    }

    #[cfg(test)]
    fn pending_rejoin_id(&self) -> Option<NodeId> {
        self.shared()
            .round
            .pending_rejoin
            .as_ref()
            .and_then(|n| n.id())
    }
}
