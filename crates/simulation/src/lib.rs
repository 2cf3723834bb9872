//! Simulation bootstrap and teardown.
//!
//! Spins up a fixed set of nodes against one [`Coordinator`] and later
//! tears them all down. The harness owns orchestration only - creating
//! nodes, starting them, and forcing every node inactive at the end; all
//! round semantics live in `authring-core`.

use authring_core::{Coordinator, CoordinatorConfig, CoordinatorStats, Node};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors from simulation bootstrap.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A pool needs at least one member to hold the origin slot.
    #[error("simulation requires at least one node")]
    NoNodes,
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    /// Number of nodes to bootstrap into the pool.
    pub num_nodes: usize,
    /// Round pacing and eviction settings.
    pub coordinator: CoordinatorConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_nodes: 3,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Create a config for `num_nodes` nodes with default pacing.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            ..Default::default()
        }
    }

    /// Override the coordinator settings.
    pub fn with_coordinator(mut self, coordinator: CoordinatorConfig) -> Self {
        self.coordinator = coordinator;
        self
    }
}

/// A running set of nodes cooperating through one coordinator.
pub struct Simulation {
    coordinator: Arc<Coordinator>,
    nodes: Vec<Arc<Node>>,
}

impl Simulation {
    /// Bootstrap the configured number of nodes and start their loops.
    ///
    /// The first node started holds the origin slot and opens the first
    /// round immediately. Must be called from within a Tokio runtime.
    pub fn start(config: SimulationConfig) -> Result<Self, SimulationError> {
        if config.num_nodes == 0 {
            return Err(SimulationError::NoNodes);
        }

        let coordinator = Arc::new(Coordinator::new(config.coordinator));
        let nodes: Vec<Arc<Node>> = (0..config.num_nodes)
            .map(|_| Arc::new(Node::new()))
            .collect();
        for node in &nodes {
            node.start(&coordinator);
        }

        info!(num_nodes = config.num_nodes, "Simulation started");
        Ok(Self { coordinator, nodes })
    }

    /// The shared coordinator, for inspection.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// The nodes owned by this simulation, in bootstrap order.
    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    /// Lifetime counters so far.
    pub fn stats(&self) -> CoordinatorStats {
        self.coordinator.stats()
    }

    /// Let the simulation run for a wall-clock duration.
    pub async fn run_for(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Tear everything down: cancel pending rejoins, force every node
    /// inactive without rejoin, wake blocked waiters, and wait for all
    /// node loops to exit.
    pub async fn shutdown(self) {
        // The announcement goes first: it closes the door on activations
        // and rejoin scheduling, so a cooldown firing mid-teardown cannot
        // re-activate a node that was just deactivated.
        self.coordinator.announce_shutdown();
        self.coordinator.cancel_rejoins();
        for node in &self.nodes {
            node.halt();
        }
        for task in self.coordinator.take_tasks() {
            let _ = task.await;
        }

        let stats = self.coordinator.stats();
        info!(
            rounds = stats.rounds_started,
            accepted = stats.hashes_accepted,
            evictions = stats.evictions,
            rejoins = stats.rejoins,
            "Simulation shut down"
        );
    }
}
