//! End-to-end tests for the round simulation.
//!
//! These run real node tasks against short cycle durations and assert the
//! coarse safety and liveness properties of the design: rounds advance in
//! lock-step, the pool never empties, identities survive eviction and
//! rejoin, and teardown is clean. Counters that depend on scheduling (how
//! many evictions a run produces) are only checked for coherence, not for
//! exact values.

use authring_core::CoordinatorConfig;
use authring_simulation::{Simulation, SimulationConfig, SimulationError};
use authring_types::NodeId;
use std::time::Duration;
use tokio::time::timeout;
use tracing_test::traced_test;

fn fast_config(num_nodes: usize) -> SimulationConfig {
    SimulationConfig::new(num_nodes).with_coordinator(
        CoordinatorConfig::with_cycle_duration(Duration::from_millis(20))
            .with_rejoin_cooldown(Duration::from_millis(40))
            .with_seed(42),
    )
}

#[traced_test]
#[tokio::test(flavor = "multi_thread")]
async fn test_rounds_advance_in_lockstep() {
    let sim = Simulation::start(fast_config(3)).expect("bootstrap");

    sim.run_for(Duration::from_millis(400)).await;

    let cycles = sim.coordinator().cycle().0;
    assert!(cycles >= 2, "expected several rounds, got {cycles}");

    let stats = sim.stats();
    assert!(stats.rounds_started >= 2);
    // Every close-out judges exactly one winner, and every close-out
    // follows a round start.
    assert!(stats.hashes_accepted + stats.evictions <= stats.rounds_started);
    assert!(stats.rejoins <= stats.evictions);

    sim.shutdown().await;
}

#[traced_test]
#[tokio::test(flavor = "multi_thread")]
async fn test_pool_never_empties() {
    let sim = Simulation::start(fast_config(3)).expect("bootstrap");

    for _ in 0..20 {
        sim.run_for(Duration::from_millis(20)).await;
        let size = sim.coordinator().pool_size();
        assert!((1..=3).contains(&size), "pool size out of bounds: {size}");
    }

    sim.shutdown().await;
}

#[traced_test]
#[tokio::test(flavor = "multi_thread")]
async fn test_identities_survive_eviction_and_rejoin() {
    let sim = Simulation::start(fast_config(3)).expect("bootstrap");

    sim.run_for(Duration::from_millis(600)).await;

    // Bootstrap order fixes each node's identity for good.
    for (i, node) in sim.nodes().iter().enumerate() {
        assert_eq!(node.id(), Some(NodeId(i as u64 + 1)));
    }

    // Rejoins never mint fresh identities, and no identity is ever
    // active twice.
    let mut ids: Vec<u64> = sim
        .coordinator()
        .member_ids()
        .iter()
        .map(|id| id.0)
        .collect();
    assert!(ids.iter().all(|id| (1..=3).contains(id)), "ids: {ids:?}");
    let active = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), active, "duplicate identity in the pool");

    sim.shutdown().await;
}

#[traced_test]
#[tokio::test(flavor = "multi_thread")]
async fn test_singleton_pool_keeps_producing() {
    let sim = Simulation::start(fast_config(1)).expect("bootstrap");

    sim.run_for(Duration::from_millis(200)).await;

    let stats = sim.stats();
    assert!(sim.coordinator().cycle().0 >= 2);
    // A lone origin always elects itself and is never evicted.
    assert_eq!(stats.evictions, 0);
    assert_eq!(sim.coordinator().pool_size(), 1);

    sim.shutdown().await;
}

#[traced_test]
#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_is_clean_and_prompt() {
    let sim = Simulation::start(fast_config(4)).expect("bootstrap");
    sim.run_for(Duration::from_millis(100)).await;

    // Shutdown joins every node loop; a stuck waiter would hang here.
    timeout(Duration::from_secs(5), sim.shutdown())
        .await
        .expect("shutdown did not complete");
}

#[test]
fn test_zero_nodes_rejected() {
    let result = Simulation::start(SimulationConfig::new(0));
    assert!(matches!(result, Err(SimulationError::NoNodes)));
}
