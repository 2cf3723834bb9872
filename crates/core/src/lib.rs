//! Cycle synchronization and leader election for a simulated
//! proof-of-authority pool.
//!
//! A pool of logical nodes takes turns producing blocks, one per
//! synchronized cycle. The member at slot 0 of the pool (the origin)
//! drives every round: it opens the cycle, waits out the mining window,
//! then closes the round - judging the winner, evicting it on a failed
//! result and rotating membership.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       Coordinator                         │
//! │                                                           │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │  Mutex<Shared>: NodePool + RoundState + RNG + stats │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │  CycleBarrier: tagged broadcast wake (watch channel)│  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │  Rejoin timers: cancellable cooldown tasks          │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//!            ▲                  ▲                  ▲
//!       node task 1        node task 2        node task N
//!                (sync → elect → mine? → close?)
//! ```
//!
//! All cross-node state is funneled through the [`Coordinator`], which is
//! handed to every node at start. Only the origin's round start/close
//! paths mutate the pool or the round state; every node reads both through
//! the same lock, so election inputs are always a consistent snapshot.

mod barrier;
mod config;
mod coordinator;
mod election;
mod node;
mod pool;
mod round;

pub use barrier::{CycleBarrier, Wake, WakeReceiver};
pub use config::{default_failure, CoordinatorConfig, FailurePredicate};
pub use coordinator::{Coordinator, CoordinatorStats, RoundView};
pub use election::select_winner;
pub use node::Node;
pub use pool::NodePool;
pub use round::RoundState;
