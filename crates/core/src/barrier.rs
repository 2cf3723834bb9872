//! Round wake-up broadcast.
//!
//! One watch channel carries a tagged wake event, so a waiter never has
//! to guess which of several ready signals fired first: it reads a single
//! discriminated value and acts on the tag.

use tokio::sync::watch;

/// A broadcast wake-up, tagged with why it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The origin opened a new round; waiters proceed to election.
    RoundStarted,
    /// A close-out finished. The origin slot may have changed hands, so
    /// waiters re-check whether they now drive the round themselves.
    MembershipChanged,
    /// The simulation is tearing down; waiters exit their loop.
    Shutdown,
}

/// Reusable "notify all current waiters, then reset" barrier.
///
/// Each send releases every subscribed waiter; the channel is immediately
/// ready for the next round's wake. New subscribers only observe wakes
/// sent after they subscribed. A slow waiter sees the freshest tag, not
/// the history.
pub struct CycleBarrier {
    tx: watch::Sender<Wake>,
}

impl CycleBarrier {
    /// Create a barrier with no pending wake.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Wake::RoundStarted);
        Self { tx }
    }

    /// Subscribe a waiter. The current value counts as already seen.
    pub fn subscribe(&self) -> WakeReceiver {
        WakeReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Release all waiters into the new round.
    pub fn round_started(&self) {
        self.announce(Wake::RoundStarted);
    }

    /// Tell waiters to re-evaluate the origin slot.
    pub fn membership_changed(&self) {
        self.announce(Wake::MembershipChanged);
    }

    /// Release all waiters for teardown.
    pub fn shutdown(&self) {
        self.announce(Wake::Shutdown);
    }

    fn announce(&self, wake: Wake) {
        // A lone origin has no waiters; that is not an error.
        let _ = self.tx.send(wake);
    }
}

impl Default for CycleBarrier {
    fn default() -> Self {
        Self::new()
    }
}

/// A node's subscription to the barrier.
pub struct WakeReceiver {
    rx: watch::Receiver<Wake>,
}

impl WakeReceiver {
    /// Wait for the next wake. Returns `None` if the barrier was dropped.
    pub async fn recv(&mut self) -> Option<Wake> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_wake_reaches_all_subscribers() {
        let barrier = CycleBarrier::new();
        let mut a = barrier.subscribe();
        let mut b = barrier.subscribe();

        barrier.round_started();

        assert_eq!(a.recv().await, Some(Wake::RoundStarted));
        assert_eq!(b.recv().await, Some(Wake::RoundStarted));
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_wakes() {
        let barrier = CycleBarrier::new();
        barrier.round_started();

        let mut rx = barrier.subscribe();
        let result = timeout(Duration::from_millis(20), rx.recv()).await;
        assert!(result.is_err(), "late subscriber saw a stale wake");
    }

    #[tokio::test]
    async fn test_slow_waiter_sees_latest_wake_only() {
        let barrier = CycleBarrier::new();
        let mut rx = barrier.subscribe();

        barrier.round_started();
        barrier.membership_changed();

        assert_eq!(rx.recv().await, Some(Wake::MembershipChanged));
        let result = timeout(Duration::from_millis(20), rx.recv()).await;
        assert!(result.is_err(), "coalesced wakes should be seen once");
    }

    #[tokio::test]
    async fn test_barrier_is_reusable_across_rounds() {
        let barrier = CycleBarrier::new();
        let mut rx = barrier.subscribe();

        barrier.round_started();
        assert_eq!(rx.recv().await, Some(Wake::RoundStarted));

        barrier.membership_changed();
        assert_eq!(rx.recv().await, Some(Wake::MembershipChanged));

        // Same tag again still wakes: sends are edge-triggered, not
        // value-deduplicated.
        barrier.membership_changed();
        assert_eq!(rx.recv().await, Some(Wake::MembershipChanged));
    }

    #[tokio::test]
    async fn test_shutdown_wake() {
        let barrier = CycleBarrier::new();
        let mut rx = barrier.subscribe();

        barrier.shutdown();

        assert_eq!(rx.recv().await, Some(Wake::Shutdown));
    }

    #[tokio::test]
    async fn test_recv_after_barrier_dropped() {
        let barrier = CycleBarrier::new();
        let mut rx = barrier.subscribe();

        drop(barrier);

        assert_eq!(rx.recv().await, None);
    }
}
