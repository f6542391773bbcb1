//! Death counter broadcast hub
//!
//! Holds the latest published (deaths, name) pair and wakes every subscriber
//! when it changes. Wakeups are lossy: each subscriber has room for exactly
//! one pending notification, and a subscriber that has not drained it yet is
//! skipped. Subscribers re-read the latest pair with [`DeathCounter::get`]
//! when woken, so a skipped wakeup never loses the final value.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use deathwatch_types::DeathSnapshot;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Opaque handle identifying one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Debug, Default)]
struct CounterState {
    deaths: u32,
    name: String,
    subscribers: HashMap<SubscriberId, mpsc::Sender<()>>,
    next_id: u64,
}

/// Shared counter state. Construct once and hand an `Arc` to the poller's
/// sink list and to the web server.
#[derive(Debug, Default)]
pub struct DeathCounter {
    state: RwLock<CounterState>,
}

impl DeathCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published pair and wake every subscriber that has room.
    ///
    /// Returns how many subscribers were signalled.
    pub fn update(&self, deaths: u32, name: &str) -> usize {
        let mut state = self.write();
        state.deaths = deaths;
        name.clone_into(&mut state.name);

        state
            .subscribers
            .values()
            .filter(|tx| match tx.try_send(()) {
                Ok(()) => true,
                // Already has a pending wakeup, or its receiver is going away
                Err(TrySendError::Full(())) | Err(TrySendError::Closed(())) => false,
            })
            .count()
    }

    /// Latest published pair.
    pub fn get(&self) -> DeathSnapshot {
        let state = self.read();
        DeathSnapshot::new(state.deaths, state.name.as_str())
    }

    /// Register a new subscriber with a single-slot wakeup channel.
    ///
    /// The returned [`Subscription`] unsubscribes itself when dropped.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(1);
        let mut state = self.write();
        let id = SubscriberId(state.next_id);
        state.next_id += 1;
        state.subscribers.insert(id, tx);

        Subscription {
            id,
            rx,
            counter: Arc::downgrade(self),
        }
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.write().subscribers.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.read().subscribers.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, CounterState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CounterState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A registered wakeup channel.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<()>,
    counter: Weak<DeathCounter>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next wakeup. Returns false once the subscription has been
    /// removed from the hub.
    pub async fn notified(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    /// Consume a pending wakeup without waiting.
    #[cfg(test)]
    pub(crate) fn try_notified(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(counter) = self.counter.upgrade() {
            counter.unsubscribe(self.id);
        }
    }
}
