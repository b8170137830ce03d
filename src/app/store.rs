// ChatLog - app/store.rs
//
// Bounded, append-only message store with an observable change version.
//
// Architecture:
//   - `MessageStore` is a cheap-to-clone handle; all clones share one
//     `Mutex<StoreState>` and one `Condvar`.
//   - The message list sits behind an `Arc` and is copied on write, so
//     `snapshot()` is O(1) and a snapshot is never touched by later appends.
//   - The list and the change version are updated under the same lock, so a
//     snapshot always pairs a version with the complete list it describes.
//   - `ChangeSubscription` compares change sequence numbers. Waiters only
//     observe the latest version: rapid appends coalesce into one wake-up.
//   - Cancelling a subscription sets its flag, then notifies under the lock
//     so a waiter on another thread wakes immediately and never misses it.

use crate::app::clock::{Clock, SystemClock};
use crate::core::model::{ChangeVersion, Message, Snapshot};
use crate::util::constants::MESSAGE_CAPACITY;
use crate::util::logging::preview;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// =============================================================================
// Shared state
// =============================================================================

#[derive(Debug)]
struct StoreState {
    messages: Arc<Vec<Message>>,
    version: ChangeVersion,
    subscribers: usize,
}

#[derive(Debug)]
struct Shared {
    capacity: usize,
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState>,
    changed: Condvar,
}

impl Shared {
    /// Every mutation leaves `StoreState` consistent, so a poisoned lock is
    /// still safe to use.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// MessageStore
// =============================================================================

/// The chat log. One instance per session, injected into producers and
/// consumers by cloning the handle.
#[derive(Debug, Clone)]
pub struct MessageStore {
    shared: Arc<Shared>,
}

impl MessageStore {
    /// Store with the default capacity and the system clock.
    pub fn new() -> Self {
        Self::with_clock(MESSAGE_CAPACITY, Arc::new(SystemClock))
    }

    /// Store with an explicit capacity (clamped to at least 1) and clock.
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Shared {
                capacity,
                clock,
                state: Mutex::new(StoreState {
                    messages: Arc::new(Vec::with_capacity(
                        capacity.saturating_add(1).min(MESSAGE_CAPACITY + 1),
                    )),
                    version: ChangeVersion::INITIAL,
                    subscribers: 0,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    /// Append a message stamped with the current time.
    ///
    /// The text is stored as given; trimming and rejecting empty input is the
    /// caller's job. When the store is full the oldest message is evicted.
    /// Returns the new change version.
    pub fn append(&self, text: impl Into<String>) -> ChangeVersion {
        let text = text.into();
        let capacity = self.shared.capacity;

        let (version, len, evicted) = {
            let mut state = self.shared.lock();
            let version = state.version.next(self.shared.clock.now_millis());

            // Copies the list only if a snapshot still holds the old one.
            let messages = Arc::make_mut(&mut state.messages);
            messages.push(Message::new(text, version.updated_at_ms));
            let evicted = if messages.len() > capacity {
                Some(messages.remove(0))
            } else {
                None
            };
            let len = messages.len();

            state.version = version;
            (version, len, evicted)
        };

        self.shared.changed.notify_all();

        tracing::debug!(%version, len, "Message appended");
        if let Some(old) = evicted {
            tracing::debug!(
                timestamp = old.timestamp,
                text = %preview(&old.text),
                "Evicted oldest message"
            );
        }

        version
    }

    /// Immutable copy of the current messages, oldest first.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.shared.lock();
        Snapshot::new(Arc::clone(&state.messages), state.version)
    }

    /// Register interest in changes. The subscription starts at the current
    /// version, so it reports only changes made after this call.
    pub fn subscribe(&self) -> ChangeSubscription {
        let seen = {
            let mut state = self.shared.lock();
            state.subscribers += 1;
            state.version
        };
        tracing::debug!(%seen, "Subscriber registered");
        ChangeSubscription {
            shared: Arc::clone(&self.shared),
            cancelled: Arc::new(AtomicBool::new(false)),
            seen,
        }
    }

    /// The current change version.
    pub fn version(&self) -> ChangeVersion {
        self.shared.lock().version
    }

    pub fn len(&self) -> usize {
        self.shared.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of subscriptions that have not been cancelled or dropped.
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Subscriptions
// =============================================================================

/// Outcome of `ChangeSubscription::wait_for_change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The store moved past the last seen version; this is the newest one.
    Changed(ChangeVersion),

    /// No change before the timeout elapsed.
    TimedOut,

    /// The subscription was revoked.
    Cancelled,
}

/// A live view of the store's change version.
///
/// Dropping the subscription revokes it.
#[derive(Debug)]
pub struct ChangeSubscription {
    shared: Arc<Shared>,
    cancelled: Arc<AtomicBool>,
    seen: ChangeVersion,
}

impl ChangeSubscription {
    /// The store's current version (which may be newer than `last_seen`).
    pub fn current(&self) -> ChangeVersion {
        self.shared.lock().version
    }

    /// The newest version this subscription has reported.
    pub fn last_seen(&self) -> ChangeVersion {
        self.seen
    }

    /// Non-blocking check. Returns the newest version if it differs from the
    /// last one reported; `None` if nothing changed or the subscription is
    /// cancelled.
    pub fn poll_change(&mut self) -> Option<ChangeVersion> {
        if self.is_cancelled() {
            return None;
        }
        let current = self.current();
        self.observe(current)
    }

    /// Block until the store changes, the subscription is cancelled, or
    /// `timeout` elapses. A timeout too large to represent as a deadline
    /// (e.g. `Duration::MAX`) waits without one.
    pub fn wait_for_change(&mut self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now().checked_add(timeout);
        let shared = Arc::clone(&self.shared);
        let mut state = shared.lock();

        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                return WaitOutcome::Cancelled;
            }
            let current = state.version;
            if let Some(version) = self.observe(current) {
                return WaitOutcome::Changed(version);
            }

            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return WaitOutcome::TimedOut;
                    }
                    shared
                        .changed
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => shared
                    .changed
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// Revoke the subscription. No further changes are reported and any
    /// waiter returns `WaitOutcome::Cancelled`.
    pub fn cancel(&self) {
        revoke(&self.shared, &self.cancelled);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// A handle that can revoke this subscription from another thread.
    pub fn canceller(&self) -> SubscriptionCanceller {
        SubscriptionCanceller {
            shared: Arc::clone(&self.shared),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    fn observe(&mut self, current: ChangeVersion) -> Option<ChangeVersion> {
        if current.seq > self.seen.seq {
            self.seen = current;
            Some(current)
        } else {
            None
        }
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        revoke(&self.shared, &self.cancelled);
    }
}

/// Revokes a `ChangeSubscription` from any thread.
#[derive(Debug, Clone)]
pub struct SubscriptionCanceller {
    shared: Arc<Shared>,
    cancelled: Arc<AtomicBool>,
}

impl SubscriptionCanceller {
    pub fn cancel(&self) {
        revoke(&self.shared, &self.cancelled);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Set the flag once, release the subscriber slot, and wake waiters.
fn revoke(shared: &Shared, cancelled: &AtomicBool) {
    if cancelled.swap(true, Ordering::SeqCst) {
        return;
    }
    {
        // Taking the lock orders the flag before any waiter's next check.
        let mut state = shared.lock();
        state.subscribers = state.subscribers.saturating_sub(1);
    }
    shared.changed.notify_all();
    tracing::debug!("Subscriber revoked");
}
