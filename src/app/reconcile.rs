// ChatLog - app/reconcile.rs
//
// Background consumer: keeps a `ListReconciler` in step with the store and
// streams the resulting edit scripts to the view thread.
//
// Architecture:
//   - `ReconcileManager` lives on the view thread; `run_reconciler` runs on a
//     background thread that owns the reconciler and a store subscription.
//   - The thread renders the current snapshot immediately, then waits on the
//     subscription. Each wake-up pulls one full snapshot, so a burst of
//     appends produces a single edit script.
//   - Updates travel over an mpsc channel; the view drains them with
//     `poll_updates` (bounded per call) or blocks on `recv_update`.
//   - `stop` sets the cancel flag and revokes the subscription, which wakes
//     the thread straight away instead of at the end of its wait slice.

use crate::app::store::{ChangeSubscription, MessageStore, SubscriptionCanceller, WaitOutcome};
use crate::core::model::ChangeVersion;
use crate::core::reconciler::{ListReconciler, Reconciliation};
use crate::util::constants::{MAX_VIEW_UPDATES_PER_FRAME, RECONCILE_WAIT_SLICE_MS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

/// Messages sent from the reconcile thread to the view thread.
#[derive(Debug, Clone)]
pub enum ViewUpdate {
    /// The thread is running; the initial render follows immediately.
    Started { version: ChangeVersion },

    /// A snapshot was diffed against the previous one.
    Reconciled(Reconciliation),

    /// The thread has exited.
    Stopped,
}

/// Manages the reconcile thread for one view.
pub struct ReconcileManager {
    /// Channel receiver for the view to poll updates.
    pub update_rx: Option<mpsc::Receiver<ViewUpdate>>,
    /// Cancel flag shared with the background thread.
    cancel_flag: Option<Arc<AtomicBool>>,
    /// Revokes the thread's subscription so it wakes immediately on stop.
    canceller: Option<SubscriptionCanceller>,
    handle: Option<JoinHandle<()>>,
    wait_slice: Duration,
}

impl ReconcileManager {
    pub fn new() -> Self {
        Self::with_wait_slice(Duration::from_millis(RECONCILE_WAIT_SLICE_MS))
    }

    /// Manager whose thread re-checks its cancel flag every `wait_slice`.
    pub fn with_wait_slice(wait_slice: Duration) -> Self {
        Self {
            update_rx: None,
            cancel_flag: None,
            canceller: None,
            handle: None,
            wait_slice,
        }
    }

    /// Start reconciling against `store`. If already running, the previous
    /// thread is stopped first.
    ///
    /// The subscription is taken on the calling thread, so no append made
    /// after `start` returns can be missed.
    pub fn start(&mut self, store: &MessageStore) {
        self.stop();

        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let subscription = store.subscribe();

        self.update_rx = Some(rx);
        self.cancel_flag = Some(Arc::clone(&cancel));
        self.canceller = Some(subscription.canceller());

        let store = store.clone();
        let wait_slice = self.wait_slice;
        self.handle = Some(std::thread::spawn(move || {
            run_reconciler(store, subscription, tx, cancel, wait_slice);
        }));

        tracing::info!("Reconciler started");
    }

    /// Ask the reconcile thread to stop. Pending updates are discarded and
    /// the thread is detached: it exits on its own shortly after, but this
    /// call does not wait for it. Use `shutdown` to join.
    pub fn stop(&mut self) {
        if let Some(flag) = self.cancel_flag.take() {
            flag.store(true, Ordering::SeqCst);
            tracing::info!("Reconciler stopping");
        }
        if let Some(canceller) = self.canceller.take() {
            canceller.cancel();
        }
        self.update_rx = None;
        self.handle = None;
    }

    /// Stop the thread and wait for it to exit.
    pub fn shutdown(&mut self) {
        let handle = self.handle.take();
        self.stop();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Reconcile thread panicked");
            }
        }
    }

    /// Returns `true` if a reconcile thread is currently active.
    pub fn is_active(&self) -> bool {
        self.cancel_flag.is_some()
    }

    /// Drain pending updates without blocking, at most
    /// `MAX_VIEW_UPDATES_PER_FRAME` per call.
    pub fn poll_updates(&self) -> Vec<ViewUpdate> {
        let mut updates = Vec::new();
        if let Some(ref rx) = self.update_rx {
            while updates.len() < MAX_VIEW_UPDATES_PER_FRAME {
                match rx.try_recv() {
                    Ok(update) => updates.push(update),
                    Err(_) => break,
                }
            }
        }
        updates
    }

    /// Block for up to `timeout` waiting for the next update.
    pub fn recv_update(&self, timeout: Duration) -> Option<ViewUpdate> {
        self.update_rx.as_ref()?.recv_timeout(timeout).ok()
    }
}

impl Default for ReconcileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReconcileManager {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Background reconcile loop
// =============================================================================

fn run_reconciler(
    store: MessageStore,
    mut subscription: ChangeSubscription,
    tx: mpsc::Sender<ViewUpdate>,
    cancel: Arc<AtomicBool>,
    wait_slice: Duration,
) {
    macro_rules! send {
        ($msg:expr) => {
            if tx.send($msg).is_err() {
                // View channel closed; exit silently.
                return;
            }
        };
    }

    let mut reconciler = ListReconciler::new();

    let initial = reconciler.on_change(store.snapshot());
    send!(ViewUpdate::Started {
        version: initial.version
    });
    send!(ViewUpdate::Reconciled(initial));

    loop {
        if cancel.load(Ordering::SeqCst) {
            send!(ViewUpdate::Stopped);
            return;
        }

        match subscription.wait_for_change(wait_slice) {
            WaitOutcome::Changed(version) => {
                let snapshot = store.snapshot();
                tracing::trace!(
                    %version,
                    snapshot_version = %snapshot.version(),
                    "Change observed"
                );
                send!(ViewUpdate::Reconciled(reconciler.on_change(snapshot)));
            }
            WaitOutcome::TimedOut => {}
            WaitOutcome::Cancelled => {
                send!(ViewUpdate::Stopped);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::clock::ManualClock;
    use crate::core::model::Message;
    use crate::util::constants::MESSAGE_CAPACITY;
    use std::time::Instant;

    fn test_store() -> MessageStore {
        MessageStore::with_clock(MESSAGE_CAPACITY, Arc::new(ManualClock::stepping(0, 1)))
    }

    /// Receive updates, applying scripts to `rows`, until the rendered
    /// version reaches `target`.
    fn follow_until(
        manager: &ReconcileManager,
        rows: &mut Vec<Message>,
        target: u64,
    ) -> Vec<Reconciliation> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();
        let mut rendered = 0;
        while rendered < target || seen.is_empty() {
            assert!(Instant::now() < deadline, "timed out waiting for v{target}");
            if let Some(ViewUpdate::Reconciled(rec)) =
                manager.recv_update(Duration::from_millis(50))
            {
                rec.script.apply(rows);
                rendered = rec.version.seq;
                seen.push(rec);
            }
        }
        seen
    }

    #[test]
    fn test_initial_render_follows_started() {
        let store = test_store();
        store.append("hi");
        let mut manager = ReconcileManager::with_wait_slice(Duration::from_millis(10));
        manager.start(&store);

        let first = manager.recv_update(Duration::from_secs(5));
        assert!(matches!(first, Some(ViewUpdate::Started { version }) if version.seq == 1));
        match manager.recv_update(Duration::from_secs(5)) {
            Some(ViewUpdate::Reconciled(rec)) => {
                assert_eq!(rec.script.summary().inserts, 1);
                assert!(rec.scroll_to_end);
            }
            other => panic!("expected initial render, got {other:?}"),
        }
        manager.shutdown();
    }

    #[test]
    fn test_view_tracks_store() {
        let store = test_store();
        let mut manager = ReconcileManager::with_wait_slice(Duration::from_millis(10));
        manager.start(&store);

        let mut rows = Vec::new();
        follow_until(&manager, &mut rows, 0);

        for n in 0..130 {
            store.append(format!("m{n}"));
        }
        follow_until(&manager, &mut rows, 130);

        assert_eq!(rows, store.snapshot().to_vec());
        assert_eq!(rows.len(), MESSAGE_CAPACITY);
        assert_eq!(rows[0].text, "m30");
        manager.shutdown();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_stop_revokes_subscription_promptly() {
        let store = test_store();
        let mut manager = ReconcileManager::with_wait_slice(Duration::from_secs(30));
        manager.start(&store);
        assert!(manager.is_active());
        assert_eq!(store.subscriber_count(), 1);

        let started = Instant::now();
        manager.shutdown();
        // The 30 s wait slice is cut short by the revoked subscription.
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!manager.is_active());
        assert_eq!(store.subscriber_count(), 0);
        assert!(manager.poll_updates().is_empty());
    }

    #[test]
    fn test_stop_detaches_without_joining() {
        let store = test_store();
        let mut manager = ReconcileManager::with_wait_slice(Duration::from_secs(30));
        manager.start(&store);

        let started = Instant::now();
        manager.stop();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!manager.is_active());
        assert!(manager.recv_update(Duration::from_millis(10)).is_none());
        // The subscription is released at once, even though nobody joined.
        assert_eq!(store.subscriber_count(), 0);
        // A second stop is a no-op.
        manager.stop();
        store.append("after stop");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_restart_replaces_previous_thread() {
        let store = test_store();
        let mut manager = ReconcileManager::with_wait_slice(Duration::from_millis(10));
        manager.start(&store);
        manager.start(&store);

        let deadline = Instant::now() + Duration::from_secs(5);
        while store.subscriber_count() != 1 {
            assert!(Instant::now() < deadline, "old subscription never released");
            std::thread::sleep(Duration::from_millis(5));
        }
        manager.shutdown();
    }
}
