use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::models::SyncState;

type ReadyListener = Arc<dyn Fn() + Send + Sync>;
type FailedListener = Arc<dyn Fn(&str) + Send + Sync>;
type ReplayHook = Arc<dyn Fn(String) + Send + Sync>;

/// Sync state flag with listeners and one deferred query
///
/// Queries are blocked until the catalog is ready. A single query requested
/// before that point (e.g. carried over from a prior screen) is held and handed
/// to the replay hook exactly once on the `Loading -> Ready` transition.
pub struct SyncGate {
    state: watch::Sender<SyncState>,
    deferred: Mutex<Option<String>>,
    ready_listeners: Mutex<Vec<ReadyListener>>,
    failed_listeners: Mutex<Vec<FailedListener>>,
    replay: Mutex<Option<ReplayHook>>,
}

impl Default for SyncGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SyncState::Loading);
        Self {
            state,
            deferred: Mutex::new(None),
            ready_listeners: Mutex::new(Vec::new()),
            failed_listeners: Mutex::new(Vec::new()),
            replay: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Waits until the state leaves `Loading` and returns the state it settled on
    pub async fn await_ready(&self) -> SyncState {
        let mut rx = self.state.subscribe();
        let settled = rx
            .wait_for(|state| *state != SyncState::Loading)
            .await
            .map(|state| *state);
        settled.unwrap_or(SyncState::Failed)
    }

    pub fn on_ready<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        lock(&self.ready_listeners).push(Arc::new(listener));
    }

    pub fn on_failed<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        lock(&self.failed_listeners).push(Arc::new(listener));
    }

    /// Installs the action that runs the deferred query once the gate opens
    pub fn set_replay<F>(&self, hook: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        *lock(&self.replay) = Some(Arc::new(hook));
    }

    /// Holds `text` for replay while loading
    ///
    /// Blank text is ignored and a later request replaces an earlier one. When the
    /// gate is already open the text is handed back so the caller can run it now.
    pub fn defer_query(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        let mut deferred = lock(&self.deferred);
        match self.state() {
            SyncState::Loading => {
                *deferred = Some(text.to_string());
                None
            }
            SyncState::Ready => Some(text.to_string()),
            SyncState::Failed => None,
        }
    }

    /// `Loading -> Ready`; notifies listeners, then replays the deferred query
    ///
    /// Returns false (and does nothing) unless the gate was loading.
    pub fn mark_ready(&self) -> bool {
        let deferred = {
            let mut slot = lock(&self.deferred);
            if !self.transition(SyncState::Ready) {
                return false;
            }
            slot.take()
        };

        tracing::info!("Catalog ready, search enabled");

        let listeners = lock(&self.ready_listeners).clone();
        for listener in listeners {
            listener();
        }

        if let Some(query) = deferred {
            let hook = lock(&self.replay).clone();
            match hook {
                Some(hook) => {
                    tracing::debug!(query = %query, "Replaying deferred query");
                    hook(query);
                }
                None => tracing::warn!(query = %query, "Deferred query dropped, no replay hook"),
            }
        }

        true
    }

    /// `Loading -> Failed`; the deferred query is discarded
    pub fn mark_failed(&self, reason: &str) -> bool {
        {
            let mut slot = lock(&self.deferred);
            if !self.transition(SyncState::Failed) {
                return false;
            }
            slot.take();
        }

        tracing::warn!(reason = %reason, "Catalog sync failed");

        let listeners = lock(&self.failed_listeners).clone();
        for listener in listeners {
            listener(reason);
        }

        true
    }

    /// Puts the gate back to `Loading` for a host-initiated resync
    pub fn reset(&self) {
        let _guard = lock(&self.deferred);
        self.state.send_replace(SyncState::Loading);
    }

    fn transition(&self, to: SyncState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SyncState::Loading {
                *state = to;
                true
            } else {
                false
            }
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_starts_loading() {
        let gate = SyncGate::new();
        assert_eq!(gate.state(), SyncState::Loading);
    }

    #[test]
    fn test_deferred_query_replayed_exactly_once() {
        let gate = SyncGate::new();
        let replayed = Arc::new(Mutex::new(Vec::new()));
        let sink = replayed.clone();
        gate.set_replay(move |query| sink.lock().unwrap().push(query));

        assert_eq!(gate.defer_query("matrix"), None);
        assert!(replayed.lock().unwrap().is_empty());

        assert!(gate.mark_ready());
        assert!(!gate.mark_ready());

        assert_eq!(*replayed.lock().unwrap(), vec!["matrix".to_string()]);
    }

    #[test]
    fn test_latest_deferred_query_wins_and_blank_is_ignored() {
        let gate = SyncGate::new();
        let replayed = Arc::new(Mutex::new(Vec::new()));
        let sink = replayed.clone();
        gate.set_replay(move |query| sink.lock().unwrap().push(query));

        gate.defer_query("mat");
        gate.defer_query("matrix");
        gate.defer_query("   ");
        gate.mark_ready();

        assert_eq!(*replayed.lock().unwrap(), vec!["matrix".to_string()]);
    }

    #[test]
    fn test_defer_after_ready_hands_query_back() {
        let gate = SyncGate::new();
        let replays = Arc::new(AtomicUsize::new(0));
        let counter = replays.clone();
        gate.set_replay(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        gate.mark_ready();
        assert_eq!(gate.defer_query("heat"), Some("heat".to_string()));
        gate.reset();
        gate.mark_ready();
        assert_eq!(replays.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failure_discards_deferred_query() {
        let gate = SyncGate::new();
        let replays = Arc::new(AtomicUsize::new(0));
        let counter = replays.clone();
        gate.set_replay(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let reasons = Arc::new(Mutex::new(Vec::new()));
        let sink = reasons.clone();
        gate.on_failed(move |reason| sink.lock().unwrap().push(reason.to_string()));

        gate.defer_query("matrix");
        assert!(gate.mark_failed("credentials missing"));
        assert!(!gate.mark_ready());

        assert_eq!(gate.state(), SyncState::Failed);
        assert_eq!(replays.load(Ordering::SeqCst), 0);
        assert_eq!(*reasons.lock().unwrap(), vec!["credentials missing".to_string()]);
        assert_eq!(gate.defer_query("heat"), None);
    }

    #[test]
    fn test_ready_listeners_notified_once() {
        let gate = SyncGate::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        gate.on_ready(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        gate.mark_ready();
        gate.mark_ready();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reset_allows_new_transition() {
        let gate = SyncGate::new();
        gate.mark_failed("boom");
        gate.reset();
        assert_eq!(gate.state(), SyncState::Loading);
        assert!(gate.mark_ready());
    }

    #[tokio::test]
    async fn test_await_ready_resolves_on_transition() {
        let gate = Arc::new(SyncGate::new());
        let opener = gate.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            opener.mark_ready();
        });

        let state = tokio::time::timeout(Duration::from_secs(1), gate.await_ready())
            .await
            .unwrap();
        assert_eq!(state, SyncState::Ready);
    }

    #[test]
    fn test_await_ready_pending_while_loading() {
        let gate = SyncGate::new();
        let mut waiter = tokio_test::task::spawn(gate.await_ready());

        tokio_test::assert_pending!(waiter.poll());
        gate.mark_ready();
        assert!(waiter.is_woken());
        tokio_test::assert_ready_eq!(waiter.poll(), SyncState::Ready);
    }

    #[tokio::test]
    async fn test_await_ready_reports_failure() {
        let gate = SyncGate::new();
        gate.mark_failed("boom");
        assert_eq!(gate.await_ready().await, SyncState::Failed);
    }
}
