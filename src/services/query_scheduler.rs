//! Debounced, cancel-and-replace query execution.
//!
//! Every keystroke calls [`QueryScheduler::submit`]. The scheduler keeps a
//! single pending slot: a new submission aborts whatever is pending and arms a
//! fresh quiescence timer. When the timer elapses undisturbed the query is run
//! against the current index and delivered to the result callback.
//!
//! Delivery is decided under the pending-slot lock: a request only reaches the
//! callback if it is still the occupant of the slot. A cancel that takes the
//! lock first wins, so a superseded request can never be delivered, even when
//! its timer already fired.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::{QueryRequest, SearchResults, SyncState};
use crate::services::search_index::IndexHandle;
use crate::services::sync_gate::SyncGate;

/// Callback receiving delivered result sets
///
/// Invoked while the pending slot is locked; it must not call back into the
/// scheduler on the same thread.
pub type ResultCallback = Arc<dyn Fn(SearchResults) + Send + Sync>;

struct PendingQuery {
    request: QueryRequest,
    /// Timer task; `None` for immediate searches
    timer: Option<JoinHandle<()>>,
}

pub struct QueryScheduler {
    index: Arc<IndexHandle>,
    gate: Arc<SyncGate>,
    quiescence: Duration,
    sequence: AtomicU64,
    pending: Mutex<Option<PendingQuery>>,
    callback: RwLock<Option<ResultCallback>>,
    shutdown: CancellationToken,
}

impl QueryScheduler {
    pub fn new(
        index: Arc<IndexHandle>,
        gate: Arc<SyncGate>,
        quiescence: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            index,
            gate,
            quiescence,
            sequence: AtomicU64::new(0),
            pending: Mutex::new(None),
            callback: RwLock::new(None),
            shutdown,
        }
    }

    /// Registers the result sink, replacing any earlier one
    pub fn on_result<F>(&self, callback: F)
    where
        F: Fn(SearchResults) + Send + Sync + 'static,
    {
        *self.callback.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn has_pending(&self) -> bool {
        self.lock_pending().is_some()
    }

    /// Debounced submission of the current query text
    ///
    /// Returns the assigned sequence number, or `None` when the submission was
    /// dropped because the catalog is not ready or the scheduler is shut down.
    pub fn submit(self: &Arc<Self>, text: &str) -> Option<u64> {
        if !self.accepting(text) {
            return None;
        }

        let mut pending = self.lock_pending();
        let request = self.next_request(text);
        let sequence = request.sequence;

        if let Some(previous) = pending.take() {
            abort(previous);
        }

        let scheduler = Arc::clone(self);
        let fired = request.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = scheduler.shutdown.cancelled() => {}
                _ = tokio::time::sleep(scheduler.quiescence) => scheduler.fire(fired),
            }
        });

        *pending = Some(PendingQuery {
            request,
            timer: Some(timer),
        });

        tracing::trace!(sequence, "Query armed");
        Some(sequence)
    }

    /// Runs a query right away, bypassing the quiescence window
    ///
    /// Used for explicit search actions and for the replayed initial query.
    /// Pending debounced work is cancelled first.
    pub fn search_now(&self, text: &str) -> Option<u64> {
        if !self.accepting(text) {
            return None;
        }

        let request = {
            let mut pending = self.lock_pending();
            if let Some(previous) = pending.take() {
                abort(previous);
            }
            let request = self.next_request(text);
            *pending = Some(PendingQuery {
                request: request.clone(),
                timer: None,
            });
            request
        };

        let sequence = request.sequence;
        self.fire(request);
        Some(sequence)
    }

    /// Cancels pending work; safe to call any number of times
    pub fn cancel_pending(&self) {
        if let Some(previous) = self.lock_pending().take() {
            tracing::trace!(sequence = previous.request.sequence, "Pending query cancelled");
            abort(previous);
        }
    }

    fn accepting(&self, text: &str) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }

        match self.gate.state() {
            SyncState::Ready => true,
            state => {
                tracing::debug!(state = %state, query = %text, "Query dropped, catalog not ready");
                false
            }
        }
    }

    fn next_request(&self, text: &str) -> QueryRequest {
        QueryRequest {
            text: text.to_string(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    fn fire(&self, request: QueryRequest) {
        if !self.is_current(request.sequence) {
            return;
        }

        let index = self.index.snapshot();
        let results = index.search(&request.text, request.sequence);
        self.deliver_if_current(results);
    }

    fn is_current(&self, sequence: u64) -> bool {
        matches!(self.lock_pending().as_ref(), Some(p) if p.request.sequence == sequence)
    }

    fn deliver_if_current(&self, results: SearchResults) {
        let mut pending = self.lock_pending();

        let current = matches!(pending.as_ref(), Some(p) if p.request.sequence == results.sequence);
        if !current || self.shutdown.is_cancelled() {
            tracing::debug!(sequence = results.sequence, "Stale query result discarded");
            return;
        }

        // Back to idle. Dropping our own handle detaches the running task.
        pending.take();

        let callback = self
            .callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        tracing::debug!(
            sequence = results.sequence,
            query = %results.query,
            results = results.items.len(),
            status = ?results.status,
            "Query results delivered"
        );

        if let Some(callback) = callback {
            callback(results);
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingQuery>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn abort(previous: PendingQuery) {
    if let Some(timer) = previous.timer {
        timer.abort();
    }
}
