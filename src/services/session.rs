use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Catalog, Credentials, NavigationRequest, SearchResults, SourceKind, SyncState},
    services::{
        catalog_fetcher::CatalogFetcher,
        providers::{CatalogSource, SourceClient},
        query_scheduler::QueryScheduler,
        search_index::{IndexHandle, IndexLimits},
        sync_gate::SyncGate,
    },
};

/// Tunables for one search surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub quiescence: Duration,
    pub result_limit: usize,
    pub min_query_chars: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let limits = IndexLimits::default();
        Self {
            quiescence: Duration::from_millis(100),
            result_limit: limits.result_limit,
            min_query_chars: limits.min_query_chars,
        }
    }
}

impl SearchSettings {
    fn limits(&self) -> IndexLimits {
        IndexLimits {
            result_limit: self.result_limit,
            min_query_chars: self.min_query_chars,
        }
    }
}

/// One activation of the search surface
///
/// Owns the catalog index, the sync gate and the query scheduler, and ties their
/// lifetime to a single cancellation token. Closing (or dropping) the session
/// abandons in-flight downloads and the pending debounce timer.
pub struct SearchSession {
    id: Uuid,
    index: Arc<IndexHandle>,
    gate: Arc<SyncGate>,
    scheduler: Arc<QueryScheduler>,
    fetcher: Arc<CatalogFetcher>,
    shutdown: CancellationToken,
    sync_task: Mutex<Option<JoinHandle<()>>>,
    /// Serializes resyncs so only one of them replaces the running sync
    resync_lock: tokio::sync::Mutex<()>,
}

impl SearchSession {
    pub fn new(source: Arc<dyn CatalogSource>, settings: SearchSettings) -> Self {
        let id = Uuid::new_v4();
        let shutdown = CancellationToken::new();
        let index = Arc::new(IndexHandle::new(settings.limits()));
        let gate = Arc::new(SyncGate::new());
        let scheduler = Arc::new(QueryScheduler::new(
            index.clone(),
            gate.clone(),
            settings.quiescence,
            shutdown.child_token(),
        ));
        let fetcher = Arc::new(CatalogFetcher::new(
            SourceClient::new(source),
            index.clone(),
            gate.clone(),
        ));

        let replay = Arc::downgrade(&scheduler);
        gate.set_replay(move |query| {
            if let Some(scheduler) = replay.upgrade() {
                scheduler.search_now(&query);
            }
        });

        tracing::debug!(session_id = %id, "Search session created");

        Self {
            id,
            index,
            gate,
            scheduler,
            fetcher,
            shutdown,
            sync_task: Mutex::new(None),
            resync_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SyncState {
        self.gate.state()
    }

    pub fn gate(&self) -> &Arc<SyncGate> {
        &self.gate
    }

    /// The catalog currently visible to searches (empty before the first sync)
    pub fn catalog(&self) -> Arc<Catalog> {
        self.index.snapshot().catalog().clone()
    }

    /// Starts the background sync; `initial_query` is replayed once the catalog is ready
    pub fn open(&self, credentials: Credentials, initial_query: Option<&str>) {
        if let Some(query) = initial_query {
            if let Some(now) = self.gate.defer_query(query) {
                self.scheduler.search_now(&now);
            }
        }
        self.spawn_sync(credentials);
    }

    /// Runs a sync on the caller's task and waits for it
    pub async fn sync(&self, credentials: &Credentials) -> AppResult<Arc<Catalog>> {
        let cancel = self.shutdown.child_token();
        self.fetcher.sync(credentials, &cancel).await
    }

    /// Host-level retry: drops the current catalog and downloads everything again
    ///
    /// The previous sync is aborted and awaited before the gate is reset, so it
    /// cannot publish or flip the gate once the new sync has started.
    pub async fn resync(&self, credentials: Credentials) {
        let _serial = self.resync_lock.lock().await;
        if self.shutdown.is_cancelled() {
            return;
        }

        tracing::info!(session_id = %self.id, "Catalog resync requested");

        let previous = self.lock_sync_task().take();
        if let Some(previous) = previous {
            previous.abort();
            if let Err(e) = previous.await {
                if !e.is_cancelled() {
                    tracing::warn!(session_id = %self.id, error = %e, "Previous catalog sync ended abnormally");
                }
            }
        }

        if self.shutdown.is_cancelled() {
            return;
        }

        self.scheduler.cancel_pending();
        self.gate.reset();
        self.index.clear();
        self.spawn_sync(credentials);
    }

    pub async fn await_ready(&self) -> SyncState {
        self.gate.await_ready().await
    }

    pub fn on_ready<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.gate.on_ready(listener);
    }

    pub fn on_failed<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.gate.on_failed(listener);
    }

    pub fn on_result<F>(&self, callback: F)
    where
        F: Fn(SearchResults) + Send + Sync + 'static,
    {
        self.scheduler.on_result(callback);
    }

    /// Debounced keystroke submission
    pub fn submit(&self, text: &str) -> Option<u64> {
        self.scheduler.submit(text)
    }

    /// True while a debounced query is waiting for its quiescence window
    pub fn has_pending_query(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Immediate search for explicit search actions
    pub fn search_now(&self, text: &str) -> Option<u64> {
        self.scheduler.search_now(text)
    }

    /// Synchronous lookup against the current index, not routed through the scheduler
    pub fn query(&self, text: &str) -> AppResult<SearchResults> {
        match self.state() {
            SyncState::Ready => Ok(self.index.snapshot().search(text, 0)),
            state => Err(AppError::NotReady(state)),
        }
    }

    /// Resolves a displayed item into the navigation request for its screen
    pub fn select(&self, id: i64, kind: SourceKind) -> AppResult<NavigationRequest> {
        let index = self.index.snapshot();
        let item = index
            .catalog()
            .find(id, kind)
            .ok_or_else(|| AppError::NotFound(format!("{} item {}", kind, id)))?;

        let request = NavigationRequest::from(item);
        tracing::info!(
            session_id = %self.id,
            item_id = id,
            kind = %kind,
            destination = ?request.destination,
            "Item selected"
        );
        Ok(request)
    }

    /// Tears the session down; idempotent
    pub fn close(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }

        self.shutdown.cancel();
        self.scheduler.cancel_pending();
        if let Some(task) = self.lock_sync_task().take() {
            task.abort();
        }

        tracing::debug!(session_id = %self.id, "Search session closed");
    }

    fn spawn_sync(&self, credentials: Credentials) {
        let fetcher = self.fetcher.clone();
        let cancel = self.shutdown.child_token();
        let session_id = self.id;

        let task = tokio::spawn(async move {
            if let Err(e) = fetcher.sync(&credentials, &cancel).await {
                tracing::warn!(session_id = %session_id, error = %e, "Catalog sync did not complete");
            }
        });

        if let Some(previous) = self.lock_sync_task().replace(task) {
            previous.abort();
        }
    }

    fn lock_sync_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.sync_task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogItem, Destination, ResultStatus};
    use crate::services::providers::MockCatalogSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn item(id: i64, title: &str, kind: SourceKind) -> CatalogItem {
        CatalogItem {
            id,
            title: title.to_string(),
            kind,
            secondary_info: match kind {
                SourceKind::Live => None,
                _ => Some("8.0".to_string()),
            },
            image_ref: None,
        }
    }

    fn matrix_source() -> MockCatalogSource {
        let mut source = MockCatalogSource::new();
        source.expect_fetch_source().returning(|kind, _| {
            Ok(match kind {
                SourceKind::OnDemand => vec![item(1, "Matrix", kind)],
                SourceKind::Series => vec![item(2, "Matrix Reloaded", kind)],
                SourceKind::Live => vec![item(1, "News 24", kind)],
            })
        });
        source.expect_name().return_const("mock");
        source
    }

    fn collect(session: &SearchSession) -> Arc<Mutex<Vec<SearchResults>>> {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        session.on_result(move |results| sink.lock().unwrap().push(results));
        delivered
    }

    #[tokio::test]
    async fn test_initial_query_replayed_once_after_ready() {
        let session = SearchSession::new(Arc::new(matrix_source()), SearchSettings::default());
        let delivered = collect(&session);

        session.open(Credentials::new("alice", "secret"), Some("matrix"));
        assert_eq!(session.await_ready().await, SyncState::Ready);

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].query, "matrix");
        let titles: Vec<&str> = delivered[0].items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Matrix", "Matrix Reloaded"]);
    }

    #[tokio::test]
    async fn test_typing_during_loading_is_not_replayed() {
        let session = SearchSession::new(Arc::new(matrix_source()), SearchSettings::default());
        let delivered = collect(&session);

        assert_eq!(session.submit("matrix"), None);
        session.sync(&Credentials::new("alice", "secret")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_surface_failed() {
        let mut source = MockCatalogSource::new();
        source.expect_fetch_source().never();
        let session = SearchSession::new(Arc::new(source), SearchSettings::default());

        let reasons = Arc::new(Mutex::new(Vec::new()));
        let sink = reasons.clone();
        session.on_failed(move |reason| sink.lock().unwrap().push(reason.to_string()));

        session.open(Credentials::new("", ""), Some("matrix"));
        assert_eq!(session.await_ready().await, SyncState::Failed);
        assert_eq!(reasons.lock().unwrap().len(), 1);
        assert!(matches!(session.query("matrix"), Err(AppError::NotReady(SyncState::Failed))));
    }

    #[tokio::test]
    async fn test_select_resolves_by_identity() {
        let session = SearchSession::new(Arc::new(matrix_source()), SearchSettings::default());
        session.sync(&Credentials::new("alice", "secret")).await.unwrap();

        let live = session.select(1, SourceKind::Live).unwrap();
        assert_eq!(live.title, "News 24");
        assert_eq!(live.destination, Destination::LivePlayer);

        let movie = session.select(1, SourceKind::OnDemand).unwrap();
        assert_eq!(movie.destination, Destination::MovieDetails);
        assert_eq!(movie.secondary_info.as_deref(), Some("8.0"));

        assert!(matches!(
            session.select(99, SourceKind::Series),
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_query_reports_status() {
        let session = SearchSession::new(Arc::new(matrix_source()), SearchSettings::default());
        assert!(matches!(
            session.query("matrix"),
            Err(AppError::NotReady(SyncState::Loading))
        ));

        session.sync(&Credentials::new("alice", "secret")).await.unwrap();
        assert_eq!(session.query("m").unwrap().status, ResultStatus::TypeToSearch);
        assert_eq!(session.query("news").unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_resync_replaces_catalog() {
        let session = SearchSession::new(Arc::new(matrix_source()), SearchSettings::default());
        session.sync(&Credentials::new("alice", "secret")).await.unwrap();
        let first = session.catalog();

        session.resync(Credentials::new("alice", "secret")).await;
        assert_eq!(session.await_ready().await, SyncState::Ready);

        let second = session.catalog();
        assert_eq!(second.len(), 3);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    /// First three calls (the first sync) are slow and return "Old", later ones return "New"
    struct GenerationSource {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CatalogSource for GenerationSource {
        async fn fetch_source(
            &self,
            kind: SourceKind,
            _credentials: &Credentials,
        ) -> AppResult<Vec<CatalogItem>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < 3 {
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Ok(vec![item(call as i64, "Old", kind)]);
            }
            Ok(vec![item(call as i64, "New", kind)])
        }

        fn name(&self) -> &'static str {
            "generations"
        }
    }

    #[tokio::test]
    async fn test_resync_supersedes_in_flight_sync() {
        let source = Arc::new(GenerationSource {
            calls: AtomicUsize::new(0),
        });
        let session = SearchSession::new(source.clone(), SearchSettings::default());
        let readies = Arc::new(AtomicUsize::new(0));
        let counter = readies.clone();
        session.on_ready(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.open(Credentials::new("alice", "secret"), None);
        // let the first sync reach its sources
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);

        session.resync(Credentials::new("alice", "secret")).await;
        assert_eq!(session.await_ready().await, SyncState::Ready);

        // outlive the superseded downloads
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(session.state(), SyncState::Ready);
        assert_eq!(readies.load(Ordering::SeqCst), 1);
        let catalog = session.catalog();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.items().iter().all(|i| i.title == "New"));
    }

    #[tokio::test]
    async fn test_close_stops_pending_work() {
        let session = SearchSession::new(Arc::new(matrix_source()), SearchSettings::default());
        let delivered = collect(&session);
        session.sync(&Credentials::new("alice", "secret")).await.unwrap();

        session.submit("matrix");
        session.close();
        session.close();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(delivered.lock().unwrap().is_empty());
        assert_eq!(session.submit("heat"), None);
    }
}
