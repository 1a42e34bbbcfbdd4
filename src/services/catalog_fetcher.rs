use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, AppResult},
    models::{Catalog, CatalogItem, Credentials, SourceKind},
    services::{providers::SourceClient, search_index::IndexHandle, sync_gate::SyncGate},
};

/// Downloads every catalog source in parallel and publishes the merged catalog
pub struct CatalogFetcher {
    client: SourceClient,
    index: Arc<IndexHandle>,
    gate: Arc<SyncGate>,
}

impl CatalogFetcher {
    pub fn new(client: SourceClient, index: Arc<IndexHandle>, gate: Arc<SyncGate>) -> Self {
        Self {
            client,
            index,
            gate,
        }
    }

    /// Runs one full synchronization
    ///
    /// On success the catalog is published to the index before the gate opens, so
    /// a reader that sees `Ready` always sees the complete catalog. Orchestration
    /// errors flip the gate to `Failed`; cancellation leaves it untouched.
    pub async fn sync(
        &self,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> AppResult<Arc<Catalog>> {
        match self.collect(credentials, cancel).await {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                tracing::info!(
                    items = catalog.len(),
                    on_demand = catalog.count_for(SourceKind::OnDemand),
                    series = catalog.count_for(SourceKind::Series),
                    live = catalog.count_for(SourceKind::Live),
                    "Catalog synchronized"
                );
                self.index.publish(catalog.clone());
                self.gate.mark_ready();
                Ok(catalog)
            }
            Err(e) if e.is_orchestration() => {
                self.gate.mark_failed(&e.to_string());
                Err(e)
            }
            Err(e) => {
                tracing::info!(error = %e, "Catalog sync stopped before publishing");
                Err(e)
            }
        }
    }

    async fn collect(
        &self,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> AppResult<Catalog> {
        if !credentials.is_complete() {
            return Err(AppError::MissingCredentials);
        }

        // Spawned up front so the three downloads overlap.
        let tasks: Vec<(SourceKind, JoinHandle<Vec<CatalogItem>>)> = SourceKind::ALL
            .iter()
            .map(|&kind| {
                let client = self.client.clone();
                let credentials = credentials.clone();
                let task = tokio::spawn(async move { client.fetch(kind, &credentials).await });
                (kind, task)
            })
            .collect();

        let abort_handles: Vec<_> = tasks.iter().map(|(_, task)| task.abort_handle()).collect();

        let joined = async move {
            let mut batches = Vec::with_capacity(tasks.len());
            for (kind, task) in tasks {
                match task.await {
                    Ok(items) => batches.push(items),
                    Err(e) => {
                        tracing::error!(source = %kind, error = %e, "Catalog source task failed");
                        return Err(AppError::Orchestration(format!(
                            "{} source task failed: {}",
                            kind, e
                        )));
                    }
                }
            }
            Ok(batches)
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            batches = joined => batches,
        };

        let mut batches = match result {
            Ok(batches) => batches.into_iter(),
            Err(e) => {
                for handle in &abort_handles {
                    handle.abort();
                }
                return Err(e);
            }
        };

        let on_demand = batches.next().unwrap_or_default();
        let series = batches.next().unwrap_or_default();
        let live = batches.next().unwrap_or_default();

        Ok(Catalog::merge(on_demand, series, live))
    }
}
