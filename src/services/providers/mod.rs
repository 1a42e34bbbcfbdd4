/// Catalog source abstraction
///
/// Each remote catalog source (on-demand, series, live) is reached through a
/// `CatalogSource`. Sources report failures honestly; `SourceClient` is the layer
/// that turns a failed source into an empty contribution so one bad source never
/// breaks the merge.
use std::sync::Arc;

use tracing::instrument;

use crate::{
    error::AppResult,
    models::{CatalogItem, Credentials, SourceKind},
};

pub mod xtream;

pub use xtream::XtreamProvider;

/// Trait for remote catalog backends
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    /// Downloads the full, unfiltered listing of one source
    async fn fetch_source(
        &self,
        kind: SourceKind,
        credentials: &Credentials,
    ) -> AppResult<Vec<CatalogItem>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Fetches one source and never fails outward
#[derive(Clone)]
pub struct SourceClient {
    source: Arc<dyn CatalogSource>,
}

impl SourceClient {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self { source }
    }

    /// Returns the source's items, or an empty list when the source failed
    #[instrument(skip_all, fields(source = %kind, provider = self.source.name()))]
    pub async fn fetch(&self, kind: SourceKind, credentials: &Credentials) -> Vec<CatalogItem> {
        match self.source.fetch_source(kind, credentials).await {
            Ok(items) => {
                tracing::debug!(items = items.len(), "Catalog source fetched");
                items
            }
            Err(e) => {
                tracing::warn!(error = %e, "Catalog source failed, contributing no items");
                Vec::new()
            }
        }
    }
}
