use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod navigation;
pub mod xtream;

pub use navigation::{Destination, NavigationRequest};
pub use xtream::{XtreamLiveStream, XtreamSeries, XtreamVodStream};

/// Origin of a catalog item
///
/// Declaration order is the merge order of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// On-demand movies
    OnDemand,
    /// Episodic series
    Series,
    /// Live channels
    Live,
}

impl SourceKind {
    /// All sources in catalog order
    pub const ALL: [SourceKind; 3] = [SourceKind::OnDemand, SourceKind::Series, SourceKind::Live];

    /// Title used when the upstream record has no name
    pub fn default_title(self) -> &'static str {
        match self {
            SourceKind::OnDemand | SourceKind::Series => "Untitled",
            SourceKind::Live => "No name",
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::OnDemand => write!(f, "on_demand"),
            SourceKind::Series => write!(f, "series"),
            SourceKind::Live => write!(f, "live"),
        }
    }
}

/// A browsable item in the unified catalog
///
/// Identity is `(id, kind)`: ids are only unique within one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub title: String,
    pub kind: SourceKind,
    /// Rating for on-demand and series items, never set for live channels
    pub secondary_info: Option<String>,
    pub image_ref: Option<String>,
}

impl CatalogItem {
    pub fn identity(&self) -> (i64, SourceKind) {
        (self.id, self.kind)
    }
}

/// The merged, immutable collection built once per activation of the search surface
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    on_demand_count: usize,
    series_count: usize,
    live_count: usize,
    pub synced_at: DateTime<Utc>,
}

impl Catalog {
    /// Concatenates per-source batches in `SourceKind::ALL` order
    pub fn merge(on_demand: Vec<CatalogItem>, series: Vec<CatalogItem>, live: Vec<CatalogItem>) -> Self {
        let on_demand_count = on_demand.len();
        let series_count = series.len();
        let live_count = live.len();

        let mut items = on_demand;
        items.reserve(series_count + live_count);
        items.extend(series);
        items.extend(live);

        Self {
            items,
            on_demand_count,
            series_count,
            live_count,
            synced_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::merge(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count_for(&self, kind: SourceKind) -> usize {
        match kind {
            SourceKind::OnDemand => self.on_demand_count,
            SourceKind::Series => self.series_count,
            SourceKind::Live => self.live_count,
        }
    }

    /// Looks an item up by its `(id, kind)` identity
    pub fn find(&self, id: i64, kind: SourceKind) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.identity() == (id, kind))
    }
}

/// Account used against every catalog source
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A query submission tagged with its position in the submission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub text: String,
    pub sequence: u64,
}

/// Lifecycle of the catalog behind one search surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Loading,
    Ready,
    Failed,
}

impl Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Loading => write!(f, "loading"),
            SyncState::Ready => write!(f, "ready"),
            SyncState::Failed => write!(f, "failed"),
        }
    }
}

/// What the presentation layer should show alongside a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// At least one item matched
    Matches,
    /// The query was long enough but nothing matched
    NoMatches,
    /// The query is too short; show the "type to search" placeholder
    TypeToSearch,
    /// The catalog synced successfully but holds no items
    EmptyCatalog,
}

/// A result set delivered to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub sequence: u64,
    pub items: Vec<CatalogItem>,
    pub status: ResultStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, title: &str, kind: SourceKind) -> CatalogItem {
        CatalogItem {
            id,
            title: title.to_string(),
            kind,
            secondary_info: None,
            image_ref: None,
        }
    }

    #[test]
    fn test_merge_keeps_source_order() {
        let catalog = Catalog::merge(
            vec![item(1, "Matrix", SourceKind::OnDemand)],
            vec![item(2, "Matrix Reloaded", SourceKind::Series)],
            vec![item(3, "News 24", SourceKind::Live), item(4, "Sports", SourceKind::Live)],
        );

        let titles: Vec<&str> = catalog.items().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Matrix", "Matrix Reloaded", "News 24", "Sports"]);
        assert_eq!(catalog.count_for(SourceKind::OnDemand), 1);
        assert_eq!(catalog.count_for(SourceKind::Series), 1);
        assert_eq!(catalog.count_for(SourceKind::Live), 2);
    }

    #[test]
    fn test_identity_includes_kind() {
        let catalog = Catalog::merge(
            vec![item(7, "Movie Seven", SourceKind::OnDemand)],
            vec![],
            vec![item(7, "Channel Seven", SourceKind::Live)],
        );

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find(7, SourceKind::Live).unwrap().title, "Channel Seven");
        assert_eq!(catalog.find(7, SourceKind::OnDemand).unwrap().title, "Movie Seven");
        assert!(catalog.find(7, SourceKind::Series).is_none());
    }

    #[test]
    fn test_default_titles() {
        assert_eq!(SourceKind::OnDemand.default_title(), "Untitled");
        assert_eq!(SourceKind::Series.default_title(), "Untitled");
        assert_eq!(SourceKind::Live.default_title(), "No name");
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("alice", "hunter2");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_credentials_completeness() {
        assert!(Credentials::new("alice", "pw").is_complete());
        assert!(!Credentials::new("", "pw").is_complete());
        assert!(!Credentials::new("alice", "  ").is_complete());
    }

    #[test]
    fn test_source_kind_serde() {
        assert_eq!(serde_json::to_string(&SourceKind::OnDemand).unwrap(), "\"on_demand\"");
        let kind: SourceKind = serde_json::from_str("\"live\"").unwrap();
        assert_eq!(kind, SourceKind::Live);
    }

    #[test]
    fn test_sync_state_serde() {
        assert_eq!(serde_json::to_string(&SyncState::Ready).unwrap(), "\"ready\"");
        assert_eq!(SyncState::Failed.to_string(), "failed");
    }
}
