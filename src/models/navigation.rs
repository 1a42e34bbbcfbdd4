use serde::{Deserialize, Serialize};

use super::{CatalogItem, SourceKind};

/// Screen a selected item opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    MovieDetails,
    SeriesDetails,
    /// Live channels skip the details screen and go straight to playback
    LivePlayer,
}

impl From<SourceKind> for Destination {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::OnDemand => Destination::MovieDetails,
            SourceKind::Series => Destination::SeriesDetails,
            SourceKind::Live => Destination::LivePlayer,
        }
    }
}

/// Navigation request produced when the user picks a displayed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub id: i64,
    pub kind: SourceKind,
    pub title: String,
    pub image_ref: Option<String>,
    pub secondary_info: Option<String>,
    pub destination: Destination,
}

/// Rating the details screens show when the catalog has none
const UNKNOWN_RATING: &str = "0.0";

impl From<&CatalogItem> for NavigationRequest {
    fn from(item: &CatalogItem) -> Self {
        let destination = Destination::from(item.kind);
        let secondary_info = match destination {
            Destination::LivePlayer => None,
            Destination::MovieDetails | Destination::SeriesDetails => Some(
                item.secondary_info
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_RATING.to_string()),
            ),
        };

        Self {
            id: item.id,
            kind: item.kind,
            title: item.title.clone(),
            image_ref: item.image_ref.clone(),
            secondary_info,
            destination,
        }
    }
}
