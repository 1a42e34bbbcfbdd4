//! Wire types for the catalog service's `player_api.php` listings.
//!
//! Upstream panels are loose about types: ids and ratings show up as numbers
//! or strings, names can be null. Fields are therefore decoded leniently and a
//! record only gets dropped when it has no usable id.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{CatalogItem, SourceKind};

/// Entry of `action=get_vod_streams`
#[derive(Debug, Clone, Deserialize)]
pub struct XtreamVodStream {
    #[serde(default, deserialize_with = "loose_id")]
    pub stream_id: Option<i64>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub stream_icon: Option<String>,
}

/// Entry of `action=get_series`
#[derive(Debug, Clone, Deserialize)]
pub struct XtreamSeries {
    #[serde(default, deserialize_with = "loose_id")]
    pub series_id: Option<i64>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub cover: Option<String>,
}

/// Entry of `action=get_live_streams`
#[derive(Debug, Clone, Deserialize)]
pub struct XtreamLiveStream {
    #[serde(default, deserialize_with = "loose_id")]
    pub stream_id: Option<i64>,
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub stream_icon: Option<String>,
}

impl XtreamVodStream {
    pub fn into_item(self) -> Option<CatalogItem> {
        Some(CatalogItem {
            id: self.stream_id?,
            title: title_or_default(self.name, SourceKind::OnDemand),
            kind: SourceKind::OnDemand,
            secondary_info: self.rating,
            image_ref: self.stream_icon,
        })
    }
}

impl XtreamSeries {
    pub fn into_item(self) -> Option<CatalogItem> {
        Some(CatalogItem {
            id: self.series_id?,
            title: title_or_default(self.name, SourceKind::Series),
            kind: SourceKind::Series,
            secondary_info: self.rating,
            image_ref: self.cover,
        })
    }
}

impl XtreamLiveStream {
    pub fn into_item(self) -> Option<CatalogItem> {
        Some(CatalogItem {
            id: self.stream_id?,
            title: title_or_default(self.name, SourceKind::Live),
            kind: SourceKind::Live,
            secondary_info: None,
            image_ref: self.stream_icon,
        })
    }
}

fn title_or_default(name: Option<String>, kind: SourceKind) -> String {
    name.unwrap_or_else(|| kind.default_title().to_string())
}

fn loose_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// Blank strings count as absent.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
