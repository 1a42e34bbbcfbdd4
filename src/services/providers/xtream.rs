/// Xtream-style catalog provider
///
/// Downloads complete listings from a panel's `player_api.php` endpoint. One
/// action per source kind:
/// - OnDemand: `get_vod_streams`
/// - Series: `get_series`
/// - Live: `get_live_streams` with `category_id=0` (all categories)
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogItem, Credentials, SourceKind, XtreamLiveStream, XtreamSeries, XtreamVodStream},
    services::providers::CatalogSource,
};

const PLAYER_API_PATH: &str = "player_api.php";
const ALL_CATEGORIES: &str = "0";

#[derive(Clone)]
pub struct XtreamProvider {
    http_client: HttpClient,
    api_url: String,
}

impl XtreamProvider {
    /// Creates a provider for the panel at `api_url`
    pub fn new(api_url: String, timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn action(kind: SourceKind) -> &'static str {
        match kind {
            SourceKind::OnDemand => "get_vod_streams",
            SourceKind::Series => "get_series",
            SourceKind::Live => "get_live_streams",
        }
    }

    /// Converts a raw listing into catalog items, skipping records that don't decode
    fn parse_listing(kind: SourceKind, payload: Value) -> AppResult<Vec<CatalogItem>> {
        let records = match payload {
            Value::Array(records) => records,
            other => {
                return Err(AppError::SourceFetch {
                    kind,
                    message: format!("expected a JSON array, got {}", json_type(&other)),
                })
            }
        };

        let total = records.len();
        let items: Vec<CatalogItem> = match kind {
            SourceKind::OnDemand => decode_all(records, XtreamVodStream::into_item),
            SourceKind::Series => decode_all(records, XtreamSeries::into_item),
            SourceKind::Live => decode_all(records, XtreamLiveStream::into_item),
        };

        if items.len() < total {
            tracing::debug!(
                source = %kind,
                skipped = total - items.len(),
                "Skipped undecodable catalog records"
            );
        }

        Ok(items)
    }
}

fn decode_all<T, F>(records: Vec<Value>, into_item: F) -> Vec<CatalogItem>
where
    T: DeserializeOwned,
    F: Fn(T) -> Option<CatalogItem>,
{
    records
        .into_iter()
        .filter_map(|record| serde_json::from_value::<T>(record).ok())
        .filter_map(into_item)
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait::async_trait]
impl CatalogSource for XtreamProvider {
    #[instrument(skip_all, fields(source = %kind, action = Self::action(kind)))]
    async fn fetch_source(
        &self,
        kind: SourceKind,
        credentials: &Credentials,
    ) -> AppResult<Vec<CatalogItem>> {
        let url = format!("{}/{}", self.api_url, PLAYER_API_PATH);

        let mut query = vec![
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("action", Self::action(kind)),
        ];
        if kind == SourceKind::Live {
            query.push(("category_id", ALL_CATEGORIES));
        }

        let response = self.http_client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SourceFetch {
                kind,
                message: format!("Catalog API returned status {}: {}", status, body),
            });
        }

        let payload: Value = response.json().await?;
        let items = Self::parse_listing(kind, payload)?;

        tracing::info!(items = items.len(), "Catalog listing downloaded");

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "xtream"
    }
}
