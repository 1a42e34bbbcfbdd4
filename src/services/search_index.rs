use std::sync::{Arc, PoisonError, RwLock};

use crate::models::{Catalog, CatalogItem, ResultStatus, SearchResults};

/// Matching limits applied by the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLimits {
    /// Results beyond this count are truncated, keeping catalog order
    pub result_limit: usize,
    /// Trimmed queries shorter than this (in chars) match nothing
    pub min_query_chars: usize,
}

impl Default for IndexLimits {
    fn default() -> Self {
        Self {
            result_limit: 100,
            min_query_chars: 2,
        }
    }
}

/// In-memory substring index over one catalog
///
/// Titles are lowercased once at construction; `str::to_lowercase` follows the
/// Unicode default case mapping, so matching does not depend on locale.
#[derive(Debug)]
pub struct SearchIndex {
    catalog: Arc<Catalog>,
    folded_titles: Vec<String>,
    limits: IndexLimits,
}

impl SearchIndex {
    pub fn new(catalog: Arc<Catalog>, limits: IndexLimits) -> Self {
        let folded_titles = catalog
            .items()
            .iter()
            .map(|item| item.title.to_lowercase())
            .collect();

        Self {
            catalog,
            folded_titles,
            limits,
        }
    }

    /// Index over the empty catalog, used before the first sync completes
    pub fn empty(limits: IndexLimits) -> Self {
        Self::new(Arc::new(Catalog::empty()), limits)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Items whose title contains the query, in catalog order, capped at the result limit
    pub fn filter(&self, text: &str) -> Vec<CatalogItem> {
        match self.normalize(text) {
            Some(needle) => self.matching(&needle),
            None => Vec::new(),
        }
    }

    /// Same matching as `filter`, with the outcome classified for the presentation layer
    pub fn search(&self, text: &str, sequence: u64) -> SearchResults {
        let (items, status) = match self.normalize(text) {
            None => (Vec::new(), ResultStatus::TypeToSearch),
            Some(_) if self.catalog.is_empty() => (Vec::new(), ResultStatus::EmptyCatalog),
            Some(needle) => {
                let items = self.matching(&needle);
                let status = if items.is_empty() {
                    ResultStatus::NoMatches
                } else {
                    ResultStatus::Matches
                };
                (items, status)
            }
        };

        SearchResults {
            query: text.to_string(),
            sequence,
            items,
            status,
        }
    }

    fn matching(&self, needle: &str) -> Vec<CatalogItem> {
        self.folded_titles
            .iter()
            .zip(self.catalog.items())
            .filter(|(folded, _)| folded.contains(needle))
            .map(|(_, item)| item.clone())
            .take(self.limits.result_limit)
            .collect()
    }

    /// Trimmed, lowercased query, or `None` when it is too short to search
    fn normalize(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.limits.min_query_chars {
            return None;
        }
        Some(trimmed.to_lowercase())
    }
}

/// Shared slot holding the index the search path reads
///
/// The whole index is replaced in one swap, so readers see either the previous
/// catalog or the complete new one.
#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<SearchIndex>>,
    limits: IndexLimits,
}

impl IndexHandle {
    pub fn new(limits: IndexLimits) -> Self {
        Self {
            current: RwLock::new(Arc::new(SearchIndex::empty(limits))),
            limits,
        }
    }

    /// Current index; the scan runs on the snapshot without holding the lock
    pub fn snapshot(&self) -> Arc<SearchIndex> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Builds an index over `catalog` and makes it visible to readers
    pub fn publish(&self, catalog: Arc<Catalog>) {
        let index = Arc::new(SearchIndex::new(catalog, self.limits));
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = index;
    }

    /// Drops the current catalog, back to the pre-sync empty index
    pub fn clear(&self) {
        self.publish(Arc::new(Catalog::empty()));
    }
}
