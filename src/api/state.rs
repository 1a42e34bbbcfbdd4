use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{Credentials, SearchResults};
use crate::services::SearchSession;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

/// The hosted search session and what it last delivered
pub struct AppStateInner {
    pub session: SearchSession,
    pub credentials: Credentials,
    latest: Arc<Mutex<Option<SearchResults>>>,
}

impl AppState {
    /// Wraps a session and records every result set it delivers
    pub fn new(session: SearchSession, credentials: Credentials) -> Self {
        let latest = Arc::new(Mutex::new(None));
        let sink = latest.clone();
        session.on_result(move |results| {
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(results);
        });

        Self {
            inner: Arc::new(AppStateInner {
                session,
                credentials,
                latest,
            }),
        }
    }
}

impl AppStateInner {
    /// Most recently delivered result set, if any
    pub fn latest_results(&self) -> Option<SearchResults> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
