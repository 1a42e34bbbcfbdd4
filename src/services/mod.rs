pub mod catalog_fetcher;
pub mod providers;
pub mod query_scheduler;
pub mod search_index;
pub mod session;
pub mod sync_gate;

pub use catalog_fetcher::CatalogFetcher;
pub use query_scheduler::QueryScheduler;
pub use search_index::{IndexHandle, IndexLimits, SearchIndex};
pub use session::{SearchSession, SearchSettings};
pub use sync_gate::SyncGate;
