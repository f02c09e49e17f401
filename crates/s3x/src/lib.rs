//! # s3x 🔎🪣
//!
//! Content search over object-storage buckets: "which of these eleven million
//! objects mention `ERROR500`?", answered without an index and without ever
//! holding a whole object in memory.
//!
//! 🧠 Knowledge graph:
//! - [`search`]: bring your own [`backends::ObjectStore`] (S3, a directory, RAM)
//! - [`run`]: build the store from an [`app_config::AppConfig`] and search
//! - validation happens before a single byte of storage traffic
//! - cancellation is a flag on [`SearchOutcome`], never an error
//!
//! ```text
//! head_bucket → list page → filter → fan out to MatchWorkers → page barrier → enough? → stop
//! ```
//!
//! 🦆 (the duck has been searching for meaning in these buckets since 2006)

use std::sync::Arc;

pub mod app_config;
pub mod backends;
pub mod common;
pub mod error;
pub mod matcher;

mod collectors;
mod decoders;
mod filters;
mod listing;
mod progress;
mod session;
mod supervisors;

pub use app_config::{AppConfig, RuntimeConfig, StoreConfig, load_config};
pub use backends::{ObjectStore, StoreBackend};
pub use common::{ObjectDescriptor, SearchOutcome, SearchRequest, SearchStats};
pub use error::SearchError;
pub use tokio_util::sync::CancellationToken;

use session::SearchSession;
use supervisors::Supervisor;

/// 🚀 Search one bucket with the store you hand in.
///
/// 💀 Fails with [`SearchError::Validation`] before touching storage, with
/// `Access` if the bucket won't answer, `Listing` if pagination breaks, and
/// `Worker` if a match task panics. Individual objects that can't be read are
/// logged, counted in `stats.failed_fetches`, and otherwise ignored.
pub async fn search<S>(
    store: Arc<S>,
    request: SearchRequest,
    runtime: &RuntimeConfig,
    cancel: CancellationToken,
) -> Result<SearchOutcome, SearchError>
where
    S: ObjectStore + ?Sized + 'static,
{
    request.validate()?;
    let session = SearchSession::new(request, cancel);
    Supervisor::new(store, runtime.clone()).run(session).await
}

/// 🏗️ Build the store named in `config`, then [`search`] it.
pub async fn run(
    config: &AppConfig,
    request: SearchRequest,
    cancel: CancellationToken,
) -> Result<SearchOutcome, SearchError> {
    request.validate()?;
    let store = StoreBackend::from_config(&config.store, &config.runtime)
        .await
        .map_err(|e| SearchError::Store(e.into()))?;
    search(Arc::new(store), request, &config.runtime, cancel).await
}
