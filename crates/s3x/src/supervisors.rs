//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where objects number in the millions..."
//! 🎬 "One supervisor dared to grep them all."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Supervisor: part middle manager, part helicopter parent.
//!
//! For one search it:
//! 1. knocks on the bucket (`head_bucket`), and gives up if nobody answers
//! 2. lists one page at a time, filtered
//! 3. fans each page out to at most `worker_parallelism` MatchWorkers over a
//!    bounded queue
//! 4. waits for the whole page (the page barrier), then decides whether to go on
//!
//! It stops when enough matches are in, when the bucket runs out of pages, or
//! when the cancel token fires. A page always finishes, so a search can come
//! back with more than `result_count` matches.
//!
//! ⚠️ Workers are the supervisor's private little minions. Do not pub them.

mod workers;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::app_config::RuntimeConfig;
use crate::backends::ObjectStore;
use crate::common::{BucketLocation, ObjectDescriptor, SearchOutcome, SearchStats};
use crate::error::SearchError;
use crate::filters::ObjectFilter;
use crate::listing::ObjectLister;
use crate::matcher::StreamMatcher;
use crate::progress::ProgressMetrics;
use crate::session::SearchSession;
use workers::{FetchPolicy, MatchWorker, Worker, WorkerTally};

/// 📦 Owns the store handle and the knobs. One per search is cheap, it's two fields.
pub(crate) struct Supervisor<S: ObjectStore + ?Sized> {
    store: Arc<S>,
    runtime: RuntimeConfig,
}

impl<S: ObjectStore + ?Sized + 'static> Supervisor<S> {
    pub(crate) fn new(store: Arc<S>, runtime: RuntimeConfig) -> Self {
        Self { store, runtime }
    }

    fn policy(&self) -> FetchPolicy {
        FetchPolicy {
            retries: self.runtime.fetch_retries,
            backoff: Duration::from_millis(self.runtime.retry_backoff_ms),
            decompress_gzip: self.runtime.decompress_gzip,
        }
    }

    /// 🚀 Run one search to completion, exhaustion, or cancellation.
    pub(crate) async fn run(&self, session: SearchSession) -> Result<SearchOutcome, SearchError> {
        let location = session.request.location();
        let template = StreamMatcher::new(session.request.pattern.as_bytes())?;
        let filter = ObjectFilter::new(self.runtime.max_object_size_bytes, &session.request);
        let mut stats = SearchStats::default();
        let mut progress = ProgressMetrics::new(location.to_string(), self.runtime.show_progress);

        info!(
            "🔎 searching {} for a {}-byte pattern, want {} result(s)",
            location,
            template.pattern_len(),
            session.request.result_count
        );

        let head = tokio::select! {
            biased;
            _ = session.cancel.cancelled() => {
                info!("🛑 cancelled before {} even answered", location);
                return Ok(session.into_outcome(true, stats).await);
            }
            head = self.store.head_bucket(&location) => head,
        };
        head.map_err(|e| SearchError::access(&location.bucket, &location.region, e))?;

        let mut lister = ObjectLister::new(self.store.as_ref(), &location, filter, self.runtime.page_size);
        let mut cancelled = false;
        loop {
            let next = tokio::select! {
                biased;
                _ = session.cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = lister.next_page() => next,
            };
            let Some(page) = next.map_err(|e| SearchError::listing(&location.bucket, e))? else {
                break;
            };

            stats.pages += 1;
            stats.listed += page.listed;
            stats.candidates += page.candidates.len();
            let has_more = page.has_more;

            let tally = self
                .fan_out(&session, &location, &template, page.candidates)
                .await?;
            stats.fetched += tally.fetched;
            stats.failed_fetches += tally.failed;
            progress.record_page(
                page.listed,
                tally.fetched,
                tally.bytes_scanned,
                session.aggregator.count().await,
            );

            if session.is_cancelled() {
                cancelled = true;
                break;
            }
            if session.remaining().await == 0 {
                debug!("✅ enough matches after page {}, not listing further", stats.pages);
                break;
            }
            if !has_more {
                break;
            }
        }
        progress.finish();

        let outcome = session.into_outcome(cancelled, stats).await;
        info!(
            "🏁 search of {} finished: {} match(es) over {} page(s){}",
            location,
            outcome.objects.len(),
            outcome.stats.pages,
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        Ok(outcome)
    }

    /// 🧵 One page: spin up the workers, feed the queue, wait for everyone.
    async fn fan_out(
        &self,
        session: &SearchSession,
        location: &BucketLocation,
        template: &StreamMatcher,
        candidates: Vec<ObjectDescriptor>,
    ) -> Result<WorkerTally, SearchError> {
        if candidates.is_empty() {
            return Ok(WorkerTally::default());
        }

        let (tx, rx) = async_channel::bounded(self.runtime.queue_capacity.max(1));
        let worker_count = self.runtime.worker_parallelism.max(1).min(candidates.len());
        debug!(
            "🧵 page fan-out: {} candidates across {} workers",
            candidates.len(),
            worker_count
        );

        let handles: Vec<_> = (0..worker_count)
            .map(|_| {
                MatchWorker::new(
                    rx.clone(),
                    Arc::clone(&self.store),
                    location.clone(),
                    template.clone(),
                    session.aggregator.clone(),
                    session.cancel.clone(),
                    self.policy(),
                )
                .start()
            })
            .collect();
        // -- 🔒 only workers hold receivers now, so a send fails once they have all quit
        drop(rx);

        for object in candidates {
            if tx.send(object).await.is_err() {
                break;
            }
        }
        tx.close();

        // -- 🚧 the page barrier
        let mut tally = WorkerTally::default();
        for result in futures::future::join_all(handles).await {
            tally.absorb(result?);
        }
        Ok(tally)
    }
}
