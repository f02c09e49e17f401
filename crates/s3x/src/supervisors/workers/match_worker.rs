//! 🎬 *[a queue fills with object keys. somewhere, a worker waits.]*
//! *[the clock on the wall reads 2:47am.]*
//!
//! 🔎 The MatchWorker: pulls a descriptor off the page queue, streams the
//! object through a fresh matcher, and reports a verdict. It downloads only
//! as far as it needs to: the moment the pattern shows up, the rest of the
//! object is left on the server where it belongs.
//!
//! 💀 A failed fetch is a "no", logged and counted. It never stops the search.
//! 🦆 (the duck has no comment at this time)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_channel::Receiver;
use futures::TryStreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{Worker, WorkerTally};
use crate::backends::ObjectStore;
use crate::collectors::ResultAggregator;
use crate::common::{BucketLocation, ObjectDescriptor};
use crate::decoders::ContentDecoder;
use crate::matcher::{MatchState, StreamMatcher};

/// 🔁 How hard to try, and what to do with `.gz` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FetchPolicy {
    /// Extra attempts after the first failure. Zero means one shot.
    pub(crate) retries: u32,
    /// Backoff before the first retry, doubled for each one after.
    pub(crate) backoff: Duration,
    pub(crate) decompress_gzip: bool,
}

/// 🧾 What happened to one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Inspection {
    matched: bool,
    bytes_scanned: u64,
}

pub(crate) struct MatchWorker<S: ObjectStore + ?Sized> {
    rx: Receiver<ObjectDescriptor>,
    store: Arc<S>,
    location: BucketLocation,
    /// 🧬 never fed, only cloned, so every object starts from a clean slate
    template: StreamMatcher,
    aggregator: ResultAggregator,
    cancel: CancellationToken,
    policy: FetchPolicy,
}

impl<S: ObjectStore + ?Sized> std::fmt::Debug for MatchWorker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchWorker")
            .field("location", &self.location)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<S: ObjectStore + ?Sized + 'static> MatchWorker<S> {
    pub(crate) fn new(
        rx: Receiver<ObjectDescriptor>,
        store: Arc<S>,
        location: BucketLocation,
        template: StreamMatcher,
        aggregator: ResultAggregator,
        cancel: CancellationToken,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            rx,
            store,
            location,
            template,
            aggregator,
            cancel,
            policy,
        }
    }

    /// 🔎 One attempt: fetch, decode, match. Stops reading on the first hit.
    async fn inspect(&self, object: &ObjectDescriptor) -> Result<Inspection> {
        let mut chunks = self
            .store
            .fetch(&self.location, &object.key, object.size)
            .await?;
        let mut decoder =
            ContentDecoder::for_object(&object.key, self.template.clone(), self.policy.decompress_gzip);
        let mut bytes_scanned = 0u64;

        while let Some(chunk) = chunks.try_next().await? {
            bytes_scanned += chunk.len() as u64;
            trace!("📦 {} bytes of '{}'", chunk.len(), object.key);
            if decoder.push(&chunk)? == MatchState::Matched {
                return Ok(Inspection {
                    matched: true,
                    bytes_scanned,
                });
            }
        }

        Ok(Inspection {
            matched: decoder.finish()? == MatchState::Matched,
            bytes_scanned,
        })
    }

    async fn inspect_with_retries(&self, object: &ObjectDescriptor) -> Result<Inspection> {
        let mut attempt = 0u32;
        loop {
            match self.inspect(object).await {
                Ok(inspection) => return Ok(inspection),
                Err(err) if attempt < self.policy.retries => {
                    let backoff = self.policy.backoff.saturating_mul(1u32 << attempt.min(16));
                    attempt += 1;
                    warn!(
                        "🔁 fetch of '{}' failed (attempt {}), retrying in {:?}: {:#}",
                        object.key, attempt, backoff, err
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl<S: ObjectStore + ?Sized + 'static> Worker for MatchWorker<S> {
    fn start(self) -> JoinHandle<WorkerTally> {
        tokio::spawn(async move {
            debug!("🔎 MatchWorker started draining the page queue...");
            let mut tally = WorkerTally::default();
            loop {
                let object = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    received = self.rx.recv() => match received {
                        Ok(object) => object,
                        // -- 🏁 queue empty and closed: the page is done
                        Err(_) => break,
                    },
                };

                let verdict = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        debug!("🛑 cancelled while inspecting '{}'", object.key);
                        break;
                    }
                    verdict = self.inspect_with_retries(&object) => verdict,
                };

                tally.fetched += 1;
                match verdict {
                    Ok(inspection) => {
                        tally.bytes_scanned += inspection.bytes_scanned;
                        if inspection.matched {
                            debug!("🎯 '{}' contains the pattern", object.key);
                            if self.aggregator.record(object).await {
                                tally.matched += 1;
                            }
                        }
                    }
                    Err(err) => {
                        tally.failed += 1;
                        warn!(
                            "⚠️ could not read '{}' from {}, counting it as no match: {:#}",
                            object.key, self.location, err
                        );
                    }
                }
            }
            debug!("🏁 MatchWorker done: {:?}", tally);
            tally
        })
    }
}
