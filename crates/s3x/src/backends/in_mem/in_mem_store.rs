use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use crate::backends::{ByteChunks, ObjectPage, ObjectStore};
use crate::common::{BucketLocation, ObjectDescriptor};

const DEFAULT_CHUNK_SIZE: usize = 4096;

/// 💥 Ways an object can ruin your afternoon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFault {
    /// Every fetch fails before a byte arrives.
    Fail,
    /// The first `n` fetches fail, then the object behaves.
    FailFirst(usize),
    /// The first chunk arrives, then the stream errors.
    BreakMidStream,
    /// The stream never yields. Only cancellation can save you now.
    Hang,
}

#[derive(Debug)]
struct StoredObject {
    body: Bytes,
    last_modified: i64,
    fault: Option<FetchFault>,
    fetches: AtomicUsize,
}

/// 🧪 A bucket-shaped HashMap with a flair for drama.
///
/// Built with consuming `with_*` calls, then shared behind an `Arc`. Listing
/// uses start-after cursors, so pages come out in key order.
#[derive(Debug)]
pub struct InMemoryStore {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    chunk_size: usize,
    inaccessible: HashSet<String>,
    broken_listing: bool,
    head_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            inaccessible: HashSet::new(),
            broken_listing: false,
            head_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// 📦 Drop an object into a bucket. The bucket springs into existence if needed.
    pub fn with_object(
        mut self,
        bucket: &str,
        key: &str,
        body: impl Into<Bytes>,
        last_modified: i64,
    ) -> Self {
        self.buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                body: body.into(),
                last_modified,
                fault: None,
                fetches: AtomicUsize::new(0),
            },
        );
        self
    }

    /// 🪣 An empty bucket. Exists, answers HEAD, lists nothing.
    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.buckets.entry(bucket.to_string()).or_default();
        self
    }

    /// 💥 Curse an existing object. Unknown keys are ignored.
    pub fn with_fault(mut self, bucket: &str, key: &str, fault: FetchFault) -> Self {
        if let Some(object) = self.buckets.get_mut(bucket).and_then(|b| b.get_mut(key)) {
            object.fault = Some(fault);
        }
        self
    }

    /// 🔪 How many bytes each fetched chunk carries. Small values stress chunk boundaries.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// 🚫 HEAD on this bucket fails, like a 403 with extra steps.
    pub fn with_inaccessible_bucket(mut self, bucket: &str) -> Self {
        self.inaccessible.insert(bucket.to_string());
        self
    }

    /// 💀 Every listing call fails.
    pub fn with_broken_listing(mut self) -> Self {
        self.broken_listing = true;
        self
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// 🔢 How many times `fetch` was called for this object, failures included.
    pub fn fetch_count(&self, bucket: &str, key: &str) -> usize {
        self.buckets
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.fetches.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.buckets
            .values()
            .flat_map(|b| b.values())
            .map(|o| o.fetches.load(Ordering::SeqCst))
            .sum()
    }

    fn chunks_of(&self, body: &Bytes) -> Vec<Result<Bytes>> {
        (0..body.len())
            .step_by(self.chunk_size)
            .map(|start| Ok(body.slice(start..(start + self.chunk_size).min(body.len()))))
            .collect()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn head_bucket(&self, location: &BucketLocation) -> Result<()> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        if self.inaccessible.contains(&location.bucket) {
            bail!("💀 403: bucket '{}' is not for your eyes", location);
        }
        if !self.buckets.contains_key(&location.bucket) {
            bail!("💀 404: no bucket named '{}'", location);
        }
        Ok(())
    }

    async fn list_page(
        &self,
        location: &BucketLocation,
        cursor: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.broken_listing {
            bail!("💀 listing of '{}' fell over mid-sentence", location);
        }
        let Some(bucket) = self.buckets.get(&location.bucket) else {
            bail!("💀 404: no bucket named '{}'", location);
        };

        let lower = match cursor {
            Some(after) => Bound::Excluded(after.to_string()),
            None => Bound::Unbounded,
        };
        let mut remaining = bucket.range((lower, Bound::Unbounded));
        let objects: Vec<ObjectDescriptor> = remaining
            .by_ref()
            .take(max_keys)
            .map(|(key, o)| ObjectDescriptor::new(key.clone(), o.body.len() as u64, o.last_modified))
            .collect();
        let next_cursor = match remaining.next() {
            Some(_) => objects.last().map(|o| o.key.clone()),
            None => None,
        };

        Ok(ObjectPage {
            objects,
            next_cursor,
        })
    }

    async fn fetch(&self, location: &BucketLocation, key: &str, _size: u64) -> Result<ByteChunks> {
        let Some(object) = self.buckets.get(&location.bucket).and_then(|b| b.get(key)) else {
            bail!("💀 404: '{}' is not in {}", key, location);
        };
        let attempt = object.fetches.fetch_add(1, Ordering::SeqCst) + 1;

        match object.fault {
            Some(FetchFault::Fail) => bail!("💀 fetch of '{}' failed, as scripted", key),
            Some(FetchFault::FailFirst(n)) if attempt <= n => {
                bail!("💀 fetch {} of '{}' failed, as scripted", attempt, key)
            }
            Some(FetchFault::Hang) => Ok(Box::pin(stream::pending::<Result<Bytes>>())),
            Some(FetchFault::BreakMidStream) => {
                let mut chunks = self.chunks_of(&object.body);
                chunks.truncate(1);
                chunks.push(Err(anyhow::anyhow!(
                    "💀 connection reset while reading '{}'",
                    key
                )));
                Ok(Box::pin(stream::iter(chunks)))
            }
            _ => Ok(Box::pin(stream::iter(self.chunks_of(&object.body)))),
        }
    }
}
