//! 📦 Common data structures: the building blocks of s3x.
//!
//! 🎬 COLD OPEN: INT. S3 CONSOLE, 3:47 AM
//!
//! Eleven million log files. One of them says `ERROR500`. The on-call engineer
//! knows this the way you know a song is stuck in your head: with certainty and
//! no useful detail. These are the structs that ferry the question in and the
//! answer out. They don't ask questions. They carry the data. 🦆

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// 🔎 One search, as asked by the caller.
///
/// `start_time` / `end_time` are epoch seconds. Zero means "unset". The time
/// window only applies when `end_time > start_time`, every other combination
/// leaves the time filter asleep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub bucket: String,
    pub pattern: String,
    pub result_count: usize,
    pub region: String,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub end_time: i64,
}

impl SearchRequest {
    /// ✅ Reject malformed requests before a single byte of storage traffic happens.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.bucket.trim().is_empty() {
            return Err(SearchError::Validation("bucket is required".into()));
        }
        if self.region.trim().is_empty() {
            return Err(SearchError::Validation("region is required".into()));
        }
        if self.pattern.is_empty() {
            return Err(SearchError::Validation("pattern must not be empty".into()));
        }
        if self.result_count == 0 {
            return Err(SearchError::Validation(
                "result_count must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn location(&self) -> BucketLocation {
        BucketLocation {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
        }
    }
}

/// 🗺️ Where a bucket lives. Every store call gets one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketLocation {
    pub bucket: String,
    pub region: String,
}

impl std::fmt::Display for BucketLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.bucket, self.region)
    }
}

/// 🎯 A listed object: key, size, and when it last changed. Immutable once listed.
///
/// This is also what a match looks like on the way out. No offsets, no
/// snippets. Either the pattern is in there or it isn't.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub key: String,
    pub size: u64,
    /// ⏱️ epoch seconds
    pub last_modified: i64,
}

impl ObjectDescriptor {
    pub fn new(key: impl Into<String>, size: u64, last_modified: i64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified,
        }
    }
}

/// 📊 Counters for one search, mostly for logs and the CLI footer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub pages: usize,
    pub listed: usize,
    pub candidates: usize,
    pub fetched: usize,
    pub matched: usize,
    pub failed_fetches: usize,
}

/// 🏁 What a search hands back: the matches, whether we were cut short, and the tally.
///
/// `objects` is ordered page by page (page 1 hits before page 2 hits), with no
/// ordering promise inside a page. When `cancelled` is true the list is
/// whatever had been confirmed before the plug was pulled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub objects: Vec<ObjectDescriptor>,
    pub cancelled: bool,
    pub stats: SearchStats,
}
