//! 🧵 Workers: the ones who actually download things while the Supervisor
//! takes all the credit in the sprint retro.
//!
//! ⚠️ Private to the supervisor. Like Fight Club, but for async tasks.

use tokio::task::JoinHandle;

mod match_worker;
pub(crate) use match_worker::{FetchPolicy, MatchWorker};

/// 🏗️ A background worker, that does work. duh.
///
/// Returns a JoinHandle because we trust but verify. Mostly verify.
pub(crate) trait Worker {
    fn start(self) -> JoinHandle<WorkerTally>;
}

/// 📊 What one worker got up to before its queue ran dry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WorkerTally {
    /// 🔢 Objects inspected to a verdict, failures included.
    pub(crate) fetched: usize,
    pub(crate) failed: usize,
    pub(crate) matched: usize,
    /// 📦 Raw bytes pulled from the store, before any decompression.
    pub(crate) bytes_scanned: u64,
}

impl WorkerTally {
    pub(crate) fn absorb(&mut self, other: WorkerTally) {
        self.fetched += other.fetched;
        self.failed += other.failed;
        self.matched += other.matched;
        self.bytes_scanned += other.bytes_scanned;
    }
}
