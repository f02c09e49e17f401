//! 🎬 *[the workers have spoken. somebody has to write it all down.]*
//!
//! 📦 The Collectors module: where confirmed matches go to be counted.
//!
//! [`ResultAggregator`] is the one and only mutator of the result set. Workers
//! hold clones of it (it's an `Arc` inside) and call [`ResultAggregator::record`]
//! when a matcher says yes. The coordinator reads [`ResultAggregator::count`]
//! after each page barrier to decide whether to keep going.
//!
//! 🧠 Knowledge graph:
//! - insertion order is page order; inside a page it's whoever finished first
//! - a key is recorded at most once, even if a confused caller tries twice
//!
//! 🦆 (the duck collects receipts)

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::trace;

use crate::common::ObjectDescriptor;

/// 📒 Matches in arrival order, plus the keys already seen for O(1) dedupe.
#[derive(Debug, Default)]
struct Found {
    keys: HashSet<String>,
    objects: Vec<ObjectDescriptor>,
}

/// 🗃️ Shared, append-only list of matches. Cheap to clone, every clone sees the same list.
#[derive(Debug, Default, Clone)]
pub(crate) struct ResultAggregator {
    /// 🔒 The Mutex is load-bearing. Workers on different threads land here at the same time.
    found: Arc<Mutex<Found>>,
}

impl ResultAggregator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// ✅ Record a confirmed match. Returns `false` if the key was already there.
    pub(crate) async fn record(&self, object: ObjectDescriptor) -> bool {
        let mut found = self.found.lock().await;
        if !found.keys.insert(object.key.clone()) {
            return false;
        }
        trace!("🎯 recorded match #{}: {}", found.objects.len() + 1, object.key);
        found.objects.push(object);
        true
    }

    pub(crate) async fn count(&self) -> usize {
        self.found.lock().await.objects.len()
    }

    /// 📸 A copy of everything recorded so far.
    pub(crate) async fn snapshot(&self) -> Vec<ObjectDescriptor> {
        self.found.lock().await.objects.clone()
    }
}
