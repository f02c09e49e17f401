//! 🎟️ SearchSession: everything one search carries around, in one place.
//!
//! No globals, no statics. A session is born when a request passes
//! validation and dies when the outcome is handed back.

use tokio_util::sync::CancellationToken;

use crate::collectors::ResultAggregator;
use crate::common::{SearchOutcome, SearchRequest, SearchStats};

#[derive(Debug)]
pub(crate) struct SearchSession {
    pub(crate) request: SearchRequest,
    pub(crate) cancel: CancellationToken,
    pub(crate) aggregator: ResultAggregator,
}

impl SearchSession {
    pub(crate) fn new(request: SearchRequest, cancel: CancellationToken) -> Self {
        Self {
            request,
            cancel,
            aggregator: ResultAggregator::new(),
        }
    }

    /// 🔢 How many more matches until the request is satisfied. Zero means stop listing.
    pub(crate) async fn remaining(&self) -> usize {
        self.request
            .result_count
            .saturating_sub(self.aggregator.count().await)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 🏁 Seal the session into what the caller gets back.
    pub(crate) async fn into_outcome(self, cancelled: bool, mut stats: SearchStats) -> SearchOutcome {
        let objects = self.aggregator.snapshot().await;
        stats.matched = objects.len();
        SearchOutcome {
            objects,
            cancelled,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ObjectDescriptor;

    fn request(result_count: usize) -> SearchRequest {
        SearchRequest {
            bucket: "logs".into(),
            pattern: "ERROR500".into(),
            result_count,
            region: "us-east-1".into(),
            start_time: 0,
            end_time: 0,
        }
    }

    #[tokio::test]
    async fn the_one_where_the_budget_counts_down_and_stops_at_zero() {
        let session = SearchSession::new(request(2), CancellationToken::new());
        assert_eq!(session.remaining().await, 2);

        for key in ["a", "b", "c"] {
            session
                .aggregator
                .record(ObjectDescriptor::new(key, 1, 0))
                .await;
        }
        assert_eq!(session.remaining().await, 0);

        let outcome = session.into_outcome(false, SearchStats::default()).await;
        assert_eq!(outcome.objects.len(), 3);
        assert_eq!(outcome.stats.matched, 3);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn the_one_where_the_session_hears_the_cancel_button() {
        let token = CancellationToken::new();
        let session = SearchSession::new(request(1), token.clone());
        assert!(!session.is_cancelled());
        token.cancel();
        assert!(session.is_cancelled());
    }
}
