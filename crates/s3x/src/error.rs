//! 💀 Errors: the typed kind, for the failures a caller is expected to tell apart.
//!
//! Everything inside the engine speaks `anyhow` with `.context(...)` breadcrumbs.
//! The moment a failure crosses the public `search` boundary it gets a proper
//! name tag, because "something went wrong" is not a status code. 🏷️
//!
//! 🧠 Knowledge graph:
//! - storage-scope failures (`Access`, `Listing`) end the whole request
//! - object-scope failures (a single fetch) never get here, they are swallowed
//!   into a non-match by the match workers and counted in the stats
//! - cancellation is not an error at all, see `SearchOutcome::cancelled`

use thiserror::Error;

/// 🔌 Boxed source error. `anyhow::Error` converts into this for free via `.into()`.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 🚨 Everything that can stop a search dead in its tracks.
#[derive(Debug, Error)]
pub enum SearchError {
    /// 📝 The request itself is malformed. No bucket was harmed in the making of this error.
    #[error("invalid search request: {0}")]
    Validation(String),

    /// 🔒 The bucket does not exist, or it does and it is not talking to us.
    #[error("bucket '{bucket}' is not reachable in region '{region}'")]
    Access {
        bucket: String,
        region: String,
        #[source]
        source: BoxedSource,
    },

    /// 📜 Pagination fell over halfway. No partial results, the whole thing is off.
    #[error("listing bucket '{bucket}' failed")]
    Listing {
        bucket: String,
        #[source]
        source: BoxedSource,
    },

    /// 🏗️ The object store could not even be built from config.
    #[error("object store could not be initialised")]
    Store(#[source] BoxedSource),

    /// 🧵 A match worker panicked. That is a bug, not a bucket problem.
    #[error("a match worker crashed")]
    Worker(#[from] tokio::task::JoinError),
}

impl SearchError {
    /// 🏷️ True for errors that are the caller's fault rather than the storage's.
    pub fn is_validation(&self) -> bool {
        matches!(self, SearchError::Validation(_))
    }

    pub(crate) fn access(bucket: &str, region: &str, source: anyhow::Error) -> Self {
        SearchError::Access {
            bucket: bucket.to_owned(),
            region: region.to_owned(),
            source: source.into(),
        }
    }

    pub(crate) fn listing(bucket: &str, source: anyhow::Error) -> Self {
        SearchError::Listing {
            bucket: bucket.to_owned(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_access_errors_keep_their_backstory() {
        let err = SearchError::access(
            "logs",
            "eu-west-1",
            anyhow::anyhow!("403 Forbidden").context("HeadBucket failed"),
        );
        assert_eq!(
            err.to_string(),
            "bucket 'logs' is not reachable in region 'eu-west-1'"
        );
        let cause = std::error::Error::source(&err).expect("💀 the source went missing");
        assert_eq!(cause.to_string(), "HeadBucket failed");
        assert!(!err.is_validation());
    }

    #[test]
    fn the_one_where_validation_knows_it_is_the_callers_fault() {
        let err = SearchError::Validation("pattern must not be empty".into());
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "invalid search request: pattern must not be empty"
        );
    }
}
