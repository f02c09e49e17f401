//! # Previously, on s3x...
//!
//! 🎬 The test suite needed a bucket. A real one costs money, takes seconds to
//! answer, and never fails on command. So we built one out of a `BTreeMap` and
//! a willingness to lie convincingly.
//!
//! `in_mem` provides [`InMemoryStore`]: buckets, objects, and timestamps living
//! entirely in RAM, plus a bag of tricks for the sad paths. Objects can be made
//! to fail, fail a few times then recover, break halfway through the download,
//! or hang forever. Buckets can be made unreachable. Listings can be made to
//! explode. Every call is counted so tests can assert what was NOT done.
//!
//! 🦆
//!
//! ⚠️ This is NOT for production. This is for tests and local dry runs. If you
//! are deploying this to prod, please also deploy a therapist.

mod in_mem_store;

pub use in_mem_store::{FetchFault, InMemoryStore};
