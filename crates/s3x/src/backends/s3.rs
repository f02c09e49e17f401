//! 🪣📡 S3 backend: the real thing, with real latency and real bills.
//!
//! COLD OPEN. EXT. DATA CENTER. 3:47 AM.
//!
//! The bucket has eleven million objects. The SDK has opinions about regions.
//! This module has one client per region, cached, and a strict policy of
//! reading objects front to back in ranged GETs so no single response ever
//! has to be held in memory whole.
//!
//! 🧠 Knowledge graph:
//! - `S3StoreConfig`: optional endpoint override, path-style addressing, static credentials
//! - `S3Store`: `HeadBucket` / `ListObjectsV2` / ranged `GetObject`
//! - Credentials: the ambient AWS chain (env, profile, IMDS) unless static ones are configured,
//!   which is how local emulators like LocalStack get their `foo`/`bar` keys

mod s3_store;

pub use s3_store::{S3Store, S3StoreConfig, StaticCredentials};
