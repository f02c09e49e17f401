//! 🔌 Backends: where the real I/O happens.
//!
//! 🪣 An object store answers three questions and three questions only:
//! "is this bucket there?", "what's in it (one page at a time)?", and
//! "give me the bytes of this one, in order, please".
//! Everything clever happens upstream. The stores just haul.
//!
//! 🎭 This module is the casting agency. Need S3? A directory on disk pretending
//! to be S3? A HashMap pretending to be S3 for the test suite? We've got a
//! backend for that.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::app_config::{RuntimeConfig, StoreConfig};
use crate::common::{BucketLocation, ObjectDescriptor};

pub(crate) mod file;
pub(crate) mod in_mem;
pub(crate) mod s3;

// 🎯 Re-export so callers can do `backends::S3StoreConfig` instead of spelunking.
pub use file::{FileStore, FileStoreConfig};
pub use in_mem::{FetchFault, InMemoryStore};
pub use s3::{S3Store, S3StoreConfig, StaticCredentials};

/// 🌊 An object's bytes, in order, one chunk at a time. An `Err` item means the
/// download broke, never a silent truncation.
pub type ByteChunks = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;

/// 📄 One page of a listing.
///
/// `next_cursor` is `None` once the bucket has nothing more to say.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub objects: Vec<ObjectDescriptor>,
    pub next_cursor: Option<String>,
}

/// 🪣 The storage boundary. Implement this and the search engine will happily
/// grep whatever you're hoarding.
///
/// # Contract 📜
/// - `head_bucket` is called once before listing; an error ends the search.
/// - `list_page` returns at most `max_keys` objects; feed `next_cursor` back
///   in to get the next page. Order is whatever the store likes.
/// - `fetch` returns the object's bytes in order; `size` is what the listing
///   said and may be used to plan ranged reads.
#[async_trait]
pub trait ObjectStore: std::fmt::Debug + Send + Sync {
    async fn head_bucket(&self, location: &BucketLocation) -> Result<()>;

    async fn list_page(
        &self,
        location: &BucketLocation,
        cursor: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage>;

    async fn fetch(&self, location: &BucketLocation, key: &str, size: u64) -> Result<ByteChunks>;
}

/// 🎭 The many faces of an object store. Callers never need to know (or care)
/// whether the bytes come from a region, a disk, or RAM.
#[derive(Debug)]
pub enum StoreBackend {
    S3(S3Store),
    File(FileStore),
    InMemory(InMemoryStore),
}

impl StoreBackend {
    /// 🏗️ Build the store named in config. The fetch part size comes from the runtime knobs.
    pub async fn from_config(store: &StoreConfig, runtime: &RuntimeConfig) -> Result<Self> {
        Ok(match store {
            StoreConfig::S3(s3_config) => StoreBackend::S3(
                S3Store::new(s3_config.clone(), runtime.fetch_part_size_bytes).await?,
            ),
            StoreConfig::File(file_config) => StoreBackend::File(FileStore::new(
                file_config.clone(),
                runtime.fetch_part_size_bytes,
            )),
        })
    }
}

#[async_trait]
impl ObjectStore for StoreBackend {
    async fn head_bucket(&self, location: &BucketLocation) -> Result<()> {
        match self {
            StoreBackend::S3(store) => store.head_bucket(location).await,
            StoreBackend::File(store) => store.head_bucket(location).await,
            StoreBackend::InMemory(store) => store.head_bucket(location).await,
        }
    }

    async fn list_page(
        &self,
        location: &BucketLocation,
        cursor: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage> {
        match self {
            StoreBackend::S3(store) => store.list_page(location, cursor, max_keys).await,
            StoreBackend::File(store) => store.list_page(location, cursor, max_keys).await,
            StoreBackend::InMemory(store) => store.list_page(location, cursor, max_keys).await,
        }
    }

    async fn fetch(&self, location: &BucketLocation, key: &str, size: u64) -> Result<ByteChunks> {
        match self {
            StoreBackend::S3(store) => store.fetch(location, key, size).await,
            StoreBackend::File(store) => store.fetch(location, key, size).await,
            StoreBackend::InMemory(store) => store.fetch(location, key, size).await,
        }
    }
}
