use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde::Deserialize;
use tokio::fs::{self, File};
use tokio::sync::Mutex;
use tokio_util::io::ReaderStream;
use tracing::{trace, warn};

use crate::backends::{ByteChunks, ObjectPage, ObjectStore};
use crate::common::{BucketLocation, ObjectDescriptor};

// 📏 read buffers stay at or below 8 MiB no matter how generous the part size is
const MAX_READ_CHUNK: u64 = 8 * 1024 * 1024;

/// 📂 FileStoreConfig: one path. That's it. That's the config.
#[derive(Debug, Deserialize, Clone)]
pub struct FileStoreConfig {
    /// 🌳 Directory whose subdirectories are the buckets.
    pub root: PathBuf,
}

type KeyIndex = Arc<Vec<(String, PathBuf)>>;

/// 📂 A directory tree wearing an S3 costume. Region is politely ignored.
///
/// The tree is walked once per listing: the first page (no cursor) walks and
/// sorts, later pages binary-search the remembered keys.
#[derive(Debug)]
pub struct FileStore {
    config: FileStoreConfig,
    read_chunk: usize,
    indexes: Mutex<HashMap<String, KeyIndex>>,
    walks: AtomicUsize,
}

impl FileStore {
    pub fn new(config: FileStoreConfig, part_size: u64) -> Self {
        Self {
            config,
            read_chunk: part_size.clamp(1, MAX_READ_CHUNK) as usize,
            indexes: Mutex::new(HashMap::new()),
            walks: AtomicUsize::new(0),
        }
    }

    /// 🚶 How many full directory walks have happened so far.
    pub fn walks(&self) -> usize {
        self.walks.load(Ordering::Relaxed)
    }

    /// 🗂️ Sorted keys for `bucket`. A fresh listing re-walks, a continued one reuses.
    async fn index_for(&self, bucket: &str, bucket_dir: &Path, fresh: bool) -> Result<KeyIndex> {
        let mut indexes = self.indexes.lock().await;
        if !fresh {
            if let Some(index) = indexes.get(bucket) {
                return Ok(Arc::clone(index));
            }
        }
        let index = Arc::new(self.walk(bucket_dir).await?);
        indexes.insert(bucket.to_string(), Arc::clone(&index));
        Ok(index)
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        if !is_plain_relative(bucket) || bucket.contains('/') {
            bail!("💀 '{}' is not a bucket name, it's an escape attempt", bucket);
        }
        Ok(self.config.root.join(bucket))
    }

    /// 🗂️ Every file under the bucket, as (key, path), sorted by key.
    async fn walk(&self, bucket_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
        self.walks.fetch_add(1, Ordering::Relaxed);
        let mut found = Vec::new();
        let mut pending = vec![bucket_dir.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .with_context(|| format!("💀 could not read directory '{}'", dir.display()))?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    match key_for(bucket_dir, &path)? {
                        Some(key) => found.push((key, path)),
                        None => warn!(
                            "⚠️ skipping '{}': its name is not UTF-8, so no key can point at it",
                            path.display()
                        ),
                    }
                }
            }
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }
}

// 🔒 no absolute paths, no `..`, no `.`: just names
fn is_plain_relative(candidate: &str) -> bool {
    !candidate.is_empty()
        && Path::new(candidate)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// 🔑 `None` when some path component isn't valid UTF-8.
fn key_for(bucket_dir: &Path, path: &Path) -> Result<Option<String>> {
    let relative = path
        .strip_prefix(bucket_dir)
        .context("💀 walked outside the bucket, which should be impossible")?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Ok(parts.map(|parts| parts.join("/")))
}

#[async_trait]
impl ObjectStore for FileStore {
    async fn head_bucket(&self, location: &BucketLocation) -> Result<()> {
        let dir = self.bucket_dir(&location.bucket)?;
        let metadata = fs::metadata(&dir)
            .await
            .with_context(|| format!("💀 bucket directory '{}' is missing", dir.display()))?;
        if !metadata.is_dir() {
            bail!("💀 '{}' exists but is not a directory", dir.display());
        }
        Ok(())
    }

    async fn list_page(
        &self,
        location: &BucketLocation,
        cursor: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage> {
        let dir = self.bucket_dir(&location.bucket)?;
        let index = self
            .index_for(&location.bucket, &dir, cursor.is_none())
            .await?;

        // -- 🎯 start-after: skip every key up to and including the cursor
        let start = match cursor {
            Some(after) => index.partition_point(|(key, _)| key.as_str() <= after),
            None => 0,
        };
        let remaining = &index[start..];
        let has_more = remaining.len() > max_keys;

        let mut objects = Vec::with_capacity(remaining.len().min(max_keys));
        for (key, path) in remaining.iter().take(max_keys) {
            let metadata = fs::metadata(&path)
                .await
                .with_context(|| format!("💀 could not stat '{}'", path.display()))?;
            let last_modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            objects.push(ObjectDescriptor::new(key.as_str(), metadata.len(), last_modified));
        }

        let next_cursor = if has_more {
            objects.last().map(|o| o.key.clone())
        } else {
            None
        };
        trace!(
            "📂 listed {} objects from {} (more: {})",
            objects.len(),
            dir.display(),
            has_more
        );
        Ok(ObjectPage {
            objects,
            next_cursor,
        })
    }

    async fn fetch(&self, location: &BucketLocation, key: &str, _size: u64) -> Result<ByteChunks> {
        if !is_plain_relative(key) {
            bail!("💀 key '{}' tries to leave the bucket", key);
        }
        let path = self.bucket_dir(&location.bucket)?.join(key);
        let file = File::open(&path)
            .await
            .with_context(|| format!("💀 The door to '{}' would not budge.", path.display()))?;

        let chunks = ReaderStream::with_capacity(file, self.read_chunk).map_err(move |e| {
            anyhow::Error::new(e).context(format!("💀 read of '{}' broke mid-stream", path.display()))
        });
        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(bucket: &str) -> BucketLocation {
        BucketLocation {
            bucket: bucket.into(),
            region: "anywhere".into(),
        }
    }

    fn a_bucket_on_disk() -> tempfile::TempDir {
        let root = tempfile::tempdir().expect("💀 no temp dir, no test");
        let logs = root.path().join("logs");
        std::fs::create_dir_all(logs.join("nested")).expect("💀 mkdir failed");
        std::fs::write(logs.join("a.log"), b"hello ERROR500").expect("💀 write failed");
        std::fs::write(logs.join("c.log"), b"all good").expect("💀 write failed");
        std::fs::write(logs.join("nested").join("b.log"), b"deep thoughts").expect("💀 write failed");
        root
    }

    fn store(root: &Path, part_size: u64) -> FileStore {
        FileStore::new(
            FileStoreConfig {
                root: root.to_path_buf(),
            },
            part_size,
        )
    }

    #[tokio::test]
    async fn the_one_where_directories_page_like_buckets() -> Result<()> {
        let root = a_bucket_on_disk();
        let the_store = store(root.path(), 1024);

        let first = the_store.list_page(&location("logs"), None, 2).await?;
        let keys: Vec<_> = first.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.log", "c.log"]);
        assert_eq!(first.next_cursor.as_deref(), Some("c.log"));
        assert_eq!(first.objects[0].size, 14);
        assert!(first.objects[0].last_modified > 0);

        let second = the_store
            .list_page(&location("logs"), first.next_cursor.as_deref(), 2)
            .await?;
        let keys: Vec<_> = second.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["nested/b.log"]);
        assert_eq!(second.next_cursor, None);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_long_listing_walks_the_tree_once() -> Result<()> {
        let root = tempfile::tempdir().expect("💀 no temp dir, no test");
        let logs = root.path().join("logs");
        std::fs::create_dir_all(logs.join("deep")).expect("💀 mkdir failed");
        for i in 0..25 {
            let dir = if i % 2 == 0 { logs.clone() } else { logs.join("deep") };
            std::fs::write(dir.join(format!("{i:03}.log")), b"x").expect("💀 write failed");
        }
        let the_store = store(root.path(), 1024);

        let mut pages = 0;
        let mut keys = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = the_store
                .list_page(&location("logs"), cursor.as_deref(), 4)
                .await?;
            pages += 1;
            keys.extend(page.objects.into_iter().map(|o| o.key));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 7);
        assert_eq!(keys.len(), 25);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(the_store.walks(), 1);

        // -- 🔄 a fresh listing sees new files
        std::fs::write(logs.join("zzz.log"), b"late").expect("💀 write failed");
        let again = the_store.list_page(&location("logs"), None, 100).await?;
        assert_eq!(again.objects.len(), 26);
        assert_eq!(the_store.walks(), 2);
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn the_one_where_a_non_utf8_filename_is_skipped_not_mangled() -> Result<()> {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = a_bucket_on_disk();
        let weird = root.path().join("logs").join(OsStr::from_bytes(b"bad-\xff.log"));
        std::fs::write(weird, b"ERROR500").expect("💀 write failed");
        let the_store = store(root.path(), 1024);

        let page = the_store.list_page(&location("logs"), None, 100).await?;
        let keys: Vec<_> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.log", "c.log", "nested/b.log"]);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_bytes_stream_out_in_small_chunks() -> Result<()> {
        let root = a_bucket_on_disk();
        let the_store = store(root.path(), 4);

        let chunks: Vec<_> = the_store
            .fetch(&location("logs"), "a.log", 14)
            .await?
            .try_collect()
            .await?;
        assert!(chunks.iter().all(|c| c.len() <= 4));
        let glued: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(glued, b"hello ERROR500");

        let nested: Vec<_> = the_store
            .fetch(&location("logs"), "nested/b.log", 13)
            .await?
            .try_collect()
            .await?;
        assert_eq!(nested.concat(), b"deep thoughts");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_missing_buckets_and_sneaky_keys_get_bounced() {
        let root = a_bucket_on_disk();
        let the_store = store(root.path(), 1024);

        assert!(the_store.head_bucket(&location("logs")).await.is_ok());
        assert!(the_store.head_bucket(&location("nope")).await.is_err());
        assert!(the_store.head_bucket(&location("../logs")).await.is_err());
        assert!(the_store.fetch(&location("logs"), "../logs/a.log", 1).await.is_err());
        assert!(the_store.fetch(&location("logs"), "ghost.log", 1).await.is_err());
    }
}
