//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::backends::{FileStoreConfig, S3StoreConfig};

/// 📦 One struct to rule them all: where the bytes live, and how hard to hit them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// 🪣 Which object store to talk to. Defaults to S3 with the ambient AWS credentials.
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 🎭 The many faces of an object store, as written in TOML: `[store.S3]` or `[store.File]`.
#[derive(Debug, Deserialize, Clone)]
pub enum StoreConfig {
    S3(S3StoreConfig),
    File(FileStoreConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::S3(S3StoreConfig::default())
    }
}

/// 🎛️ The knobs of the search engine itself.
///
/// 🧠 Knowledge graph:
/// - `max_object_size_bytes`: anything bigger is never downloaded (equal is fine)
/// - `page_size`: MaxKeys per listing call, also the fan-out unit
/// - `worker_parallelism`: ceiling on concurrent fetch+match tasks per page
/// - `queue_capacity`: depth of the channel feeding candidates to workers
/// - `fetch_part_size_bytes`: ranged-GET size / file read chunk
/// - `fetch_retries` + `retry_backoff_ms`: 0 retries unless you opt in
/// - `decompress_gzip`: inflate `*.gz` objects before matching
/// - `show_progress`: draw a progress line on stderr
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default = "default_max_object_size_bytes")]
    pub max_object_size_bytes: u64,
    #[serde(default = "default_page_size", alias = "max_keys")]
    pub page_size: usize,
    #[serde(default = "default_worker_parallelism", alias = "parallelism")]
    pub worker_parallelism: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_fetch_part_size_bytes")]
    pub fetch_part_size_bytes: u64,
    #[serde(default)]
    pub fetch_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub decompress_gzip: bool,
    #[serde(default)]
    pub show_progress: bool,
}

// 📏 500 MiB. bigger than that and we politely pretend it isn't there.
fn default_max_object_size_bytes() -> u64 {
    500 * 1024 * 1024
}

// 📄 1000 keys, the most S3 will hand over per ListObjectsV2 call anyway
fn default_page_size() -> usize {
    1000
}

fn default_worker_parallelism() -> usize {
    16
}

fn default_queue_capacity() -> usize {
    64
}

// 📦 64 MiB ranged GETs, same part size the download managers like
fn default_fetch_part_size_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_retry_backoff_ms() -> u64 {
    200
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_object_size_bytes: default_max_object_size_bytes(),
            page_size: default_page_size(),
            worker_parallelism: default_worker_parallelism(),
            queue_capacity: default_queue_capacity(),
            fetch_part_size_bytes: default_fetch_part_size_bytes(),
            fetch_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            decompress_gzip: false,
            show_progress: false,
        }
    }
}

/// 🚀 Load the config from a file, from env vars, or from the sheer power of defaults.
///
/// 🔧 Merges environment variables (`S3X_*`) with an optional TOML file.
///   - `None` → env vars only (plus defaults)
///   - `Some(path)` → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Returns an error if the config is unparseable, with a message that says
/// which of the two suspects did it.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("S3X_"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (S3X_*). \
             The file exists in our hearts, but apparently not in valid TOML.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (S3X_*). \
                 No file was provided, this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}
