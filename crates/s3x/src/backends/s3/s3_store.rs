use std::collections::HashMap;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use futures::stream;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::backends::{ByteChunks, ObjectPage, ObjectStore};
use crate::common::{BucketLocation, ObjectDescriptor};

/// 🔧 How to reach S3. All optional: the default talks to real AWS with
/// whatever credentials the environment provides.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct S3StoreConfig {
    /// 🏠 Point at LocalStack / MinIO / a wiremock instead of AWS.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// 🛣️ `http://host/bucket/key` instead of `http://bucket.host/key`. Emulators love this.
    #[serde(default)]
    pub force_path_style: bool,
    /// 🔑 Skip the credential chain entirely and use these.
    #[serde(default)]
    pub static_credentials: Option<StaticCredentials>,
}

#[derive(Deserialize, Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

// 🙈 the secret stays out of logs
impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

/// 🪣 S3 via the AWS SDK. One client per region, built on first use.
pub struct S3Store {
    shared: Option<SdkConfig>,
    config: S3StoreConfig,
    part_size: u64,
    clients: Mutex<HashMap<String, Client>>,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("config", &self.config)
            .field("part_size", &self.part_size)
            .finish()
    }
}

impl S3Store {
    /// 🚀 Resolve the ambient AWS config once (env vars → ~/.aws → IAM role → hope),
    /// unless static credentials make that unnecessary.
    pub async fn new(config: S3StoreConfig, part_size: u64) -> Result<Self> {
        let shared = match config.static_credentials {
            Some(_) => None,
            None => Some(aws_config::defaults(BehaviorVersion::latest()).load().await),
        };
        debug!("🪣 S3 store ready: {:?}", config);
        Ok(Self {
            shared,
            config,
            part_size: part_size.max(1),
            clients: Mutex::new(HashMap::new()),
        })
    }

    async fn client_for(&self, region: &str) -> Client {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(region) {
            return client.clone();
        }

        let mut builder = match &self.shared {
            Some(sdk) => aws_sdk_s3::config::Builder::from(sdk),
            None => aws_sdk_s3::config::Builder::new().behavior_version(BehaviorVersion::latest()),
        };
        builder = builder
            .region(Region::new(region.to_string()))
            .force_path_style(self.config.force_path_style);
        if let Some(creds) = &self.config.static_credentials {
            builder = builder.credentials_provider(Credentials::new(
                creds.access_key_id.clone(),
                creds.secret_access_key.clone(),
                None,
                None,
                "s3x-static",
            ));
        }
        if let Some(endpoint) = &self.config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());
        clients.insert(region.to_string(), client.clone());
        trace!("🌎 built S3 client for region {}", region);
        client
    }
}

/// 📖 Where a ranged read is up to. `body` is the part currently being drained.
struct RangedRead {
    client: Client,
    bucket: String,
    key: String,
    size: u64,
    part_size: u64,
    offset: u64,
    body: Option<ByteStream>,
}

/// 🔁 Drain the current part, then ask for the next one. `None` once `size` bytes went by.
async fn next_part(mut read: RangedRead) -> Result<Option<(Bytes, RangedRead)>> {
    loop {
        if let Some(body) = read.body.as_mut() {
            match body.try_next().await {
                Ok(Some(bytes)) => return Ok(Some((bytes, read))),
                Ok(None) => read.body = None,
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("💀 body of '{}' broke mid-stream", read.key)));
                }
            }
        }
        if read.offset >= read.size {
            return Ok(None);
        }

        // -- 📦 next part: inclusive byte range, clipped to the listed size
        let last = (read.offset + read.part_size).min(read.size) - 1;
        let response = read
            .client
            .get_object()
            .bucket(&read.bucket)
            .key(&read.key)
            .range(format!("bytes={}-{}", read.offset, last))
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "💀 GetObject for '{}' (bytes {}-{}) failed: {}",
                    read.key,
                    read.offset,
                    last,
                    DisplayErrorContext(&e)
                )
            })?;
        read.offset = last + 1;
        read.body = Some(response.body);
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head_bucket(&self, location: &BucketLocation) -> Result<()> {
        let client = self.client_for(&location.region).await;
        client
            .head_bucket()
            .bucket(&location.bucket)
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "💀 HeadBucket on {} said no. Check the name, the region, and the credentials: {}",
                    location,
                    DisplayErrorContext(&e)
                )
            })?;
        Ok(())
    }

    async fn list_page(
        &self,
        location: &BucketLocation,
        cursor: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage> {
        let client = self.client_for(&location.region).await;
        let response = client
            .list_objects_v2()
            .bucket(&location.bucket)
            .max_keys(i32::try_from(max_keys).unwrap_or(i32::MAX))
            .set_continuation_token(cursor.map(String::from))
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "💀 ListObjectsV2 on {} failed: {}",
                    location,
                    DisplayErrorContext(&e)
                )
            })?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|object| {
                // 🫥 an entry without a key is not something we can fetch
                let key = object.key()?;
                Some(ObjectDescriptor::new(
                    key,
                    object.size().unwrap_or(0).max(0) as u64,
                    object.last_modified().map(|t| t.secs()).unwrap_or(0),
                ))
            })
            .collect();

        let next_cursor = if response.is_truncated().unwrap_or(false) {
            // -- 🚧 truncated without a token: stopping here would quietly skip the rest
            match response.next_continuation_token() {
                Some(token) => Some(token.to_string()),
                None => bail!(
                    "💀 ListObjectsV2 on {} says there is more but gave no continuation token",
                    location
                ),
            }
        } else {
            None
        };
        Ok(ObjectPage {
            objects,
            next_cursor,
        })
    }

    async fn fetch(&self, location: &BucketLocation, key: &str, size: u64) -> Result<ByteChunks> {
        let read = RangedRead {
            client: self.client_for(&location.region).await,
            bucket: location.bucket.clone(),
            key: key.to_string(),
            size,
            part_size: self.part_size,
            offset: 0,
            body: None,
        };

        Ok(Box::pin(stream::try_unfold(read, next_part)))
    }
}
