//! Object store module - dataset and model artifact storage

use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectStorePath;
use object_store::{
    ClientOptions, ObjectStore, ObjectStoreExt, PutMode, PutOptions, PutPayload, RetryConfig,
    UpdateVersion,
};

use crate::config::{StoreBackend, StoreConfig};

pub type SharedStore = Arc<dyn ObjectStore>;

/// How a dataset write-back treats concurrent modifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Unconditional overwrite, last writer wins
    #[default]
    Overwrite,
    /// Compare-and-swap against the version observed when reading
    Conditional,
}

impl StoreConfig {
    pub fn write_mode(&self) -> WriteMode {
        if self.conditional_writes {
            WriteMode::Conditional
        } else {
            WriteMode::Overwrite
        }
    }
}

/// Object content together with the version it was read at
#[derive(Debug, Clone)]
pub struct Versioned {
    pub bytes: Bytes,
    pub version: UpdateVersion,
}

/// Create the object store described by the configuration
pub fn build_store(config: &StoreConfig) -> anyhow::Result<SharedStore> {
    match &config.backend {
        StoreBackend::S3 {
            region,
            endpoint,
            access_key_id,
            secret_access_key,
        } => {
            let retry = RetryConfig {
                max_retries: config.max_retries,
                retry_timeout: config.retry_timeout,
                ..Default::default()
            };

            let mut builder = AmazonS3Builder::from_env()
                .with_bucket_name(&config.bucket)
                .with_region(region)
                .with_retry(retry)
                .with_client_options(ClientOptions::new().with_timeout(config.timeout));

            if let Some(key) = access_key_id {
                builder = builder.with_access_key_id(key);
            }
            if let Some(secret) = secret_access_key {
                builder = builder.with_secret_access_key(secret);
            }
            if let Some(endpoint) = endpoint {
                builder = builder
                    .with_endpoint(endpoint)
                    .with_allow_http(endpoint.starts_with("http://"));
            }

            let store = builder.build().context("Failed to create S3 object store")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Local { root } => {
            std::fs::create_dir_all(root)
                .with_context(|| format!("Failed to create store directory {}", root.display()))?;
            let store = LocalFileSystem::new_with_prefix(root)
                .context("Failed to create local object store")?;
            Ok(Arc::new(store))
        }
    }
}

/// Read an object, failing if it does not exist
pub async fn read_bytes(store: &SharedStore, key: &str) -> Result<Bytes, object_store::Error> {
    let path = ObjectStorePath::from(key);
    store.get(&path).await?.bytes().await
}

/// Read an object and its version. A missing object yields `None`.
pub async fn read_versioned(
    store: &SharedStore,
    key: &str,
) -> Result<Option<Versioned>, object_store::Error> {
    let path = ObjectStorePath::from(key);

    let result = match store.get(&path).await {
        Ok(result) => result,
        Err(object_store::Error::NotFound { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };

    let version = UpdateVersion {
        e_tag: result.meta.e_tag.clone(),
        version: result.meta.version.clone(),
    };
    let bytes = result.bytes().await?;

    Ok(Some(Versioned { bytes, version }))
}

/// Replace an object's content.
///
/// In [`WriteMode::Conditional`], `observed` is the version from the preceding
/// read. `None` means the object did not exist, and the write then only succeeds
/// if it still does not.
pub async fn write_bytes(
    store: &SharedStore,
    key: &str,
    content: Bytes,
    mode: WriteMode,
    observed: Option<&UpdateVersion>,
) -> Result<(), object_store::Error> {
    let path = ObjectStorePath::from(key);

    let put_mode = match (mode, observed) {
        (WriteMode::Overwrite, _) => PutMode::Overwrite,
        (WriteMode::Conditional, Some(version)) => PutMode::Update(version.clone()),
        (WriteMode::Conditional, None) => PutMode::Create,
    };

    store
        .put_opts(&path, PutPayload::from(content), PutOptions::from(put_mode))
        .await?;
    Ok(())
}
