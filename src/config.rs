//! Configuration module

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};

/// Training dataset mirror, read back by the training job
pub const DEFAULT_APPEND_KEY: &str =
    "ai-pipeline-solution/air-quality-dataset/Air_Quality_Occitanie.csv";

/// Staging copy replicated by the warehouse loader
pub const DEFAULT_TRANSFER_KEY: &str =
    "transfer/air_quality_data/Air_Quality_Occitanie_Update.csv";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address, IPv4 or IPv6
    pub host: IpAddr,

    /// Server port
    pub port: u16,

    /// Object store settings
    pub store: StoreConfig,

    /// Key of the trained model artifact
    pub model_key: String,

    /// ONNX output holding the predicted class ids
    pub model_label_output: String,

    /// Optional JSON label table overriding the built-in one
    pub label_map_path: Option<PathBuf>,

    /// Dataset key used for training
    pub append_key: String,

    /// Dataset key used for warehouse replication
    pub transfer_key: String,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
}

/// Where datasets and models live and how requests to them behave
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Bucket name, reported in logs for both backends
    pub bucket: String,

    /// Per-request timeout
    pub timeout: Duration,

    pub max_retries: usize,

    /// Upper bound on the time spent retrying one request
    pub retry_timeout: Duration,

    /// Compare-and-swap the dataset write-back against the version read
    pub conditional_writes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    S3 {
        region: String,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    },
    Local {
        root: PathBuf,
    },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = match var("LOCAL_STORE_PATH") {
            Some(root) => StoreBackend::Local { root: PathBuf::from(root) },
            None => StoreBackend::S3 {
                region: var("AWS_REGION").unwrap_or_else(|| "eu-west-3".to_string()),
                endpoint: var("AWS_ENDPOINT"),
                access_key_id: var("AWS_ACCESS_KEY_ID"),
                secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
            },
        };

        let bucket = match (&backend, var("BUCKET_NAME")) {
            (_, Some(bucket)) => bucket,
            (StoreBackend::Local { .. }, None) => "local".to_string(),
            (StoreBackend::S3 { .. }, None) => {
                return Err(anyhow!("BUCKET_NAME environment variable not set"))
            }
        };

        let model_key = var("PREDICTION_MODEL")
            .context("PREDICTION_MODEL environment variable not set")?;

        let store = StoreConfig {
            backend,
            bucket,
            timeout: Duration::from_secs(parse_or(&var, "STORE_TIMEOUT_SECS", 30)?),
            max_retries: parse_or(&var, "STORE_MAX_RETRIES", 3)?,
            retry_timeout: Duration::from_secs(parse_or(&var, "STORE_RETRY_TIMEOUT_SECS", 60)?),
            conditional_writes: parse_or(&var, "STORE_CONDITIONAL_WRITES", false)?,
        };

        let max_upload_mb: usize = parse_or(&var, "MAX_UPLOAD_MB", 32)?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow!("MAX_UPLOAD_MB is too large: {}", max_upload_mb))?;

        Ok(Self {
            host: parse_or(&var, "HOST", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&var, "PORT", 7860)?,
            store,
            model_key,
            model_label_output: var("MODEL_LABEL_OUTPUT").unwrap_or_else(|| "label".to_string()),
            label_map_path: var("LABEL_MAP_PATH").map(PathBuf::from),
            append_key: var("DATASET_APPEND_KEY").unwrap_or_else(|| DEFAULT_APPEND_KEY.to_string()),
            transfer_key: var("DATASET_TRANSFER_KEY")
                .unwrap_or_else(|| DEFAULT_TRANSFER_KEY.to_string()),
            max_upload_bytes,
        })
    }

    /// Address the server binds to
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_or<T, F>(var: &F, name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value {raw:?} for {name}: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_with_s3_backend() {
        let config = Config::from_lookup(lookup(&[
            ("BUCKET_NAME", "air-quality"),
            ("PREDICTION_MODEL", "models/rf.onnx"),
        ]))
        .unwrap();

        assert_eq!(config.port, 7860);
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:7860");
        assert_eq!(config.store.bucket, "air-quality");
        assert_eq!(config.model_key, "models/rf.onnx");
        assert_eq!(config.append_key, DEFAULT_APPEND_KEY);
        assert_eq!(config.transfer_key, DEFAULT_TRANSFER_KEY);
        assert_eq!(config.store.timeout, Duration::from_secs(30));
        assert!(!config.store.conditional_writes);
        assert_eq!(config.max_upload_bytes, 32 * 1024 * 1024);
        assert!(matches!(config.store.backend, StoreBackend::S3 { ref region, .. } if region == "eu-west-3"));
    }

    #[test]
    fn test_local_backend_does_not_need_bucket() {
        let config = Config::from_lookup(lookup(&[
            ("LOCAL_STORE_PATH", "/tmp/airq"),
            ("PREDICTION_MODEL", "model.onnx"),
            ("STORE_CONDITIONAL_WRITES", "true"),
        ]))
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Local { root: PathBuf::from("/tmp/airq") });
        assert_eq!(config.store.bucket, "local");
        assert!(config.store.conditional_writes);
    }

    #[test]
    fn test_missing_required_values() {
        let err = Config::from_lookup(lookup(&[("PREDICTION_MODEL", "m.onnx")])).unwrap_err();
        assert!(err.to_string().contains("BUCKET_NAME"));

        let err = Config::from_lookup(lookup(&[("BUCKET_NAME", "b")])).unwrap_err();
        assert!(err.to_string().contains("PREDICTION_MODEL"));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("BUCKET_NAME", "b"),
            ("PREDICTION_MODEL", "m.onnx"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_ipv6_host() {
        let config = Config::from_lookup(lookup(&[
            ("BUCKET_NAME", "b"),
            ("PREDICTION_MODEL", "m.onnx"),
            ("HOST", "::"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.socket_addr().to_string(), "[::]:8080");

        let err = Config::from_lookup(lookup(&[
            ("BUCKET_NAME", "b"),
            ("PREDICTION_MODEL", "m.onnx"),
            ("HOST", "localhost:80"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("HOST"));
    }

    #[test]
    fn test_oversized_upload_limit_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("BUCKET_NAME", "b"),
            ("PREDICTION_MODEL", "m.onnx"),
            ("MAX_UPLOAD_MB", &usize::MAX.to_string()),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("MAX_UPLOAD_MB"));
    }
}
