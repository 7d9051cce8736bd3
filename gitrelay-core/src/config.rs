//! Environment-driven process configuration.
//!
//! AWS credentials and region are not read here; they flow through the SDK's
//! standard provider chain. Everything gitrelay-specific arrives as env
//! variables, validated once at startup. Missing or malformed values are
//! fatal and never retried.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_BUCKET: &str = "AWS_S3_BUCKET";
pub const ENV_PRIVATE_KEY_PATH: &str = "PRIVATE_KEY_PATH";
pub const ENV_PRIVATE_KEY_PASSPHRASE: &str = "PRIVATE_KEY_PASSPHRASE";
pub const ENV_GITLAB_BASE_URL: &str = "GITLAB_BASE_URL";
pub const ENV_GITLAB_USERNAME: &str = "GITLAB_USERNAME";
pub const ENV_GITLAB_TOKEN: &str = "GITLAB_TOKEN";
pub const ENV_SLEEP_SECONDS: &str = "RECONCILE_SLEEP_SECONDS";
pub const ENV_WORKDIR: &str = "WORKDIR";
pub const ENV_METRICS_PORT: &str = "METRICS_PORT";
pub const ENV_SHARD_ID: &str = "SHARD_ID";
pub const ENV_CA_CERT_PATH: &str = "CA_CERT_PATH";

const DEFAULT_SLEEP_SECONDS: u64 = 300;
const DEFAULT_WORKDIR: &str = "./workdir";
const DEFAULT_METRICS_PORT: u16 = 9090;
const DEFAULT_SHARD_ID: &str = "global";

/// Validated process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub private_key_path: PathBuf,
    pub private_key_passphrase: String,
    pub gitlab_base_url: String,
    pub gitlab_username: String,
    pub gitlab_token: String,
    pub reconcile_sleep: Duration,
    pub workdir: PathBuf,
    pub metrics_port: u16,
    pub shard_id: String,
    /// Custom CA bundle for an internal certificate authority, passed to git
    /// on push.
    pub ca_cert_path: Option<PathBuf>,
}

impl Config {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary lookup function (tests inject closures here
    /// instead of mutating the process environment).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            match lookup(name) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(ConfigError::MissingEnv { name }),
            }
        };

        let sleep_seconds = match lookup(ENV_SLEEP_SECONDS) {
            Some(raw) => raw.parse::<u64>().map_err(|err| ConfigError::Invalid {
                name: ENV_SLEEP_SECONDS,
                reason: err.to_string(),
            })?,
            None => DEFAULT_SLEEP_SECONDS,
        };

        let metrics_port = match lookup(ENV_METRICS_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|err| ConfigError::Invalid {
                name: ENV_METRICS_PORT,
                reason: err.to_string(),
            })?,
            None => DEFAULT_METRICS_PORT,
        };

        Ok(Config {
            bucket: required(ENV_BUCKET)?,
            private_key_path: PathBuf::from(required(ENV_PRIVATE_KEY_PATH)?),
            private_key_passphrase: required(ENV_PRIVATE_KEY_PASSPHRASE)?,
            gitlab_base_url: required(ENV_GITLAB_BASE_URL)?
                .trim_end_matches('/')
                .to_string(),
            gitlab_username: required(ENV_GITLAB_USERNAME)?,
            gitlab_token: required(ENV_GITLAB_TOKEN)?,
            reconcile_sleep: Duration::from_secs(sleep_seconds),
            workdir: PathBuf::from(
                lookup(ENV_WORKDIR).unwrap_or_else(|| DEFAULT_WORKDIR.to_string()),
            ),
            metrics_port,
            shard_id: lookup(ENV_SHARD_ID).unwrap_or_else(|| DEFAULT_SHARD_ID.to_string()),
            ca_cert_path: lookup(ENV_CA_CERT_PATH).map(PathBuf::from),
        })
    }
}
