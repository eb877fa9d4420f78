//! Client configuration loaded from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default request timeout for the remote document store.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for a device running the sync engine.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the document server
    pub remote_url: String,
    /// Bearer token presented to the document server
    pub auth_token: Option<String>,
    /// Directory holding the device-local lists
    pub data_dir: PathBuf,
    /// Transport-level timeout for each remote request
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Config with defaults for everything but the remote URL.
    pub fn new(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            auth_token: None,
            data_dir: PathBuf::from(".tote"),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let remote_url = env::var("TOTE_REMOTE_URL").map_err(|_| ConfigError::MissingRemoteUrl)?;

        let auth_token = env::var("TOTE_AUTH_TOKEN").ok().filter(|t| !t.is_empty());

        let data_dir = env::var("TOTE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".tote"));

        let timeout_secs = match env::var("TOTE_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidTimeout)?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            remote_url,
            auth_token,
            data_dir,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOTE_REMOTE_URL environment variable is required")]
    MissingRemoteUrl,

    #[error("Invalid TOTE_REQUEST_TIMEOUT_SECS value")]
    InvalidTimeout,
}
