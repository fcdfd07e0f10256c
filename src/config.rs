use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{GatewayError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "waitlist.toml";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Resolved gateway settings: defaults, then the TOML file, then environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub upstream_url: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    gateway: GatewaySection,
}

#[derive(Debug, Default, Deserialize)]
struct GatewaySection {
    upstream_url: Option<String>,
    port: Option<u16>,
    request_timeout_secs: Option<u64>,
}

/// Values taken from the process environment.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pub upstream_url: Option<String>,
    pub port: Option<String>,
    pub timeout_secs: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            upstream_url: std::env::var("WAITLIST_UPSTREAM_URL").ok(),
            port: std::env::var("PORT").ok(),
            timeout_secs: std::env::var("WAITLIST_TIMEOUT_SECS").ok(),
        }
    }
}

impl GatewayConfig {
    /// Load `.env`, the optional config file and environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let env_path = std::env::var("WAITLIST_CONFIG").ok();
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env_path.map(Into::into))
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.into());

        Self::resolve(Some(path.as_path()), EnvOverrides::from_env())
    }

    /// Merge a config file (skipped when it does not exist) with overrides.
    pub fn resolve(path: Option<&Path>, env: EnvOverrides) -> Result<Self> {
        let file = match path {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(path)?;
                toml::from_str::<ConfigFile>(&content)?
            }
            _ => ConfigFile::default(),
        };

        let upstream_url = env
            .upstream_url
            .filter(|s| !s.trim().is_empty())
            .or(file.gateway.upstream_url)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                GatewayError::Config(
                    "upstream_url is not set (WAITLIST_UPSTREAM_URL or [gateway].upstream_url)"
                        .to_string(),
                )
            })?;

        if !(upstream_url.starts_with("http://") || upstream_url.starts_with("https://")) {
            return Err(GatewayError::Config(format!(
                "upstream_url must be an http(s) URL, got '{}'",
                upstream_url
            )));
        }

        let port = match env.port {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| GatewayError::Config(format!("Invalid PORT '{}': {}", raw, e)))?,
            None => file.gateway.port.unwrap_or(DEFAULT_PORT),
        };

        let request_timeout_secs = match env.timeout_secs {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                GatewayError::Config(format!("Invalid WAITLIST_TIMEOUT_SECS '{}': {}", raw, e))
            })?,
            None => file.gateway.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        if request_timeout_secs == 0 {
            return Err(GatewayError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self { upstream_url, port, request_timeout_secs })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
