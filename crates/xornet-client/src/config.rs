//! Configuration for the Xornet client.
//!
//! Layers, later ones win:
//!
//! 1. built-in defaults
//! 2. optional TOML file (`--config`)
//! 3. environment variables:
//!    - `XORNET_BASE_URL`             (default: "https://backend.xornet.cloud")
//!    - `XORNET_TOKEN_PATH`           (default: "$HOME/.xornet/token")
//!    - `XORNET_WATCHDOG_INTERVAL_MS` (default: "5000")
//!    - `XORNET_HEARTBEAT_TIMEOUT_MS` (default: "5000")
//!    - `XORNET_DRAIN_INTERVAL_MS`    (default: "1000")
//!    - `XORNET_REQUEST_TIMEOUT_MS`   (default: "10000")
//! 4. command-line flags (applied by `main`)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://backend.xornet.cloud";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// REST base URL; the socket URL is derived from it.
    pub base_url: String,

    /// Where the auth token is persisted.
    pub token_path: PathBuf,

    /// How often the liveness watchdog polls.
    pub watchdog_interval_ms: u64,

    /// Silence allowed before the socket is presumed dead.
    pub heartbeat_timeout_ms: u64,

    /// Cadence of the telemetry drain cycle.
    pub drain_interval_ms: u64,

    /// Timeout for a single REST call.
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_path: default_token_path(),
            watchdog_interval_ms: 5000,
            heartbeat_timeout_ms: 5000,
            drain_interval_ms: 1000,
            request_timeout_ms: 10_000,
        }
    }
}

impl ClientConfig {
    /// Defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Every interval and timeout must be at least one millisecond.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("watchdog_interval_ms", self.watchdog_interval_ms),
            ("heartbeat_timeout_ms", self.heartbeat_timeout_ms),
            ("drain_interval_ms", self.drain_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ];
        match durations.iter().find(|(_, ms)| *ms == 0) {
            Some((field, _)) => Err(ConfigError::ZeroDuration { field: *field }),
            None => Ok(()),
        }
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| env::var(key).ok())
    }

    /// Apply overrides from `lookup` (an environment stand-in).
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("XORNET_BASE_URL") {
            self.base_url = url;
        }
        if let Some(path) = lookup("XORNET_TOKEN_PATH") {
            self.token_path = PathBuf::from(path);
        }
        read_millis(&lookup, "XORNET_WATCHDOG_INTERVAL_MS", &mut self.watchdog_interval_ms)?;
        read_millis(&lookup, "XORNET_HEARTBEAT_TIMEOUT_MS", &mut self.heartbeat_timeout_ms)?;
        read_millis(&lookup, "XORNET_DRAIN_INTERVAL_MS", &mut self.drain_interval_ms)?;
        read_millis(&lookup, "XORNET_REQUEST_TIMEOUT_MS", &mut self.request_timeout_ms)?;
        Ok(())
    }

    /// `ws(s)://<host>/client`.
    pub fn socket_url(&self) -> String {
        xornet_protocol::socket_url(&self.base_url)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_token_path() -> PathBuf {
    let mut path = env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    path.push(".xornet");
    path.push("token");
    path
}

/// Positive millisecond count from `key`, if set.
fn read_millis<F>(lookup: &F, key: &'static str, slot: &mut u64) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => match val.trim().parse::<u64>() {
            Ok(ms) if ms > 0 => {
                *slot = ms;
                Ok(())
            }
            _ => Err(ConfigError::InvalidEnv { key, value: val }),
        },
        None => Ok(()),
    }
}
