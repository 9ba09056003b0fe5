//! Client configuration.

use crate::error::{Error, Result};
use crate::stage::{GlitchScript, DEFAULT_TRAP_LOCATION};
use shield_protocol::PUSH_PATH;
use std::str::FromStr;
use std::time::Duration;

/// Snapshot fetch period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
/// Pause before reopening a lost push connection.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1500);
/// Per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_millis(5000);

/// Timing of the two sync sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Configuration for the display and join clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin, e.g. `http://127.0.0.1:8000`
    pub server_url: String,

    pub http_timeout: Duration,

    pub sync: SyncConfig,

    pub script: GlitchScript,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            sync: SyncConfig::default(),
            script: GlitchScript::default(),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let server_url = std::env::var("SHIELD_SERVER_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.server_url);

        let location = std::env::var("SHIELD_TRAP_LOCATION")
            .unwrap_or_else(|_| DEFAULT_TRAP_LOCATION.to_string());

        let config = Self {
            server_url,
            http_timeout: env_millis("SHIELD_HTTP_TIMEOUT_MS", defaults.http_timeout)?,
            sync: SyncConfig {
                poll_interval: env_millis("SHIELD_POLL_INTERVAL_MS", defaults.sync.poll_interval)?,
                reconnect_delay: env_millis(
                    "SHIELD_RECONNECT_DELAY_MS",
                    defaults.sync.reconnect_delay,
                )?,
            },
            script: GlitchScript::with_location(location.trim()),
        };

        // Fail early on a URL the push transport cannot use.
        config.push_url()?;
        Ok(config)
    }

    /// WebSocket URL of the push endpoint.
    pub fn push_url(&self) -> Result<String> {
        let base = self.server_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            Ok(format!("wss://{}{}", rest, PUSH_PATH))
        } else if let Some(rest) = base.strip_prefix("http://") {
            Ok(format!("ws://{}{}", rest, PUSH_PATH))
        } else {
            Err(Error::Config(format!(
                "SHIELD_SERVER_URL must start with http:// or https://, got {:?}",
                self.server_url
            )))
        }
    }

    /// Address participants open to join.
    pub fn join_url(&self) -> String {
        format!("{}/join", self.server_url.trim_end_matches('/'))
    }
}

fn env_millis(key: &str, default: Duration) -> Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => u64::from_str(raw.trim())
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .ok_or_else(|| Error::Config(format!("{} must be a positive integer, got {:?}", key, raw))),
        Err(_) => Ok(default),
    }
}
