//! Config schema types.
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsghubConfig {
    pub listener: ListenerConfig,
    pub logging: LoggingConfig,
}

/// Envelope listener behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Send `received`/`consumed`/`failed` notifications for inbound
    /// messages. Defaults to true.
    pub auto_notify: bool,
    /// How long `stop` lets in-flight envelopes finish before cancelling
    /// them. Defaults to 30 seconds.
    pub drain_timeout_secs: u64,
}

impl ListenerConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            auto_notify: true,
            drain_timeout_secs: 30,
        }
    }
}

/// Log output settings used by the `msghub` binary. CLI flags win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `msghub_listener=debug`.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}
