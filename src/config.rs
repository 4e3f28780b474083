//! Configuration: TOML file + environment overrides for secrets
//!
//! Lookup order: `--config` path, `VITALWATCH_CONFIG`, `./vitalwatch.toml`,
//! built-in defaults. Cipher material has no default and must be supplied.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::core::CipherCodec;
use crate::error::ConfigError;
use crate::types::AlertPolicy;
use crate::{
    EVENT_WINDOW_SECS, HISTORY_SLICE_LEN, MAX_EVENTS_PER_KIND, SECURITY_BREACH_THRESHOLD,
    TRIAGE_TIMEOUT_MS, TRIAGE_VALIDITY_SECS,
};

pub const DEFAULT_CONFIG_FILE: &str = "vitalwatch.toml";

/// Where [`Config::load`] found its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Searched path did not exist
    Defaults(PathBuf),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!(path = %path.display(), "loaded configuration"),
            ConfigSource::Defaults(path) => warn!(path = %path.display(), "no config file, using defaults"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub cipher: CipherConf,
    pub store: StoreConf,
    pub messaging: MessagingConf,
    pub triage: TriageConf,
    pub alert: AlertConf,
    pub window: WindowConf,
    pub server: ServerConf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConf {
    /// 16 bytes, hex
    pub key_hex: String,
    /// 16 bytes, hex
    pub iv_hex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConf {
    /// REST root of the telemetry store; `None` requires `--fixture`
    pub base_url: Option<String>,
    pub auth_token: Option<String>,
    pub timeout_ms: u64,
    pub paths: StorePaths,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorePaths {
    pub vitals: String,
    pub sos: String,
    pub motion: String,
    pub access: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConf {
    /// Alerts are only logged when unset
    pub webhook_url: Option<String>,
    pub recipient: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConf {
    /// Triage is disabled when unset
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub validity_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConf {
    /// Enables cooldown re-arming while an alert is latched
    pub cooldown_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConf {
    pub duration_secs: u64,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConf {
    pub addr: String,
    /// Background polling; request-driven only when unset
    pub poll_interval_ms: Option<u64>,
    pub history_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            cipher: CipherConf::default(),
            store: StoreConf::default(),
            messaging: MessagingConf::default(),
            triage: TriageConf::default(),
            alert: AlertConf::default(),
            window: WindowConf::default(),
            server: ServerConf::default(),
        }
    }
}

impl Default for StoreConf {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            timeout_ms: 3000,
            paths: StorePaths::default(),
        }
    }
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            vitals: "vitals".to_string(),
            sos: "sos-button".to_string(),
            motion: "motion-event".to_string(),
            access: "access-control-event".to_string(),
        }
    }
}

impl Default for MessagingConf {
    fn default() -> Self {
        Self {
            webhook_url: None,
            recipient: "caregiver".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl Default for TriageConf {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: TRIAGE_TIMEOUT_MS,
            validity_secs: TRIAGE_VALIDITY_SECS,
        }
    }
}

impl Default for WindowConf {
    fn default() -> Self {
        Self {
            duration_secs: EVENT_WINDOW_SECS,
            capacity: MAX_EVENTS_PER_KIND,
        }
    }
}

impl Default for ServerConf {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:5000".to_string(),
            poll_interval_ms: None,
            history_limit: HISTORY_SLICE_LEN,
        }
    }
}

impl Config {
    /// Parse a TOML document (no env overrides, no validation)
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(text)?)
    }

    /// Resolve, read, override from the process environment and validate
    ///
    /// Nothing is logged here; the caller reports the [`ConfigSource`] once
    /// its subscriber is installed.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("VITALWATCH_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let (mut config, source) = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
            (Self::from_toml_str(&text)?, ConfigSource::File(path))
        } else if explicit.is_some() {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        } else {
            (Self::default(), ConfigSource::Defaults(path))
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok((config, source))
    }

    /// Override secrets and endpoints from environment-style lookups
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("VITALWATCH_CIPHER_KEY") {
            self.cipher.key_hex = v;
        }
        if let Some(v) = lookup("VITALWATCH_CIPHER_IV") {
            self.cipher.iv_hex = v;
        }
        if let Some(v) = lookup("VITALWATCH_STORE_URL") {
            self.store.base_url = Some(v);
        }
        if let Some(v) = lookup("VITALWATCH_STORE_TOKEN") {
            self.store.auth_token = Some(v);
        }
        if let Some(v) = lookup("VITALWATCH_WEBHOOK_URL") {
            self.messaging.webhook_url = Some(v);
        }
        if let Some(v) = lookup("VITALWATCH_TRIAGE_URL") {
            self.triage.endpoint = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.codec()?;
        if self.window.duration_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "window.duration_secs",
                reason: "must be positive".to_string(),
            });
        }
        // A smaller log evicts in-window events before a breach can be counted
        if self.window.capacity < SECURITY_BREACH_THRESHOLD {
            return Err(ConfigError::Invalid {
                field: "window.capacity",
                reason: format!("must be at least {}", SECURITY_BREACH_THRESHOLD),
            });
        }
        if self.server.poll_interval_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "server.poll_interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn codec(&self) -> Result<CipherCodec, ConfigError> {
        CipherCodec::from_hex(&self.cipher.key_hex, &self.cipher.iv_hex)
    }

    pub fn alert_policy(&self) -> AlertPolicy {
        match self.alert.cooldown_secs {
            Some(secs) => AlertPolicy::Cooldown(Duration::from_secs(secs)),
            None => AlertPolicy::Latched,
        }
    }
}
