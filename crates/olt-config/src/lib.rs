//! Configuration for the OLT subscriber provisioning service.
//!
//! One TOML file merged over built-in defaults and `OLT_`-prefixed
//! environment variables, translated into `olt_core::ServiceConfig` and,
//! when a remote directory is configured, an `olt_sadis` client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use olt_core::ServiceConfig;
use olt_sadis::{SadisClient, TlsMode, TransportConfig};

/// Prefix of environment overrides. Nested keys use `__`, e.g.
/// `OLT_SADIS__URL`.
pub const ENV_PREFIX: &str = "OLT_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("directory client: {0}")]
    Directory(#[from] olt_sadis::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Port annotation holding the subscriber's directory key.
    #[serde(default = "default_key_annotation")]
    pub subscriber_key_annotation: String,

    /// `protocol` annotation value that marks a device as an OLT.
    #[serde(default = "default_protocol")]
    pub access_device_protocol: String,

    #[serde(default = "default_bandwidth_profile")]
    pub default_bandwidth_profile: String,

    /// Seconds between reconciliation sweeps; 0 disables them.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    #[serde(default)]
    pub provision_on_port_up: bool,

    /// Remote subscriber directory. Absent means profiles are supplied
    /// in-process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sadis: Option<SadisSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subscriber_key_annotation: default_key_annotation(),
            access_device_protocol: default_protocol(),
            default_bandwidth_profile: default_bandwidth_profile(),
            reconcile_interval_secs: default_reconcile_interval(),
            provision_on_port_up: false,
            sadis: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SadisSettings {
    /// Directory base URL (e.g., "http://sadis.local:8080/").
    pub url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Path to a PEM CA certificate for the directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Skip certificate verification.
    #[serde(default)]
    pub insecure: bool,
}

fn default_key_annotation() -> String {
    ServiceConfig::default().subscriber_key_annotation
}
fn default_protocol() -> String {
    ServiceConfig::default().access_device_protocol
}
fn default_bandwidth_profile() -> String {
    ServiceConfig::default().default_bandwidth_profile
}
fn default_reconcile_interval() -> u64 {
    ServiceConfig::default().reconcile_interval_secs
}
fn default_timeout() -> u64 {
    10
}

impl Config {
    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("subscriber_key_annotation", &self.subscriber_key_annotation),
            ("access_device_protocol", &self.access_device_protocol),
            ("default_bandwidth_profile", &self.default_bandwidth_profile),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }

        if let Some(sadis) = &self.sadis {
            sadis.base_url()?;
            if sadis.timeout_secs == 0 {
                return Err(invalid("sadis.timeout_secs", "must be greater than 0"));
            }
        }
        Ok(())
    }

    pub fn to_service_config(&self) -> ServiceConfig {
        ServiceConfig {
            subscriber_key_annotation: self.subscriber_key_annotation.clone(),
            access_device_protocol: self.access_device_protocol.clone(),
            default_bandwidth_profile: self.default_bandwidth_profile.clone(),
            reconcile_interval_secs: self.reconcile_interval_secs,
            provision_on_port_up: self.provision_on_port_up,
        }
    }

    /// Build the directory client, if one is configured.
    pub fn sadis_client(&self) -> Result<Option<SadisClient>, ConfigError> {
        let Some(sadis) = &self.sadis else {
            return Ok(None);
        };
        let client = SadisClient::new(sadis.base_url()?, &sadis.transport())?;
        Ok(Some(client))
    }
}

impl SadisSettings {
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url: Url = self
            .url
            .parse()
            .map_err(|_| invalid("sadis.url", format!("invalid URL: {}", self.url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(
                "sadis.url",
                format!("expected http or https, got '{other}'"),
            )),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ca) = &self.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        };

        TransportConfig {
            tls,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "opencord", "olt").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("olt");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path` (if it exists), then `OLT_*` variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
