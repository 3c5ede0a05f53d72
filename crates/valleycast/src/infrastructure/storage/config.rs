//! TOML-based settings persistence.
//!
//! Reads and writes [`AppConfig`] at the platform-appropriate path:
//! - Windows:  `%APPDATA%\ValleyCast\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/valleycast/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/ValleyCast/config.toml`
//!
//! Example:
//!
//! ```toml
//! host = "192.168.1.20"
//! port = 4455
//! password = "hunter2"
//! reconnect_attempts = 5
//! restart_cadence = "weekly"
//! ```
//!
//! Every field has a `#[serde(default = ...)]`, so a partial or older file
//! still loads and the app works before any file exists.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session::RestartCadence;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// Settings stored on disk.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Host running OBS Studio.
    #[serde(default = "default_host")]
    pub host: String,
    /// obs-websocket server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// obs-websocket server password; empty when authentication is off.
    #[serde(default)]
    pub password: String,
    /// Consecutive reconnect attempts before giving up.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    /// Show the connect/disconnect messages below.
    #[serde(default = "default_true")]
    pub enable_conn_notif: bool,
    #[serde(default = "default_connect_message")]
    pub conn_notif_message_connect: String,
    #[serde(default = "default_disconnect_message")]
    pub conn_notif_message_disconnect: String,
    /// Cleared after the first run has written the file.
    #[serde(default = "default_true")]
    pub first_load: bool,
    /// Delay before each reconnect attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Upper bound on waiting for one request's response.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Delay between status checks while confirming a stop.
    #[serde(default = "default_stop_poll_interval_ms")]
    pub stop_poll_interval_ms: u64,
    /// Status checks before a stop is reported as unconfirmed.
    #[serde(default = "default_stop_poll_attempts")]
    pub stop_poll_attempts: u32,
    #[serde(default)]
    pub restart_cadence: RestartCadence,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("reconnect_attempts", &self.reconnect_attempts)
            .field("enable_conn_notif", &self.enable_conn_notif)
            .field("first_load", &self.first_load)
            .field("reconnect_delay_ms", &self.reconnect_delay_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("stop_poll_interval_ms", &self.stop_poll_interval_ms)
            .field("stop_poll_attempts", &self.stop_poll_attempts)
            .field("restart_cadence", &self.restart_cadence)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    4455
}
fn default_reconnect_attempts() -> u32 {
    5
}
fn default_true() -> bool {
    true
}
fn default_connect_message() -> String {
    "OBS is connected, and ready to go!".to_string()
}
fn default_disconnect_message() -> String {
    "Whoops, OBS got disconnected! Check if it's started.".to_string()
}
fn default_reconnect_delay_ms() -> u64 {
    1000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_stop_poll_interval_ms() -> u64 {
    250
}
fn default_stop_poll_attempts() -> u32 {
    40
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: String::new(),
            reconnect_attempts: default_reconnect_attempts(),
            enable_conn_notif: default_true(),
            conn_notif_message_connect: default_connect_message(),
            conn_notif_message_disconnect: default_disconnect_message(),
            first_load: default_true(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            stop_poll_interval_ms: default_stop_poll_interval_ms(),
            stop_poll_attempts: default_stop_poll_attempts(),
            restart_cadence: RestartCadence::default(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// `ws://host:port` for the configured server. IPv6 literals are
    /// bracketed so the port stays unambiguous.
    pub fn websocket_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("ws://[{}]:{}", self.host, self.port)
        } else {
            format!("ws://{}:{}", self.host, self.port)
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads [`AppConfig`] from the platform path, or defaults if absent.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Persists `config` at the platform path.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Loads [`AppConfig`] from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("ValleyCast"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("valleycast"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("ValleyCast")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("valleycast-test-{}", Uuid::new_v4()))
            .join("config.toml")
    }

    #[test]
    fn test_app_config_default_matches_obs_defaults() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 4455);
        assert!(cfg.password.is_empty());
        assert_eq!(cfg.reconnect_attempts, 5);
        assert_eq!(cfg.restart_cadence, RestartCadence::Never);
        assert_eq!(cfg.websocket_url(), "ws://localhost:4455");
    }

    #[test]
    fn test_websocket_url_brackets_ipv6_host() {
        // Arrange
        let mut cfg = AppConfig { host: "::1".to_string(), ..AppConfig::default() };

        // Act / Assert
        assert_eq!(cfg.websocket_url(), "ws://[::1]:4455");

        cfg.host = "[fe80::1]".to_string();
        assert_eq!(cfg.websocket_url(), "ws://[fe80::1]:4455");

        cfg.host = "192.168.1.20".to_string();
        cfg.port = 4460;
        assert_eq!(cfg.websocket_url(), "ws://192.168.1.20:4460");
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_toml_overrides_only_given_fields() {
        // Arrange
        let toml_str = r#"
host = "192.168.1.20"
restart_cadence = "weekly"
enable_conn_notif = false
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.host, "192.168.1.20");
        assert_eq!(cfg.restart_cadence, RestartCadence::Weekly);
        assert!(!cfg.enable_conn_notif);
        assert_eq!(cfg.port, 4455);
        assert_eq!(cfg.stop_poll_attempts, 40);
    }

    #[test]
    fn test_deserialize_unknown_cadence_is_parse_error() {
        let result: Result<AppConfig, toml::de::Error> =
            toml::from_str(r#"restart_cadence = "hourly""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_output_redacts_password() {
        let cfg = AppConfig {
            password: "hunter2".to_string(),
            ..AppConfig::default()
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = scratch_path();
        let cfg = load_config_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trips_through_disk() {
        // Arrange
        let path = scratch_path();
        let cfg = AppConfig {
            host: "obs.lan".to_string(),
            port: 4460,
            password: "pässwörd".to_string(),
            first_load: false,
            restart_cadence: RestartCadence::Monthly,
            ..AppConfig::default()
        };

        // Act
        save_config_to(&path, &cfg).expect("save");
        let restored = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(restored, cfg);
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_load_config_from_malformed_file_is_parse_error() {
        let path = scratch_path();
        let dir = path.parent().unwrap().to_path_buf();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        let _ = std::fs::remove_dir_all(dir);
    }
}
