use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::{SOCKET_PATH, STATE_FILE};
use crate::core::location::Accuracy;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub location: LocationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DaemonConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingConfig {
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    #[serde(default = "default_position_timeout")]
    pub position_timeout_ms: u64,

    #[serde(default = "default_max_age")]
    pub max_age_ms: u64,

    #[serde(default)]
    pub accuracy: Accuracy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    #[default]
    Gpsd,
    Fixed,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub source: LocationSource,

    #[serde(default = "default_gpsd_addr")]
    pub gpsd_addr: String,

    #[serde(default = "default_true")]
    pub allow_foreground: bool,

    #[serde(default = "default_true")]
    pub allow_background: bool,

    #[serde(default)]
    pub fixed_latitude: f64,

    #[serde(default)]
    pub fixed_longitude: f64,
}

impl Settings {
    /// Load settings from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settings.toml")
    }
}

impl TrackingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn position_timeout(&self) -> Duration {
        Duration::from_millis(self.position_timeout_ms)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            socket_path: default_socket_path(),
            state_file: default_state_file(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            position_timeout_ms: default_position_timeout(),
            max_age_ms: default_max_age(),
            accuracy: Accuracy::default(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::default(),
            gpsd_addr: default_gpsd_addr(),
            allow_foreground: true,
            allow_background: true,
            fixed_latitude: 0.0,
            fixed_longitude: 0.0,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(SOCKET_PATH)
}

fn default_state_file() -> PathBuf {
    PathBuf::from(STATE_FILE)
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_interval() -> u64 {
    15_000
}

fn default_position_timeout() -> u64 {
    30_000
}

fn default_max_age() -> u64 {
    10_000
}

fn default_gpsd_addr() -> String {
    "127.0.0.1:2947".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_use_defaults() {
        let s = Settings::parse("").unwrap();
        assert_eq!(s.tracking.interval(), Duration::from_secs(15));
        assert_eq!(s.tracking.position_timeout(), Duration::from_secs(30));
        assert_eq!(s.tracking.max_age(), Duration::from_secs(10));
        assert_eq!(s.tracking.accuracy, Accuracy::High);
        assert_eq!(s.location.source, LocationSource::Gpsd);
        assert_eq!(s.daemon.socket_path, PathBuf::from(SOCKET_PATH));
    }

    #[test]
    fn test_parse_settings() {
        let input = r#"
[daemon]
log_level = "debug"
state_file = "/tmp/geotrack-state.toml"

[server]
base_url = "https://tracker.example.org/api"

[tracking]
interval_ms = 5000
accuracy = "balanced"

[location]
source = "fixed"
allow_background = false
fixed_latitude = 59.3293
fixed_longitude = 18.0686
"#;
        let s = Settings::parse(input).unwrap();
        assert_eq!(s.daemon.log_level, "debug");
        assert_eq!(s.server.base_url, "https://tracker.example.org/api");
        assert_eq!(s.server.request_timeout_ms, 10_000);
        assert_eq!(s.tracking.interval_ms, 5000);
        assert_eq!(s.tracking.position_timeout_ms, 30_000);
        assert_eq!(s.tracking.accuracy, Accuracy::Balanced);
        assert_eq!(s.location.source, LocationSource::Fixed);
        assert!(s.location.allow_foreground);
        assert!(!s.location.allow_background);
        assert_eq!(s.location.fixed_latitude, 59.3293);
    }

    #[test]
    fn test_shipped_settings_parse() {
        let s = Settings::parse(include_str!("../../../config/settings.toml")).unwrap();
        assert_eq!(s.server.base_url, "http://127.0.0.1:8080");
        assert_eq!(s.tracking.interval_ms, 15_000);
        assert_eq!(s.location.gpsd_addr, "127.0.0.1:2947");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(dir.path().join("settings.toml")).is_err());
    }

    #[test]
    fn test_rejects_unknown_source() {
        assert!(Settings::parse("[location]\nsource = \"wifi\"\n").is_err());
    }
}
