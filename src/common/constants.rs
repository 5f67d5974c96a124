pub const SOCKET_PATH: &str = "/run/geotrack.sock";
pub const SETTINGS_FILE: &str = "/etc/geotrack/settings.toml";
pub const STATE_FILE: &str = "/var/lib/geotrack/state.toml";
pub const CONFIG_ENV: &str = "GEOTRACK_CONFIG";

/// Key under which the tracking flag is persisted.
pub const TRACKING_STATE_KEY: &str = "trackingState";
