use std::path::PathBuf;

use crate::common::{CONFIG_ENV, SETTINGS_FILE};

/// `$GEOTRACK_CONFIG` when set, otherwise the system-wide settings file.
pub fn settings_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => PathBuf::from(SETTINGS_FILE),
    }
}
