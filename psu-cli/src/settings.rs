//! Persisted settings
//!
//! Two JSON files under the XDG config dir: `config.json` carries the
//! connection record plus simulation preferences, `protection.json` the
//! OVP/OCP defaults. The schemas belong to the core crates; this module
//! only moves them to and from disk. Missing or unreadable files fall
//! back to defaults.

use std::path::PathBuf;

use psu_device::ConnectionConfig;
use psu_monitor::ProtectionConfig;
use serde::{Deserialize, Serialize};

/// Contents of `config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Serial link parameters
    #[serde(flatten)]
    pub connection: ConnectionConfig,
    /// Start against the simulated backend instead of hardware
    pub simulation_mode: bool,
    /// Simulated load resistance in ohms
    pub load_resistance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            simulation_mode: false,
            load_resistance: psu_sim::DEFAULT_RESISTANCE,
        }
    }
}

/// Get the XDG config directory for psukit
/// Uses $XDG_CONFIG_HOME/psukit on Linux/macOS, falls back to ~/.config/psukit
fn config_dir() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config);
        if path.is_absolute() {
            return Some(path.join("psukit"));
        }
    }
    dirs::home_dir().map(|h| h.join(".config").join("psukit"))
}

fn settings_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.json"))
}

fn protection_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("protection.json"))
}

fn load_json<T: Default + for<'de> Deserialize<'de>>(path: Option<PathBuf>) -> T {
    path.and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn save_json<T: Serialize>(path: Option<PathBuf>, value: &T) -> Result<(), String> {
    let path = path.ok_or_else(|| "could not determine settings path".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create settings directory: {e}"))?;
    }
    let json =
        serde_json::to_string_pretty(value).map_err(|e| format!("failed to serialize: {e}"))?;
    std::fs::write(&path, json).map_err(|e| format!("failed to write {}: {e}", path.display()))
}

impl Settings {
    /// Load `config.json`, falling back to defaults
    pub fn load() -> Self {
        load_json(settings_path())
    }

    /// Save `config.json`
    pub fn save(&self) -> Result<(), String> {
        save_json(settings_path(), self)
    }
}

/// Load `protection.json`, falling back to defaults
pub fn load_protection() -> ProtectionConfig {
    load_json(protection_path())
}

/// Save `protection.json`
pub fn save_protection(config: &ProtectionConfig) -> Result<(), String> {
    save_json(protection_path(), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip_through_json() {
        let mut settings = Settings::default();
        settings.connection.address = "/dev/ttyS3".into();
        settings.connection.baud_rate = 115200;
        settings.simulation_mode = true;
        settings.load_resistance = 22.0;

        let json = serde_json::to_string_pretty(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_settings_schema_field_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        // Flattened connection record keeps the original key names
        assert_eq!(json["address"], "/dev/ttyUSB0");
        assert_eq!(json["baud_rate"], 19200);
        assert_eq!(json["timeout"], 5000);
        assert_eq!(json["parity"], "NONE");
        assert_eq!(json["stop_bits"], 1);
        assert_eq!(json["data_bits"], 8);
        assert_eq!(json["simulation_mode"], false);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"address": "COM4", "simulation_mode": true}"#).unwrap();
        assert_eq!(settings.connection.address, "COM4");
        assert_eq!(settings.connection.baud_rate, 19200);
        assert!(settings.simulation_mode);
    }

    #[test]
    fn test_protection_defaults_schema() {
        let json = serde_json::to_value(ProtectionConfig::default()).unwrap();
        assert_eq!(json["ovp_enabled"], false);
        assert_eq!(json["ovp_limit"], 30.0);
        assert_eq!(json["ocp_enabled"], false);
        assert_eq!(json["ocp_limit"], 3.0);
    }
}
