use crate::domain::curves::DEFAULT_SCROLL_BOOST;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "hid_relay_bridge".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// User-tunable pointer and wheel feel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapingSettings {
    #[serde(default = "default_sensitivity")]
    pub mouse_sensitivity: f64,
    /// Per-16ms decay ratio of the scroll remainder
    #[serde(default = "default_scroll_decay")]
    pub scroll_decay: f64,
    #[serde(default = "default_scroll_boost")]
    pub scroll_boost: f64,
}

impl Default for ShapingSettings {
    fn default() -> Self {
        Self {
            mouse_sensitivity: default_sensitivity(),
            scroll_decay: default_scroll_decay(),
            scroll_boost: default_scroll_boost(),
        }
    }
}

impl ShapingSettings {
    /// Replace out-of-range values with their defaults
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            mouse_sensitivity: if self.mouse_sensitivity.is_finite() && self.mouse_sensitivity > 0.0
            {
                self.mouse_sensitivity
            } else {
                defaults.mouse_sensitivity
            },
            scroll_decay: if self.scroll_decay > 0.0 && self.scroll_decay <= 1.0 {
                self.scroll_decay
            } else {
                defaults.scroll_decay
            },
            scroll_boost: if self.scroll_boost.is_finite() && self.scroll_boost >= 1.0 {
                self.scroll_boost
            } else {
                defaults.scroll_boost
            },
        }
    }
}

fn default_sensitivity() -> f64 {
    2.0
}
fn default_scroll_decay() -> f64 {
    0.95
}
fn default_scroll_boost() -> f64 {
    DEFAULT_SCROLL_BOOST
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub shaping: ShapingSettings,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,

    // Burst paste pacing
    #[serde(default = "default_burst_delay_ms")]
    pub burst_char_delay_ms: u64,

    // Relay BLE identifiers, consumed by the link layer
    #[serde(default = "default_device_prefix")]
    pub ble_device_name_prefix: String,
    #[serde(default = "default_service_uuid")]
    pub ble_service_uuid: String,
    #[serde(default = "default_mouse_uuid")]
    pub ble_mouse_char_uuid: String,
    #[serde(default = "default_key_uuid")]
    pub ble_key_char_uuid: String,
    #[serde(default = "default_ota_uuid")]
    pub ble_ota_char_uuid: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shaping: ShapingSettings::default(),
            log_settings: LogSettings::default(),
            burst_char_delay_ms: default_burst_delay_ms(),
            ble_device_name_prefix: default_device_prefix(),
            ble_service_uuid: default_service_uuid(),
            ble_mouse_char_uuid: default_mouse_uuid(),
            ble_key_char_uuid: default_key_uuid(),
            ble_ota_char_uuid: default_ota_uuid(),
        }
    }
}

fn default_burst_delay_ms() -> u64 {
    75
}
fn default_device_prefix() -> String {
    "XIAO-".to_string()
}
fn default_service_uuid() -> String {
    crate::infrastructure::bluetooth::protocol::SERVICE_UUID.to_string()
}
fn default_mouse_uuid() -> String {
    crate::infrastructure::bluetooth::protocol::MOUSE_CHAR_UUID.to_string()
}
fn default_key_uuid() -> String {
    crate::infrastructure::bluetooth::protocol::KEY_CHAR_UUID.to_string()
}
fn default_ota_uuid() -> String {
    crate::infrastructure::bluetooth::protocol::OTA_CHAR_UUID.to_string()
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Load from an explicit path, falling back to defaults
    pub fn with_path(settings_path: PathBuf) -> Self {
        let mut settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                if settings_path.exists() {
                    warn!("Ignoring unreadable settings at {:?}: {}", settings_path, e);
                }
                Settings::default()
            }
        };
        settings.shaping = settings.shaping.sanitized();

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("HidRelayBridge");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn update_shaping(&mut self, shaping: ShapingSettings) -> anyhow::Result<()> {
        self.settings.shaping = shaping.sanitized();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "hid_relay_bridge_{}_{}.json",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);
        let service = SettingsService::with_path(path);
        assert_eq!(service.get().shaping, ShapingSettings::default());
        assert_eq!(service.get().burst_char_delay_ms, 75);
        assert_eq!(service.get().ble_device_name_prefix, "XIAO-");
    }

    #[test]
    fn test_partial_json_fills_defaults_and_sanitizes() {
        let path = temp_path("partial");
        fs::write(
            &path,
            r#"{"shaping":{"mouse_sensitivity":-1.0,"scroll_decay":0.9}}"#,
        )
        .unwrap();
        let service = SettingsService::with_path(path.clone());
        let shaping = service.get().shaping;
        assert_eq!(shaping.mouse_sensitivity, 2.0);
        assert_eq!(shaping.scroll_decay, 0.9);
        assert_eq!(shaping.scroll_boost, DEFAULT_SCROLL_BOOST);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_save_round_trip() {
        let path = temp_path("roundtrip");
        let mut service = SettingsService::with_path(path.clone());
        service
            .update_shaping(ShapingSettings {
                mouse_sensitivity: 3.5,
                scroll_decay: 0.8,
                scroll_boost: 2.0,
            })
            .unwrap();

        let reloaded = SettingsService::with_path(path.clone());
        assert_eq!(reloaded.get().shaping.mouse_sensitivity, 3.5);
        assert_eq!(reloaded.get().shaping.scroll_decay, 0.8);
        let _ = fs::remove_file(&path);
    }
}
