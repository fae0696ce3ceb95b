//! Shake and roll settings
//!
//! Settings are read once at startup and copied into the detector and the
//! arbiter; nothing mutates them at runtime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::motion::SHAKE_THRESHOLD;

/// Accelerometer update interval (ms)
pub const SENSOR_INTERVAL_MS: u64 = 100;

/// Minimum time between accepted shakes (ms)
pub const SHAKE_COOLDOWN_MS: u64 = 1000;

/// Intermediate values shown before a roll settles
pub const ROLL_STEPS: u32 = 5;

/// Delay between intermediate values (ms)
pub const ROLL_TICK_MS: u64 = 100;

const SETTINGS_FILE: &str = "settings.json";
const APP_DATA_FOLDER: &str = "ShakeDice";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShakeSettings {
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    #[serde(default = "default_sensor_interval_ms")]
    pub sensor_interval_ms: u64,

    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    #[serde(default = "default_roll_steps")]
    pub roll_steps: u32,

    #[serde(default = "default_roll_tick_ms")]
    pub roll_tick_ms: u64,

    /// Whether shake detection starts enabled
    #[serde(default = "default_shake_enabled")]
    pub shake_enabled: bool,
}

fn default_threshold() -> f32 {
    SHAKE_THRESHOLD
}
fn default_sensor_interval_ms() -> u64 {
    SENSOR_INTERVAL_MS
}
fn default_cooldown_ms() -> u64 {
    SHAKE_COOLDOWN_MS
}
fn default_roll_steps() -> u32 {
    ROLL_STEPS
}
fn default_roll_tick_ms() -> u64 {
    ROLL_TICK_MS
}
fn default_shake_enabled() -> bool {
    true
}

impl Default for ShakeSettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            sensor_interval_ms: default_sensor_interval_ms(),
            cooldown_ms: default_cooldown_ms(),
            roll_steps: default_roll_steps(),
            roll_tick_ms: default_roll_tick_ms(),
            shake_enabled: default_shake_enabled(),
        }
    }
}

impl ShakeSettings {
    pub fn sensor_interval(&self) -> Duration {
        Duration::from_millis(self.sensor_interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn roll_tick(&self) -> Duration {
        Duration::from_millis(self.roll_tick_ms)
    }

    /// Replace values the pipeline cannot work with by their defaults.
    pub fn sanitized(mut self) -> Self {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            warn!(
                "Invalid shake threshold {}, using {}",
                self.threshold, SHAKE_THRESHOLD
            );
            self.threshold = SHAKE_THRESHOLD;
        }
        if self.sensor_interval_ms == 0 {
            warn!("Sensor interval of 0 ms, using {SENSOR_INTERVAL_MS} ms");
            self.sensor_interval_ms = SENSOR_INTERVAL_MS;
        }
        if self.roll_steps == 0 {
            warn!("Roll step count of 0, using {ROLL_STEPS}");
            self.roll_steps = ROLL_STEPS;
        }
        self
    }

    /// Load settings from a JSON file, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(settings) => {
                info!("Loaded settings from {}", path.display());
                settings
            }
            Err(err) => {
                if path.exists() {
                    warn!("{err}; using default settings");
                }
                Self::default()
            }
        }
    }

    pub fn try_load_from(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let settings: ShakeSettings = serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse {}: {e}", path.display()))?;
        Ok(settings.sanitized())
    }

    /// Save settings as pretty JSON, creating parent folders.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to encode settings: {e}"))?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))
    }

    /// Per-platform location of the settings file
    pub fn default_path() -> Result<PathBuf, String> {
        #[cfg(target_os = "windows")]
        {
            if let Ok(local_app_data) = std::env::var("LOCALAPPDATA") {
                return Ok(PathBuf::from(local_app_data)
                    .join(APP_DATA_FOLDER)
                    .join(SETTINGS_FILE));
            }
            if let Ok(user_profile) = std::env::var("USERPROFILE") {
                return Ok(PathBuf::from(user_profile)
                    .join("AppData")
                    .join("Local")
                    .join(APP_DATA_FOLDER)
                    .join(SETTINGS_FILE));
            }
        }

        #[cfg(target_os = "macos")]
        {
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join(APP_DATA_FOLDER)
                    .join(SETTINGS_FILE));
            }
        }

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
                return Ok(PathBuf::from(data_home)
                    .join(APP_DATA_FOLDER)
                    .join(SETTINGS_FILE));
            }
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join(APP_DATA_FOLDER)
                    .join(SETTINGS_FILE));
            }
        }

        Err("Unable to determine settings path".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let settings = ShakeSettings::default();
        assert_eq!(settings.threshold, 1.78);
        assert_eq!(settings.sensor_interval(), Duration::from_millis(100));
        assert_eq!(settings.cooldown(), Duration::from_millis(1000));
        assert_eq!(settings.roll_steps, 5);
        assert_eq!(settings.roll_tick(), Duration::from_millis(100));
        assert!(settings.shake_enabled);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: ShakeSettings = serde_json::from_str(r#"{"threshold": 2.0}"#).unwrap();
        assert_eq!(settings.threshold, 2.0);
        assert_eq!(settings.cooldown_ms, SHAKE_COOLDOWN_MS);
        assert_eq!(settings.roll_steps, ROLL_STEPS);
    }

    #[test]
    fn test_sanitized_replaces_bad_values() {
        let settings = ShakeSettings {
            threshold: -1.0,
            sensor_interval_ms: 0,
            roll_steps: 0,
            ..ShakeSettings::default()
        }
        .sanitized();
        assert_eq!(settings.threshold, SHAKE_THRESHOLD);
        assert_eq!(settings.sensor_interval_ms, SENSOR_INTERVAL_MS);
        assert_eq!(settings.roll_steps, ROLL_STEPS);

        let nan = ShakeSettings {
            threshold: f32::NAN,
            ..ShakeSettings::default()
        }
        .sanitized();
        assert_eq!(nan.threshold, SHAKE_THRESHOLD);
    }
}
