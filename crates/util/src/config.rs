//! Settings for the Formwright engine and CLI.
//!
//! Settings live in a small JSON file in the standard configuration directory
//! (`~/.config/formwright/settings.json` on most platforms). `FORMWRIGHT_CONFIG_PATH`
//! overrides the location. A missing file yields defaults; an unparsable file is
//! reported with a warning and also yields defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs_next::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Environment variable allowing callers to override the settings file path.
pub const SETTINGS_PATH_ENV: &str = "FORMWRIGHT_CONFIG_PATH";

/// Default filename for the JSON payload.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Error surfaced when reading or writing settings fails.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Artifact encoding used when persisting cleaned wizard data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Persisted settings values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Rows revealed per "load more" in table-mode arrays without their own page size.
    pub table_page_size: usize,
    /// Minimum spacing between coalesced change notifications.
    pub frame_interval_ms: u64,
    /// Query parameter carrying the current step id.
    pub step_query_param: String,
    /// Field id identifying a row's primary name; rows without it are pruned on save.
    pub primary_name_field: String,
    pub output_format: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table_page_size: 10,
            frame_interval_ms: 16,
            step_query_param: "step".to_string(),
            primary_name_field: "name".to_string(),
            output_format: OutputFormat::Yaml,
        }
    }
}

impl Settings {
    /// Loads settings from the default location.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&default_settings_path())
    }

    /// Loads settings from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(settings) => Ok(settings),
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        error = %error,
                        "Failed to parse settings file; using defaults"
                    );
                    Ok(Settings::default())
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(error) => Err(SettingsError::Io(error)),
        }
    }

    /// Writes the settings as pretty JSON, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Resolves the settings path, honoring [`SETTINGS_PATH_ENV`].
pub fn default_settings_path() -> PathBuf {
    if let Ok(path) = env::var(SETTINGS_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("formwright")
        .join(SETTINGS_FILE_NAME)
}

/// Expands a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    if trimmed == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let directory = tempdir().expect("temp dir");
        let settings = Settings::load_from(&directory.path().join("absent.json")).expect("load");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.frame_interval(), Duration::from_millis(16));
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let directory = tempdir().expect("temp dir");
        let path = directory.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{"table_page_size": 3, "output_format": "json"}"#).expect("write settings");

        let settings = Settings::load_from(&path).expect("load");
        assert_eq!(settings.table_page_size, 3);
        assert_eq!(settings.output_format, OutputFormat::Json);
        assert_eq!(settings.step_query_param, "step");
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let directory = tempdir().expect("temp dir");
        let path = directory.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "{ not json").expect("write settings");
        assert_eq!(Settings::load_from(&path).expect("load"), Settings::default());
    }

    #[test]
    fn save_round_trips_through_load() {
        let directory = tempdir().expect("temp dir");
        let path = directory.path().join("nested").join(SETTINGS_FILE_NAME);
        let settings = Settings {
            primary_name_field: "title".into(),
            ..Settings::default()
        };
        settings.save_to(&path).expect("save");
        assert_eq!(Settings::load_from(&path).expect("load"), settings);
    }

    #[test]
    fn environment_override_controls_path() {
        let directory = tempdir().expect("temp dir");
        let override_path = directory.path().join("custom.json");
        let override_text = override_path.to_string_lossy().to_string();
        temp_env::with_var(SETTINGS_PATH_ENV, Some(override_text.as_str()), || {
            assert_eq!(default_settings_path(), override_path);
        });
    }
}
