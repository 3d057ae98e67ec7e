//! The persisted settings record (`shared_assets/settings.json`).
//!
//! The file is shared with other tools, so unknown keys are kept on a
//! load/save round trip and missing keys fall back to defaults.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::StripcutError;

/// Environment variable that overrides the settings file location.
pub const SETTINGS_ENV_VAR: &str = "STRIPCUT_SETTINGS";

/// Default settings location, relative to the current directory.
pub const DEFAULT_SETTINGS_PATH: &str = "shared_assets/settings.json";

/// Process-wide settings, loaded once per invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_work_dir")]
    pub default_work_dir: String,

    #[serde(default)]
    pub ai_config: AiConfig,

    /// Keys written by other tools; preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// OpenAI-compatible endpoint settings used by the title translator.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "placeholder_api_key")]
    pub api_key: String,
    #[serde(default = "placeholder_base_url")]
    pub base_url: String,
    #[serde(default = "placeholder_model_name")]
    pub model_name: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: placeholder_api_key(),
            base_url: placeholder_base_url(),
            model_name: placeholder_model_name(),
        }
    }
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.masked_api_key())
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl AiConfig {
    /// The API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}

fn default_work_dir() -> String {
    home_dir()
        .map(|home| home.join("Downloads").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string())
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn placeholder_api_key() -> String {
    "YOUR_API_KEY".to_string()
}

fn placeholder_base_url() -> String {
    "YOUR_API_BASE_URL".to_string()
}

fn placeholder_model_name() -> String {
    "YOUR_MODEL_NAME".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_work_dir: default_work_dir(),
            ai_config: AiConfig::default(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Load settings from `path`.
    ///
    /// A missing file yields defaults. A malformed file also yields
    /// defaults, with a warning, so one broken file never blocks a batch.
    pub fn load(path: &Path) -> Result<Self, StripcutError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file not found, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(StripcutError::io_at(path, err)),
        };

        match Self::from_json_str(&contents, path) {
            Ok(settings) => Ok(settings),
            Err(err) => {
                warn!("{err}; falling back to default settings");
                Ok(Self::default())
            }
        }
    }

    /// Parse settings from a JSON string. `origin` is only used in errors.
    pub fn from_json_str(contents: &str, origin: &Path) -> Result<Self, StripcutError> {
        serde_json::from_str(contents).map_err(|source| StripcutError::SettingsParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Parse settings from raw bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, StripcutError> {
        serde_json::from_slice(bytes).map_err(|source| StripcutError::SettingsParse {
            path: PathBuf::from("<memory>"),
            source,
        })
    }

    /// Write settings as pretty JSON, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), StripcutError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| StripcutError::io_at(parent, err))?;
        }

        let json =
            serde_json::to_string_pretty(self).map_err(|source| StripcutError::SettingsWrite {
                path: path.to_path_buf(),
                source,
            })?;

        fs::write(path, json + "\n").map_err(|err| StripcutError::io_at(path, err))
    }

    /// The directory used when no root is given on the command line.
    pub fn work_dir(&self) -> PathBuf {
        if self.default_work_dir.trim().is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.default_work_dir)
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "default_work_dir: {}", self.default_work_dir)?;
        writeln!(f, "ai_config:")?;
        writeln!(f, "  api_key:    {}", self.ai_config.masked_api_key())?;
        writeln!(f, "  base_url:   {}", self.ai_config.base_url)?;
        writeln!(f, "  model_name: {}", self.ai_config.model_name)?;
        for key in self.extra.keys() {
            writeln!(f, "{key}: (preserved)")?;
        }
        Ok(())
    }
}

/// Resolve the settings file location.
///
/// Precedence: explicit path, then `STRIPCUT_SETTINGS`, then
/// `shared_assets/settings.json` in the current directory.
pub fn resolve_settings_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match env::var_os(SETTINGS_ENV_VAR) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_SETTINGS_PATH),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let settings =
            Settings::from_json_str(r#"{"default_work_dir": "/data/comics"}"#, Path::new("s.json"))
                .unwrap();
        assert_eq!(settings.default_work_dir, "/data/comics");
        assert_eq!(settings.ai_config, AiConfig::default());
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let json = r#"{
            "default_work_dir": "/w",
            "ai_config": {"api_key": "sk-abcdef", "base_url": "http://x", "model_name": "m"},
            "theme": "dark"
        }"#;
        let settings = Settings::from_json_str(json, Path::new("s.json")).unwrap();
        assert_eq!(settings.extra.get("theme"), Some(&Value::from("dark")));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        settings.save(&path).unwrap();
        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn malformed_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.ai_config, AiConfig::default());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert!(settings.extra.is_empty());
    }

    #[test]
    fn empty_work_dir_means_current_dir() {
        let settings = Settings {
            default_work_dir: "  ".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.work_dir(), PathBuf::from("."));
    }

    #[test]
    fn api_key_is_masked() {
        let ai = AiConfig {
            api_key: "sk-1234567890".to_string(),
            ..AiConfig::default()
        };
        assert_eq!(ai.masked_api_key(), "*********7890");
        assert!(!format!("{:?}", ai).contains("sk-12"));
    }

    #[test]
    fn explicit_settings_path_wins() {
        let path = resolve_settings_path(Some(Path::new("/tmp/custom.json")));
        assert_eq!(path, PathBuf::from("/tmp/custom.json"));
    }
}
