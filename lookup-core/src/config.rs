use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};

use crate::debounce::DEFAULT_DEBOUNCE;
use crate::query::{
    DEFAULT_FORECAST_COUNT, DEFAULT_LANGUAGE, DEFAULT_LIMIT, DEFAULT_UNITS, Endpoints,
    OPENWEATHER_BASE_URL,
};

/// Environment variable that takes precedence over the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// How requests are shaped and how fast the search reacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// "metric", "imperial" or "standard".
    pub units: String,
    pub language: String,
    pub forecast_count: u32,
    pub geocoding_limit: u32,
    pub debounce_ms: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            units: DEFAULT_UNITS.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            forecast_count: DEFAULT_FORECAST_COUNT,
            geocoding_limit: DEFAULT_LIMIT,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub base_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: OPENWEATHER_BASE_URL.to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// api_key = "..."
///
/// [preferences]
/// units = "imperial"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub endpoints: EndpointConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-lookup", "weather-lookup")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    /// API key from the environment, falling back to the stored one.
    pub fn api_key(&self) -> Result<String> {
        let from_env = env::var(API_KEY_ENV).ok();
        self.resolve_api_key(from_env)
    }

    fn resolve_api_key(&self, from_env: Option<String>) -> Result<String> {
        from_env
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|key| !key.trim().is_empty()))
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured.\n\
                     Hint: run `weather-lookup configure` or set {API_KEY_ENV}."
                )
            })
    }

    pub fn endpoints(&self) -> Result<Endpoints> {
        let base = Url::parse(&self.endpoints.base_url)
            .with_context(|| format!("Invalid endpoint base URL: {}", self.endpoints.base_url))?;

        Ok(Endpoints::new(base))
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.preferences.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.resolve_api_key(None).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No API key configured"));
        assert!(msg.contains("Hint: run `weather-lookup configure`"));
    }

    #[test]
    fn environment_key_overrides_stored_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("STORED".into());

        assert_eq!(cfg.resolve_api_key(None).unwrap(), "STORED");
        assert_eq!(cfg.resolve_api_key(Some("FROM_ENV".into())).unwrap(), "FROM_ENV");
        assert_eq!(cfg.resolve_api_key(Some("  ".into())).unwrap(), "STORED");
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let cfg = Config::from_toml(
            r#"
            api_key = "KEY"

            [preferences]
            units = "imperial"
            "#,
        )
        .expect("config must parse");

        assert_eq!(cfg.api_key.as_deref(), Some("KEY"));
        assert_eq!(cfg.preferences.units, "imperial");
        assert_eq!(cfg.preferences.language, "EN");
        assert_eq!(cfg.preferences.forecast_count, 3);
        assert_eq!(cfg.debounce_delay(), Duration::from_millis(700));
        assert_eq!(cfg.endpoints().unwrap(), Endpoints::default());
    }

    #[test]
    fn toml_roundtrip_keeps_preferences() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.preferences.geocoding_limit = 3;
        cfg.endpoints.base_url = "http://127.0.0.1:8080/owm".into();

        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), cfg);
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let mut cfg = Config::default();
        cfg.endpoints.base_url = "not a url".into();

        let err = cfg.endpoints().unwrap_err();
        assert!(err.to_string().contains("Invalid endpoint base URL"));
    }
}
