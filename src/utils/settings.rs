//! Settings file fallback for environment variables.
//!
//! Values are read from the process environment first and then from the
//! `env` map of `$HOME/.forkscope/settings.json`.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Environment variable holding the access token.
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Environment variable holding the organization login.
pub const ORG_VAR: &str = "GITHUB_ORG";

/// Environment variable holding the API root.
pub const API_URL_VAR: &str = "GITHUB_API_URL";

/// Settings loaded from `$HOME/.forkscope/settings.json`.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Fallback values keyed by environment variable name.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Settings {
    /// Loads settings from the default location; a missing file yields empty settings.
    pub fn load() -> Result<Self> {
        let settings_path = Self::settings_path()?;
        Self::load_from_path(&settings_path)
    }

    /// Loads settings from `path`; a missing file yields empty settings.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No settings file");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        serde_json::from_str::<Self>(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Default settings path.
    pub fn settings_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home_dir.join(".forkscope").join("settings.json"))
    }

    /// Returns `key` from the environment, else from the settings file. Blank values count as unset.
    pub fn get_env_var(&self, key: &str) -> Option<String> {
        env::var(key)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                self.env
                    .get(key)
                    .filter(|v| !v.trim().is_empty())
                    .cloned()
            })
    }

    /// Access token, if configured.
    pub fn token(&self) -> Option<String> {
        self.get_env_var(TOKEN_VAR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn settings_load_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.json");
        fs::write(
            &settings_path,
            r#"{ "env": { "FORKSCOPE_TEST_ORG": "acme", "GITHUB_API_URL": "https://ghe.example.com/api/v3" } }"#,
        )
        .unwrap();

        let settings = Settings::load_from_path(&settings_path).unwrap();

        assert_eq!(settings.env.get("FORKSCOPE_TEST_ORG").unwrap(), "acme");
        assert_eq!(
            settings.env.get(API_URL_VAR).unwrap(),
            "https://ghe.example.com/api/v3"
        );
    }

    #[test]
    fn missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from_path(temp_dir.path().join("absent.json")).unwrap();
        assert!(settings.env.is_empty());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.json");
        fs::write(&settings_path, "{ not json").unwrap();

        let err = Settings::load_from_path(&settings_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings file"));
    }

    #[test]
    fn environment_takes_precedence() {
        let mut settings = Settings::default();
        let _ = settings
            .env
            .insert("FORKSCOPE_TEST_PRECEDENCE".to_string(), "from-file".to_string());
        let _ = settings
            .env
            .insert("FORKSCOPE_TEST_BLANK".to_string(), "  ".to_string());

        env::set_var("FORKSCOPE_TEST_PRECEDENCE", "from-env");
        assert_eq!(
            settings.get_env_var("FORKSCOPE_TEST_PRECEDENCE").as_deref(),
            Some("from-env")
        );

        env::remove_var("FORKSCOPE_TEST_PRECEDENCE");
        assert_eq!(
            settings.get_env_var("FORKSCOPE_TEST_PRECEDENCE").as_deref(),
            Some("from-file")
        );
        assert_eq!(settings.get_env_var("FORKSCOPE_TEST_BLANK"), None);
    }
}
