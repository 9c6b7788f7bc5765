use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Value shipped in the sample config; treated the same as an unset relay URL.
pub const RELAY_URL_PLACEHOLDER: &str = "YOUR_RELAY_URL_HERE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    // Client side: where the chat window posts transcripts
    #[serde(default)]
    pub relay_url: Option<String>,

    // Relay side
    #[serde(default = "default_relay_bind")]
    pub relay_bind: String,
    #[serde(default = "default_upstream_api_url")]
    pub upstream_api_url: String,
    #[serde(default)]
    pub upstream_api_key: Option<String>,

    // Local profile storage
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_relay_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_upstream_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("beauty_advisor").join("profile.db"))
        .unwrap_or_else(|| PathBuf::from("beauty_advisor_profile.db"))
        .to_string_lossy()
        .into_owned()
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            relay_bind: default_relay_bind(),
            upstream_api_url: default_upstream_api_url(),
            upstream_api_key: None,
            database_path: default_database_path(),
        }
    }
}

impl AdvisorConfig {
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Path to `beauty_advisor.toml`, next to the executable.
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join("beauty_advisor.toml")
    }

    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file(&Self::config_path());
        config.apply_env();
        config
    }

    /// Parse a config file without environment overrides. Missing or invalid
    /// files yield defaults.
    pub fn from_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AdvisorConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to parse {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::warn!("No config file found, using defaults + env vars");
                Self::default()
            }
        }
    }

    /// Defaults plus the relay URL placeholder, for a first-run config file.
    pub fn starter() -> Self {
        Self {
            relay_url: Some(RELAY_URL_PLACEHOLDER.to_string()),
            ..Self::default()
        }
    }

    /// Write a starter config next to the executable unless one exists.
    /// Returns whether a file was written.
    pub fn ensure_config_file() -> Result<bool> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(false);
        }
        Self::starter().save()?;
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty("ADVISOR_RELAY_URL") {
            self.relay_url = Some(url);
        }

        if let Some(bind) = non_empty("ADVISOR_RELAY_BIND") {
            self.relay_bind = bind;
        }

        if let Some(url) = non_empty("ADVISOR_UPSTREAM_URL") {
            self.upstream_api_url = url;
        }

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.upstream_api_key = Some(key);
        }

        if let Some(path) = non_empty("ADVISOR_DATABASE_PATH") {
            self.database_path = path;
        }
    }

    /// The relay endpoint, or `None` when it is unset, blank, or the placeholder.
    pub fn relay_endpoint(&self) -> Option<&str> {
        self.relay_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty() && *url != RELAY_URL_PLACEHOLDER)
    }
}
