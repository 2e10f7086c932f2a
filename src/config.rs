// src/config.rs
use std::path::{Path, PathBuf};

use crate::services::provider::{GenerationSettings, SafetySetting, default_safety_settings};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_PORT: u16 = 8095;
pub const MAX_PORT_ATTEMPTS: u16 = 5;

/// Recognised credential variables, in priority order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Candidate `.env` locations; only the first one that exists is loaded.
pub const ENV_FILE_CANDIDATES: [&str; 3] = [".env", "backend_new/.env", "backend/.env"];

/// Runtime configuration, built once at startup.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub host: String,
    pub port: u16,
    pub max_port_attempts: u16,
    pub generation: GenerationSettings,
    pub safety_settings: Vec<SafetySetting>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_port_attempts", &self.max_port_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_port_attempts: MAX_PORT_ATTEMPTS,
            generation: GenerationSettings::default(),
            safety_settings: default_safety_settings(),
        }
    }
}

impl Config {
    /// Load the first `.env` candidate under the working directory, then read
    /// the process environment.
    pub fn load() -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            if let Some(path) = load_env_file(&cwd) {
                tracing::info!(path = %path.display(), "Loaded environment file");
            }
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());

        let model = lookup("GEMINI_MODEL")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or(defaults.model);

        let host = lookup("HOST")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Ignoring invalid PORT");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Self {
            api_key,
            model,
            host,
            port,
            ..defaults
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Find the first existing `.env` candidate under `base` and load it.
///
/// Read or parse failures are swallowed; the key then simply counts as not
/// configured. Variables already set in the process win over file values.
pub fn load_env_file(base: &Path) -> Option<PathBuf> {
    let path = find_env_file(base)?;
    match dotenvy::from_path(&path) {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Could not load environment file");
            None
        }
    }
}

pub fn find_env_file(base: &Path) -> Option<PathBuf> {
    ENV_FILE_CANDIDATES
        .iter()
        .map(|candidate| base.join(candidate))
        .find(|path| path.is_file())
}
