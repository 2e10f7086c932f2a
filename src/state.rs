// src/state.rs
use std::sync::Arc;

use crate::config::Config;
use crate::services::gemini::GeminiProvider;
use crate::services::provider::TextProvider;

pub type SharedState = Arc<AppState>;

/// Read-only for the lifetime of the process.
pub struct AppState {
    pub config: Config,
    pub provider: Arc<dyn TextProvider>,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn TextProvider>) -> Self {
        Self { config, provider }
    }

    /// State backed by the live Gemini API.
    pub fn with_gemini(config: Config) -> Self {
        Self::new(config, Arc::new(GeminiProvider::new()))
    }
}
