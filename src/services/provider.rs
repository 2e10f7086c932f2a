// src/services/provider.rs
//! Provider capability interface.
//!
//! The chat handlers only ever talk to a `TextProvider`, so the live Gemini
//! client can be swapped for a stub in tests.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Error type for upstream provider calls.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Reason the provider stopped generating a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    /// Output was suppressed by the content-safety filter.
    Safety,
    Recitation,
    Other(String),
}

impl FinishReason {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// One generated reply option.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    /// Text of each content part, in order. Non-text parts carry an empty string.
    pub parts: Vec<String>,
    pub finish_reason: Option<FinishReason>,
}

impl Candidate {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![text.into()],
            finish_reason: Some(FinishReason::Stop),
        }
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    pub fn first_part(&self) -> Option<&str> {
        self.parts.first().map(String::as_str)
    }

    pub fn is_safety_filtered(&self) -> bool {
        self.finish_reason == Some(FinishReason::Safety)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_p: f32,
    /// Zero means "let the provider decide" and is not sent.
    #[serde(skip_serializing_if = "is_zero")]
    pub top_k: u32,
    pub max_output_tokens: u32,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 0,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Blocks medium-and-above severity for every harm category we care about.
pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category: category.to_string(),
        threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
    })
    .collect()
}

/// Everything a provider needs besides the prompt itself.
#[derive(Clone)]
pub struct GenerationRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub generation: &'a GenerationSettings,
    pub safety_settings: &'a [SafetySetting],
}

impl std::fmt::Debug for GenerationRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("model", &self.model)
            .field("generation", &self.generation)
            .field("safety_settings", &self.safety_settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Run one generation and return the provider's candidates untouched.
    async fn generate(
        &self,
        prompt: &str,
        request: &GenerationRequest<'_>,
    ) -> Result<Vec<Candidate>, ProviderError>;
}
