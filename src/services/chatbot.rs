// src/services/chatbot.rs
//! Maps whatever the provider does onto a displayable reply.

use std::time::Instant;

use crate::config::Config;
use crate::message::{ChatResponse, TestResponse};
use crate::services::provider::{
    Candidate, FinishReason, GenerationRequest, ProviderError, TextProvider,
};

/// Substituted when the provider returns nothing to show.
pub const SAFETY_APOLOGY: &str =
    "I'm unable to provide a response to that request due to content safety policies.";

/// Returned when the provider call itself failed. This is the inner-failure
/// apology; `TECHNICAL_DIFFICULTY_APOLOGY` is reserved for unreadable requests.
pub const UPSTREAM_APOLOGY: &str = "I'm sorry, but I encountered an issue processing your request. This may be due to content safety policies or technical limitations.";

/// Returned when the request never made it to the provider.
pub const TECHNICAL_DIFFICULTY_APOLOGY: &str = "I apologize, but I'm having technical difficulties processing your request. Please try again with a different query.";

pub const TEST_PROMPT: &str = "Hello, are you working properly?";
pub const TEST_FILTERED_REPLY: &str =
    "I'm functioning correctly, but this test response was filtered.";

pub const NOT_CONFIGURED: &str = "Gemini API key not configured";

#[derive(Debug)]
pub enum ChatOutcome {
    /// The first candidate carried at least one content part.
    Reply { text: String, filtered: bool },
    /// No candidate, or a candidate without parts.
    Empty {
        filtered: bool,
        finish_reason: Option<FinishReason>,
    },
    UpstreamError(ProviderError),
}

impl ChatOutcome {
    pub fn from_candidates(candidates: &[Candidate]) -> Self {
        let first = candidates.first();
        // Independent of whether any text came back.
        let filtered = first.is_some_and(Candidate::is_safety_filtered);

        match first.and_then(Candidate::first_part) {
            Some(text) => ChatOutcome::Reply {
                text: text.to_string(),
                filtered,
            },
            None => ChatOutcome::Empty {
                filtered,
                finish_reason: first.and_then(|c| c.finish_reason.clone()),
            },
        }
    }

    pub fn into_response(self, model: &str) -> ChatResponse {
        match self {
            ChatOutcome::Reply { text, filtered } => ChatResponse {
                response: text,
                model: model.to_string(),
                filtered: Some(filtered),
                error: None,
            },
            ChatOutcome::Empty { filtered, .. } => ChatResponse {
                response: SAFETY_APOLOGY.to_string(),
                model: model.to_string(),
                filtered: Some(filtered),
                error: None,
            },
            ChatOutcome::UpstreamError(e) => ChatResponse {
                response: UPSTREAM_APOLOGY.to_string(),
                model: model.to_string(),
                filtered: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Apology for a request that could not even be read.
pub fn technical_difficulty(model: &str, error: impl Into<String>) -> ChatResponse {
    ChatResponse {
        response: TECHNICAL_DIFFICULTY_APOLOGY.to_string(),
        model: model.to_string(),
        filtered: None,
        error: Some(error.into()),
    }
}

fn generation_request<'a>(config: &'a Config, api_key: &'a str) -> GenerationRequest<'a> {
    GenerationRequest {
        api_key,
        model: &config.model,
        generation: &config.generation,
        safety_settings: &config.safety_settings,
    }
}

pub async fn generate_reply(
    provider: &dyn TextProvider,
    config: &Config,
    api_key: &str,
    prompt: &str,
) -> ChatOutcome {
    let started = Instant::now();
    let preview: String = prompt.chars().take(50).collect();
    tracing::info!(preview = %preview, "Processing chat request");

    let candidates = match provider
        .generate(prompt, &generation_request(config, api_key))
        .await
    {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!(error = %e, "Error during Gemini model inference");
            return ChatOutcome::UpstreamError(e);
        }
    };

    let outcome = ChatOutcome::from_candidates(&candidates);
    if let ChatOutcome::Empty { finish_reason, .. } = &outcome {
        tracing::info!(?finish_reason, "No valid response text");
    }
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Generated response"
    );
    outcome
}

/// Fire the canned prompt and report whether the provider answered.
pub async fn run_self_test(provider: &dyn TextProvider, config: &Config) -> TestResponse {
    let Some(api_key) = config.api_key.as_deref() else {
        return TestResponse {
            success: false,
            model: None,
            response: None,
            error: Some(NOT_CONFIGURED.to_string()),
        };
    };

    match provider
        .generate(TEST_PROMPT, &generation_request(config, api_key))
        .await
    {
        Ok(candidates) => {
            let text = match ChatOutcome::from_candidates(&candidates) {
                ChatOutcome::Reply { text, .. } => text,
                _ => TEST_FILTERED_REPLY.to_string(),
            };
            TestResponse {
                success: true,
                model: Some(config.model.clone()),
                response: Some(text),
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Error testing Gemini connection");
            TestResponse {
                success: false,
                model: None,
                response: None,
                error: Some(e.to_string()),
            }
        }
    }
}
