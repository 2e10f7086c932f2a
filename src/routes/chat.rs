use std::any::Any;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    message::{ChatRequest, ChatResponse, TestResponse},
    services::chatbot::{self, NOT_CONFIGURED, generate_reply, run_self_test},
    state::SharedState,
};

/// Decode the body whatever its content type claims; only a JSON object is
/// accepted.
pub fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }
    serde_json::from_value(value)
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let config = &state.config;

    let payload = match parse_chat_request(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Error in chat endpoint");
            return Ok(Json(chatbot::technical_difficulty(
                &config.model,
                e.to_string(),
            )));
        }
    };

    let trimmed = payload.message.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }

    let Some(api_key) = config.api_key.as_deref() else {
        return Err(AppError::NotConfigured(NOT_CONFIGURED.to_string()));
    };

    // The untrimmed message is what the user typed; only blankness is checked.
    let outcome = generate_reply(state.provider.as_ref(), config, api_key, &payload.message).await;
    Ok(Json(outcome.into_response(&config.model)))
}

/// Turns a panic inside `/chat` into the same apology a malformed request gets.
pub fn chat_panic_response(model: &str, panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Chat handler panicked");
    Json(chatbot::technical_difficulty(model, detail)).into_response()
}

pub async fn test_handler(State(state): State<SharedState>) -> Json<TestResponse> {
    Json(run_self_test(state.provider.as_ref(), &state.config).await)
}
