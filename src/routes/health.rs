use axum::{Json, extract::State};

use crate::{
    message::{HealthResponse, ModelInfo, ServiceInfo},
    state::SharedState,
};

/// Only reports whether a key is present; the key is never validated here.
pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let model_loaded = state.config.has_api_key();
    let model_info = model_loaded.then(|| ModelInfo {
        name: state.config.model.clone(),
        kind: "text".to_string(),
    });

    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded,
        model_info,
    })
}

pub async fn root_handler(State(state): State<SharedState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "running".to_string(),
        provider: "Google Gemini AI".to_string(),
        model: state.config.model.clone(),
        endpoints: ["/health", "/chat", "/test"]
            .into_iter()
            .map(String::from)
            .collect(),
    })
}
