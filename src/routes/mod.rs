// src/routes/mod.rs
pub mod chat;
pub mod health;

use std::time::Duration;

use crate::state::SharedState;
use axum::{
    Router,
    routing::{get, post},
};
use chat::{chat_handler, chat_panic_response, test_handler};
use health::{health_handler, root_handler};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

pub fn create_app(state: SharedState) -> Router {
    let model = state.config.model.clone();
    let catch_panic = CatchPanicLayer::custom(move |panic: Box<dyn std::any::Any + Send + 'static>| {
        chat_panic_response(&model, panic)
    });

    Router::new()
        .route("/", get(root_handler))
        .route("/chat", post(chat_handler).layer(catch_panic))
        .route("/health", get(health_handler))
        .route("/test", get(test_handler))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin, method and header; preflight cached for a day.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
        .max_age(PREFLIGHT_MAX_AGE)
}
