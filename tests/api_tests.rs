use gemini_relay::config::Config;
use gemini_relay::message::{ChatResponse, HealthResponse, ServiceInfo, TestResponse};
use gemini_relay::routes::create_app;
use gemini_relay::services::chatbot::{
    SAFETY_APOLOGY, TECHNICAL_DIFFICULTY_APOLOGY, TEST_FILTERED_REPLY, TEST_PROMPT,
    UPSTREAM_APOLOGY,
};
use gemini_relay::services::provider::{
    Candidate, FinishReason, GenerationRequest, ProviderError, TextProvider,
};
use gemini_relay::state::AppState;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use std::sync::Arc;
use std::sync::Mutex;
use tower::util::ServiceExt;

enum Reply {
    Candidates(Vec<Candidate>),
    Fail(&'static str),
    Panic(&'static str),
}

struct StubProvider {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl StubProvider {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextProvider for StubProvider {
    async fn generate(
        &self,
        prompt: &str,
        request: &GenerationRequest<'_>,
    ) -> Result<Vec<Candidate>, ProviderError> {
        assert_eq!(request.api_key, "test-key");
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Reply::Candidates(c) => Ok(c.clone()),
            Reply::Fail(msg) => Err(ProviderError::Network(msg.to_string())),
            Reply::Panic(msg) => panic!("{msg}"),
        }
    }
}

fn app(provider: Arc<StubProvider>, configured: bool) -> Router {
    let config = if configured {
        Config::default().with_api_key("test-key")
    } else {
        Config::default()
    };
    let state = Arc::new(AppState::new(config, provider));
    create_app(state)
}

async fn post_chat(app: Router, body: &str) -> Response<Body> {
    post_chat_as(app, Some("application/json"), body).await
}

async fn post_chat_as(app: Router, content_type: Option<&str>, body: &str) -> Response<Body> {
    let mut request = Request::builder().method("POST").uri("/chat");
    if let Some(content_type) = content_type {
        request = request.header("content-type", content_type);
    }
    app.oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_chat_returns_candidate_text() {
    let provider = StubProvider::new(Reply::Candidates(vec![Candidate::text("Hi there!")]));
    let response = post_chat(app(provider.clone(), true), r#"{"message": "hello"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert!(body.get("error").is_none());
    let chat: ChatResponse = serde_json::from_value(body).unwrap();
    assert_eq!(chat.response, "Hi there!");
    assert_eq!(chat.model, "gemini-2.5-flash");
    assert_eq!(chat.filtered, Some(false));
    assert_eq!(provider.prompts.lock().unwrap().as_slice(), ["hello"]);
}

#[tokio::test]
async fn test_blank_message_is_rejected_before_provider() {
    for body in [r#"{"message": ""}"#, r#"{"message": "   \n\t"}"#, r#"{}"#] {
        let provider = StubProvider::new(Reply::Candidates(vec![Candidate::text("unused")]));
        let response = post_chat(app(provider.clone(), true), body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["detail"], "Message cannot be empty");
        assert_eq!(provider.calls(), 0);
    }
}

#[tokio::test]
async fn test_missing_key_is_a_server_error() {
    let provider = StubProvider::new(Reply::Candidates(vec![Candidate::text("unused")]));
    let response = post_chat(app(provider.clone(), false), r#"{"message": "hello"}"#).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["detail"], "Gemini API key not configured");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_zero_candidates_gives_safety_apology() {
    let provider = StubProvider::new(Reply::Candidates(vec![]));
    let response = post_chat(app(provider, true), r#"{"message": "hello"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["response"], SAFETY_APOLOGY);
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_provider_failure_is_absorbed() {
    let provider = StubProvider::new(Reply::Fail("connection reset"));
    let response = post_chat(app(provider, true), r#"{"message": "hello"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);

    let chat: ChatResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(chat.response, UPSTREAM_APOLOGY);
    assert_eq!(chat.error.as_deref(), Some("Network error: connection reset"));
    assert_eq!(chat.filtered, None);
}

#[tokio::test]
async fn test_safety_finish_reason_flags_text_reply() {
    let candidate = Candidate::text("partial answer").with_finish_reason(FinishReason::Safety);
    let provider = StubProvider::new(Reply::Candidates(vec![candidate]));
    let response = post_chat(app(provider, true), r#"{"message": "hello"}"#).await;

    let chat: ChatResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(chat.response, "partial answer");
    assert_eq!(chat.filtered, Some(true));
}

#[tokio::test]
async fn test_malformed_body_gets_apology() {
    let provider = StubProvider::new(Reply::Candidates(vec![Candidate::text("unused")]));
    let response = post_chat(app(provider.clone(), true), "{not json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let chat: ChatResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(chat.response, TECHNICAL_DIFFICULTY_APOLOGY);
    assert!(chat.error.is_some());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_chat_ignores_content_type() {
    for content_type in [None, Some("text/plain"), Some("application/x-www-form-urlencoded")] {
        let provider = StubProvider::new(Reply::Candidates(vec![Candidate::text("Hi there!")]));
        let response =
            post_chat_as(app(provider.clone(), true), content_type, r#"{"message": "hello"}"#).await;
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(chat.response, "Hi there!");
        assert!(chat.error.is_none());
        assert_eq!(provider.calls(), 1);
    }
}

#[tokio::test]
async fn test_non_object_body_gets_apology() {
    for body in [r#"["hello"]"#, "[]", r#""hello""#, "42", r#"{"message": 5}"#] {
        let provider = StubProvider::new(Reply::Candidates(vec![Candidate::text("unused")]));
        let response = post_chat(app(provider.clone(), true), body).await;
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(chat.response, TECHNICAL_DIFFICULTY_APOLOGY, "body: {body}");
        assert!(chat.error.is_some());
        assert_eq!(provider.calls(), 0);
    }
}

#[tokio::test]
async fn test_handler_panic_gets_apology() {
    let provider = StubProvider::new(Reply::Panic("candidate index out of range"));
    let response = post_chat(app(provider, true), r#"{"message": "hello"}"#).await;
    assert_eq!(response.status(), StatusCode::OK);

    let chat: ChatResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert_eq!(chat.response, TECHNICAL_DIFFICULTY_APOLOGY);
    assert_eq!(chat.model, "gemini-2.5-flash");
    assert_eq!(chat.error.as_deref(), Some("candidate index out of range"));
}

#[tokio::test]
async fn test_health_reports_key_presence() {
    let provider = StubProvider::new(Reply::Candidates(vec![]));
    let health: HealthResponse =
        serde_json::from_value(json_body(get(app(provider.clone(), true), "/health").await).await)
            .unwrap();
    assert_eq!(health.status, "healthy");
    assert!(health.model_loaded);
    let info = health.model_info.unwrap();
    assert_eq!(info.name, "gemini-2.5-flash");
    assert_eq!(info.kind, "text");

    let body = json_body(get(app(provider, false), "/health").await).await;
    assert_eq!(body["model_loaded"], false);
    assert!(body["model_info"].is_null());
}

#[tokio::test]
async fn test_self_test_with_working_provider() {
    let provider = StubProvider::new(Reply::Candidates(vec![Candidate::text("Yes, all good.")]));
    let response = get(app(provider.clone(), true), "/test").await;
    assert_eq!(response.status(), StatusCode::OK);

    let result: TestResponse = serde_json::from_value(json_body(response).await).unwrap();
    assert!(result.success);
    assert_eq!(result.response.as_deref(), Some("Yes, all good."));
    assert_eq!(result.model.as_deref(), Some("gemini-2.5-flash"));
    assert_eq!(provider.prompts.lock().unwrap().as_slice(), [TEST_PROMPT]);
}

#[tokio::test]
async fn test_self_test_with_filtered_reply() {
    let provider = StubProvider::new(Reply::Candidates(vec![]));
    let result: TestResponse =
        serde_json::from_value(json_body(get(app(provider, true), "/test").await).await).unwrap();
    assert!(result.success);
    assert_eq!(result.response.as_deref(), Some(TEST_FILTERED_REPLY));
}

#[tokio::test]
async fn test_self_test_with_failing_provider() {
    let provider = StubProvider::new(Reply::Fail("quota exceeded"));
    let body = json_body(get(app(provider, true), "/test").await).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Network error: quota exceeded");
    assert!(body.get("response").is_none());
}

#[tokio::test]
async fn test_self_test_without_key() {
    let provider = StubProvider::new(Reply::Candidates(vec![]));
    let body = json_body(get(app(provider.clone(), false), "/test").await).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Gemini API key not configured");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_root_describes_service() {
    let provider = StubProvider::new(Reply::Candidates(vec![]));
    let info: ServiceInfo =
        serde_json::from_value(json_body(get(app(provider, false), "/").await).await).unwrap();
    assert_eq!(info.status, "running");
    assert_eq!(info.provider, "Google Gemini AI");
    assert_eq!(info.endpoints, ["/health", "/chat", "/test"]);
}

#[tokio::test]
async fn test_cors_preflight_is_open() {
    let provider = StubProvider::new(Reply::Candidates(vec![]));
    let response = app(provider, true)
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/chat")
                .header("origin", "http://localhost:5173")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-max-age"], "86400");
}
