use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use storyvoice_core::cache::{CacheEntry, MemoryCache, ResponseCache, VoiceCache};
use storyvoice_core::voice::mock::{MockBehavior, MockProvider};
use storyvoice_core::voice::{
    FallbackChain, ProviderKind, RetryPolicy, TextToSpeech, VoiceRequestRouter, BROWSER_SYNTHESIS,
};
use tower::ServiceExt;

struct TestServer {
    app: Router,
    primary: MockProvider,
    secondary: MockProvider,
    backend: Arc<MemoryCache>,
}

impl TestServer {
    fn new(primary: MockBehavior, secondary: MockBehavior) -> Self {
        let primary = MockProvider::new(ProviderKind::ElevenLabs, primary);
        let secondary = MockProvider::new(ProviderKind::OpenAi, secondary);
        let backend = Arc::new(MemoryCache::new());

        let providers: Vec<Arc<dyn TextToSpeech>> =
            vec![Arc::new(primary.clone()), Arc::new(secondary.clone())];
        let router = VoiceRequestRouter::new(
            FallbackChain::new(providers, RetryPolicy::default()),
            VoiceCache::new(backend.clone(), None),
        )
        .with_max_text_chars(4096)
        .with_catalog(
            vec!["narrator".to_string(), "wolf".to_string()],
            vec!["calm".to_string(), "scared".to_string()],
        );

        Self {
            app: storyvoice_server::app(Arc::new(router)),
            primary,
            secondary,
            backend,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn generate(&self, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, "/generate-voice", Some(body)).await
    }
}

#[tokio::test]
async fn test_generate_voice_then_cache_hit() {
    let server = TestServer::new(MockBehavior::Success, MockBehavior::Success);
    let body = json!({ "text": "Merhaba", "character": "narrator", "emotion": "calm" });

    let (status, first) = server.generate(body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["cached"], false);
    assert_eq!(first["usedFallback"], false);
    let audio_url = first["audioUrl"].as_str().unwrap();
    assert!(audio_url.starts_with("data:audio/mpeg;base64,"));

    let (status, second) = server.generate(body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cached"], true);
    assert_eq!(second["audioUrl"], audio_url);
    assert_eq!(server.primary.get_call_count(), 1);
}

#[tokio::test]
async fn test_missing_text_is_bad_request() {
    let server = TestServer::new(MockBehavior::Success, MockBehavior::Success);

    let (status, body) = server
        .generate(json!({ "character": "narrator", "emotion": "calm" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing required fields: text");
    assert!(body.get("audioUrl").is_none());
    assert_eq!(server.primary.get_call_count(), 0);
    assert!(server.backend.is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let server = TestServer::new(MockBehavior::Success, MockBehavior::Success);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/generate-voice")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.primary.get_call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_all_providers_down_returns_browser_synthesis() {
    let server = TestServer::new(
        MockBehavior::AlwaysTransientError,
        MockBehavior::AlwaysTransientError,
    );

    let (status, body) = server
        .generate(json!({ "text": "Merhaba", "character": "wolf", "emotion": "scared" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["usedFallback"], true);
    assert_eq!(body["audioUrl"], BROWSER_SYNTHESIS);
    assert_eq!(body["error"], "speech providers unavailable");
    assert_eq!(server.primary.get_call_count(), 4);
    assert_eq!(server.secondary.get_call_count(), 4);
}

#[tokio::test]
async fn test_model_selects_preferred_provider() {
    let server = TestServer::new(MockBehavior::Success, MockBehavior::Success);

    let (status, body) = server
        .generate(json!({
            "text": "Merhaba",
            "character": "narrator",
            "emotion": "calm",
            "model": "OpenAI"
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usedFallback"], false);
    assert_eq!(server.primary.get_call_count(), 0);
    assert_eq!(server.secondary.get_call_count(), 1);
}

#[tokio::test]
async fn test_unknown_model_is_ignored() {
    let server = TestServer::new(MockBehavior::Success, MockBehavior::Success);

    let (status, _) = server
        .generate(json!({
            "text": "Merhaba",
            "character": "narrator",
            "emotion": "calm",
            "model": "espeak"
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(server.primary.get_call_count(), 1);
}

#[tokio::test]
async fn test_clear_voice_cache_reports_deleted_keys() {
    let server = TestServer::new(MockBehavior::Success, MockBehavior::Success);
    server
        .generate(json!({ "text": "Merhaba", "character": "narrator", "emotion": "calm" }))
        .await;
    server
        .backend
        .set(CacheEntry::new("unrelated", "kept"))
        .await
        .unwrap();

    let (status, body) = server.send(Method::POST, "/clear-voice-cache", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let deleted = body["deletedKeys"].as_array().unwrap();
    assert_eq!(deleted.len(), 1);
    assert!(deleted[0].as_str().unwrap().starts_with("voice_"));
    assert_eq!(
        server.backend.keys_with_prefix("").await.unwrap(),
        vec!["unrelated".to_string()]
    );
}

#[tokio::test]
async fn test_voice_info_lists_services_and_catalog() {
    let server = TestServer::new(MockBehavior::Success, MockBehavior::Success);

    let (status, body) = server.send(Method::GET, "/voice-info", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "available": true,
            "services": { "elevenlabs": true, "openai": true },
            "characters": ["narrator", "wolf"],
            "emotions": ["calm", "scared"]
        })
    );
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::new(MockBehavior::Success, MockBehavior::Success);

    let (status, body) = server.send(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_cors_headers_are_present() {
    let server = TestServer::new(MockBehavior::Success, MockBehavior::Success);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = server.app.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
