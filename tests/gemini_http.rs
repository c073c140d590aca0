//! The reqwest transport against an in-process stand-in for the Gemini endpoint.

mod common;

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use time_travel_booth::config::{GeminiConfig, ModelIds};
use time_travel_booth::encoder::{encode, UploadedImage};
use time_travel_booth::{BoothError, GeminiHttp, ImageService};

#[derive(Debug, Clone)]
struct Captured {
    call: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    reply: String,
    captured: Arc<Mutex<Vec<Captured>>>,
}

async fn generate(
    State(stub): State<Stub>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    stub.captured.lock().unwrap().push(Captured {
        call,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body,
    });
    (stub.status, stub.reply.clone())
}

/// Serves `reply` with `status` for every `generateContent` call and returns
/// the API base to point the client at.
async fn spawn_stub(status: StatusCode, reply: String) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1beta/models/:call", post(generate))
        .with_state(Stub {
            status,
            reply,
            captured: captured.clone(),
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1beta"), captured)
}

fn service_at(api_base: String) -> ImageService {
    let mut config = GeminiConfig::new("test-key");
    config.api_base = api_base;
    let client = GeminiHttp::new(&config).unwrap();
    ImageService::new(Arc::new(client), ModelIds::default())
}

fn photo() -> time_travel_booth::EncodedImage {
    encode(&UploadedImage::new(common::png_bytes(), None, Some("me.png".to_string()))).unwrap()
}

#[tokio::test]
async fn describe_round_trip() {
    let reply = json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": "A portrait in soft light." }] },
            "finishReason": "STOP"
        }]
    });
    let (base, captured) = spawn_stub(StatusCode::OK, reply.to_string()).await;
    let service = service_at(base);

    let text = service.describe(&photo()).await.unwrap();
    assert_eq!(text, "A portrait in soft light.");

    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].call, "gemini-2.5-flash:generateContent");
    assert_eq!(captured[0].api_key.as_deref(), Some("test-key"));
    let parts = &captured[0].body["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
    assert!(parts[1]["text"].as_str().unwrap().starts_with("Analyze this image"));
}

#[tokio::test]
async fn transform_round_trip() {
    let reply = json!({
        "candidates": [{ "content": { "parts": [
            { "text": "Welcome to Rome." },
            { "inlineData": { "mimeType": "image/png", "data": "cm9tZQ==" } }
        ] } }]
    });
    let (base, captured) = spawn_stub(StatusCode::OK, reply.to_string()).await;
    let service = service_at(base);

    let image = service
        .transform(&photo(), "Place the person in Ancient Rome")
        .await
        .unwrap();
    assert_eq!(image.data, "cm9tZQ==");

    let captured = captured.lock().unwrap();
    assert_eq!(captured[0].call, "gemini-2.5-flash-image:generateContent");
    assert_eq!(
        captured[0].body["generationConfig"],
        json!({ "responseModalities": ["IMAGE"] })
    );
}

#[tokio::test]
async fn error_envelope_becomes_service_error() {
    let reply = json!({
        "error": { "code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT" }
    });
    let (base, _) = spawn_stub(StatusCode::BAD_REQUEST, reply.to_string()).await;

    let err = service_at(base).describe(&photo()).await.unwrap_err();
    assert_eq!(
        err,
        BoothError::Service(
            "Gemini API error 400: API key not valid. Please pass a valid API key.".to_string()
        )
    );
}

#[tokio::test]
async fn plain_error_body_is_passed_through() {
    let (base, _) = spawn_stub(StatusCode::TOO_MANY_REQUESTS, "quota exhausted".to_string()).await;

    let err = service_at(base).describe(&photo()).await.unwrap_err();
    assert_eq!(
        err,
        BoothError::Service("Gemini API error 429: quota exhausted".to_string())
    );
}

#[tokio::test]
async fn undecodable_success_body_is_service_error() {
    let (base, _) = spawn_stub(StatusCode::OK, "<html>oops</html>".to_string()).await;

    let err = service_at(base).describe(&photo()).await.unwrap_err();
    assert!(matches!(err, BoothError::Service(msg) if msg.starts_with("Unreadable response")));
}

#[tokio::test]
async fn unreachable_service_is_service_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = service_at(format!("http://{addr}/v1beta"))
        .describe(&photo())
        .await
        .unwrap_err();
    assert!(matches!(err, BoothError::Service(msg) if msg.starts_with("Request to Gemini failed")));
}
