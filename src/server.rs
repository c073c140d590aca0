//! HTTP bridge between the browser page and the [`Controller`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::encoder::UploadedImage;
use crate::gemini::ImageService;
use crate::state::{Controller, Mode, PendingRun, Rejection, StateSnapshot};

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    controller: Arc<Mutex<Controller>>,
    service: Arc<ImageService>,
}

impl AppState {
    pub fn new(service: ImageService) -> Self {
        Self {
            controller: Arc::new(Mutex::new(Controller::new())),
            service: Arc::new(service),
        }
    }

    /// Never held across an `.await`.
    fn controller(&self) -> MutexGuard<'_, Controller> {
        self.controller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("Could not read upload: {0}")]
    Upload(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Rejected(Rejection::Busy) => StatusCode::CONFLICT,
            ApiError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upload(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<StateSnapshot>, ApiError>;

#[derive(Debug, Deserialize)]
struct ModeBody {
    mode: Mode,
}

#[derive(Debug, Deserialize)]
struct PromptBody {
    prompt: String,
}

#[derive(Debug, Default, Deserialize)]
struct EditBody {
    #[serde(default)]
    prompt: Option<String>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/state", get(current_state))
        .route("/api/upload", post(upload_image))
        .route("/api/image", get(preview_image))
        .route("/api/mode", post(select_mode))
        .route("/api/prompt", post(edit_prompt))
        .route("/api/edit", post(submit_edit))
        .route("/api/analyze", post(submit_analyze))
        .route("/api/reset", post(reset))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn current_state(State(state): State<AppState>) -> Json<StateSnapshot> {
    Json(state.controller().snapshot())
}

async fn upload_image(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult {
    // Text fields sent alongside the file are skipped.
    let image = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Upload(e.to_string()))?
            .ok_or_else(|| ApiError::Upload("no file in request".to_string()))?;

        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Upload(e.to_string()))?;

        break UploadedImage::new(data, content_type, Some(file_name));
    };

    let mut controller = state.controller();
    controller.upload(image)?;
    Ok(Json(controller.snapshot()))
}

async fn preview_image(State(state): State<AppState>) -> Response {
    let controller = state.controller();
    match controller.image() {
        Some(image) => {
            let mime = image
                .mime_type()
                .unwrap_or_else(|| "application/octet-stream".to_string());
            ([(header::CONTENT_TYPE, mime)], image.bytes().clone()).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn select_mode(State(state): State<AppState>, Json(body): Json<ModeBody>) -> ApiResult {
    let mut controller = state.controller();
    controller.select_mode(body.mode)?;
    Ok(Json(controller.snapshot()))
}

async fn edit_prompt(State(state): State<AppState>, Json(body): Json<PromptBody>) -> ApiResult {
    let mut controller = state.controller();
    controller.edit_prompt(body.prompt)?;
    Ok(Json(controller.snapshot()))
}

/// Runs the edit to completion before answering. Without a `prompt` in the
/// body the stored prompt is used.
async fn submit_edit(State(state): State<AppState>, body: Option<Json<EditBody>>) -> ApiResult {
    let run = {
        let mut controller = state.controller();
        let prompt = match body.and_then(|Json(body)| body.prompt) {
            Some(prompt) => prompt,
            None => controller.prompt().to_string(),
        };
        controller.begin_edit(&prompt)?
    };

    complete(state, run).await
}

async fn submit_analyze(State(state): State<AppState>) -> ApiResult {
    let run = {
        let mut controller = state.controller();
        controller.begin_analyze()?
    };

    complete(state, run).await
}

/// Executes on its own task so a client hanging up mid-request cannot cancel
/// the run before `finish`, which would leave the booth busy for good.
async fn complete(state: AppState, run: PendingRun) -> ApiResult {
    let task = tokio::spawn(async move {
        let outcome = run.execute(&state.service).await;
        let mut controller = state.controller();
        controller.finish(outcome);
        controller.snapshot()
    });

    let snapshot = task
        .await
        .map_err(|e| ApiError::Internal(format!("run task failed: {e}")))?;
    Ok(Json(snapshot))
}

async fn reset(State(state): State<AppState>) -> Json<StateSnapshot> {
    let mut controller = state.controller();
    controller.reset();
    Json(controller.snapshot())
}
