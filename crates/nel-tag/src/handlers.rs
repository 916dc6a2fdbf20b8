use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use nel_types::{Doc, Token};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::TagError;
use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Mutex<Pipeline>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
        }
    }
}

#[derive(Deserialize)]
pub struct AnnotateRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<Token>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/annotate", post(annotate))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn annotate(
    State(state): State<AppState>,
    Json(req): Json<AnnotateRequest>,
) -> Result<Json<Doc>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }
    let mut doc = Doc::new(req.id.unwrap_or_default(), req.text);
    let char_len = doc.char_len();
    if let Some(token) = req.tokens.iter().find(|t| t.begin > t.end || t.end > char_len) {
        return Err(ApiError::bad_request(format!(
            "token {}..{} is outside the text ({char_len} chars)",
            token.begin, token.end
        )));
    }
    doc.tokens = req.tokens;

    // Taggers block on sockets and subprocess pipes.
    let pipeline = Arc::clone(&state.pipeline);
    let doc = tokio::task::spawn_blocking(move || {
        let mut pipeline = pipeline.lock().map_err(|_| ApiError::Internal)?;
        pipeline.annotate(&mut doc)?;
        Ok::<_, ApiError>(doc)
    })
    .await
    .map_err(|_| ApiError::Internal)??;

    Ok(Json(doc))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("tagger failed: {0}")]
    Tagger(#[from] TagError),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Tagger(TagError::TokenRange { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Tagger(err) => {
                warn!("annotate failed: {err}");
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
