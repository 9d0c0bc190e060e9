use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failure of one stage of the detect pipeline. Every stage maps to the same
/// HTTP 500, but the tag survives into logs.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("{0}")]
    Fetch(#[from] FetchError),
    #[error("cannot identify image file: {0}")]
    Decode(String),
    #[error("{0}")]
    Inference(String),
}

impl DetectError {
    pub fn stage(&self) -> &'static str {
        match self {
            DetectError::Fetch(_) => "fetch",
            DetectError::Decode(_) => "decode",
            DetectError::Inference(_) => "inference",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("TimeoutError: {0}")]
    Timeout(String),
    #[error("ConnectError: {0}")]
    Connect(String),
    #[error("HTTP status {status} for url ({url})")]
    Status { status: u16, url: String },
    #[error("image exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("RequestError: {0}")]
    Request(String),
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Content-Type must be application/json")]
    InvalidContentType,
    #[error("Request body must be valid JSON")]
    MalformedBody,
    #[error("No image URL provided")]
    MissingField,
    #[error("Detection failed")]
    DetectionFailed(#[from] DetectError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidContentType | ApiError::MalformedBody | ApiError::MissingField => {
                StatusCode::BAD_REQUEST
            }
            ApiError::DetectionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::DetectionFailed(cause) => json!({
                "error": self.to_string(),
                "details": cause.to_string(),
            }),
            _ => json!({"error": self.to_string()}),
        };
        (status, Json(body)).into_response()
    }
}
