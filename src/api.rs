use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use image::{ImageReader, RgbImage};
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::descriptions::DescriptionLookup;
use crate::detector::{Detector, RawDetection};
use crate::error::{ApiError, DetectError};
use crate::fetch::ImageFetcher;
use crate::models::{round2, BoundingBox, DetectResponse, Detection, HealthResponse};

/// Decoder limits: no side longer than this many pixels.
const MAX_IMAGE_DIMENSION: u32 = 16_384;
/// Decoder limits: total allocation while decoding.
const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

const HEALTH_MESSAGE: &str = "YOLO backend running 🚀";

/// Collaborators shared by every request. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<dyn ImageFetcher>,
    pub detector: Arc<dyn Detector>,
    pub descriptions: Arc<DescriptionLookup>,
}

impl AppState {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        detector: Arc<dyn Detector>,
        descriptions: DescriptionLookup,
    ) -> Self {
        Self {
            fetcher,
            detector,
            descriptions: Arc::new(descriptions),
        }
    }
}

pub fn create_app(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/detect", post(detect_endpoint))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "running".to_string(),
        message: HEALTH_MESSAGE.to_string(),
        model: state.detector.model_id().to_string(),
        model_loaded: true,
    })
}

async fn detect_endpoint(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let image_url = match parse_request(&headers, &body) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("rejected detect request: {}", e);
            return e.into_response();
        }
    };

    match run_detection(&state, &image_url).await {
        Ok(detections) => {
            tracing::info!(url = %image_url, count = detections.len(), "detection complete");
            Json(DetectResponse::new(image_url, detections)).into_response()
        }
        Err(e) => {
            tracing::warn!(url = %image_url, stage = e.stage(), "detection failed: {}", e);
            ApiError::from(e).into_response()
        }
    }
}

// ── Request validation ───────────────────────────────────────────────────────

/// `application/json` or any `application/*+json`, parameters ignored.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn parse_request(headers: &HeaderMap, body: &[u8]) -> Result<String, ApiError> {
    if !is_json_content_type(headers) {
        return Err(ApiError::InvalidContentType);
    }

    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::MalformedBody)?;

    value
        .get("image_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingField)
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

async fn run_detection(state: &AppState, image_url: &str) -> Result<Vec<Detection>, DetectError> {
    let bytes = state.fetcher.fetch(image_url).await?;

    let detector = Arc::clone(&state.detector);
    let raw = tokio::task::spawn_blocking(move || -> Result<Vec<RawDetection>, DetectError> {
        let image = decode_image(&bytes)?;
        detector
            .detect(&image)
            .map_err(|e| DetectError::Inference(format!("{:#}", e)))
    })
    .await
    .map_err(|e| DetectError::Inference(format!("inference task aborted: {}", e)))??;

    raw.iter()
        .map(|d| enrich(state.detector.as_ref(), &state.descriptions, d))
        .collect()
}

/// Decode any supported format under explicit limits and normalize to RGB.
fn decode_image(bytes: &[u8]) -> Result<RgbImage, DetectError> {
    let mut limits = image::Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DetectError::Decode(e.to_string()))?;
    reader.limits(limits);
    let image = reader
        .decode()
        .map_err(|e| DetectError::Decode(e.to_string()))?;
    Ok(image.to_rgb8())
}

fn enrich(
    detector: &dyn Detector,
    descriptions: &DescriptionLookup,
    raw: &RawDetection,
) -> Result<Detection, DetectError> {
    let name = detector
        .class_name(raw.class_id)
        .ok_or_else(|| DetectError::Inference(format!("unknown class id {}", raw.class_id)))?;
    let [x1, y1, x2, y2] = raw.bbox;

    Ok(Detection {
        object: name.to_string(),
        confidence: round2(raw.confidence),
        description: descriptions.describe(name).to_string(),
        bbox: BoundingBox::rounded(x1, y1, x2, y2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn json_content_types_accepted() {
        assert!(is_json_content_type(&headers_with("application/json")));
        assert!(is_json_content_type(&headers_with("application/json; charset=utf-8")));
        assert!(is_json_content_type(&headers_with("Application/JSON")));
        assert!(is_json_content_type(&headers_with("application/ld+json")));
    }

    #[test]
    fn non_json_content_types_rejected() {
        assert!(!is_json_content_type(&HeaderMap::new()));
        assert!(!is_json_content_type(&headers_with("text/plain")));
        assert!(!is_json_content_type(&headers_with("multipart/form-data")));
        assert!(!is_json_content_type(&headers_with("text/json+x")));
    }

    #[test]
    fn content_type_checked_before_body() {
        let err = parse_request(&headers_with("text/plain"), br#"{"image_url":"x"}"#).unwrap_err();
        assert!(matches!(err, ApiError::InvalidContentType));
    }

    #[test]
    fn missing_or_empty_url_rejected() {
        let headers = headers_with("application/json");
        let bodies: [&[u8]; 5] = [
            br#"{}"#,
            br#"{"image_url":""}"#,
            br#"{"image_url":null}"#,
            br#"{"image_url":42}"#,
            br#"["image_url"]"#,
        ];
        for body in bodies {
            let err = parse_request(&headers, body).unwrap_err();
            assert!(matches!(err, ApiError::MissingField), "body {:?}", body);
        }
    }

    #[test]
    fn malformed_json_rejected() {
        let err = parse_request(&headers_with("application/json"), b"{not json").unwrap_err();
        assert!(matches!(err, ApiError::MalformedBody));
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([1, 2, 3, 4]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_normalizes_to_rgb() {
        let image = decode_image(&png(5, 3)).unwrap();
        assert_eq!(image.dimensions(), (5, 3));
        assert_eq!(image.get_pixel(0, 0).0, [1, 2, 3]);
    }

    #[test]
    fn decode_rejects_oversized_dimensions() {
        let err = decode_image(&png(MAX_IMAGE_DIMENSION + 1, 1)).unwrap_err();
        assert!(matches!(err, DetectError::Decode(_)));
    }

    #[test]
    fn decode_rejects_non_image() {
        let err = decode_image(b"<html>nope</html>").unwrap_err();
        assert!(matches!(err, DetectError::Decode(_)));
    }

    #[test]
    fn url_extracted_verbatim() {
        let url = parse_request(
            &headers_with("application/json"),
            br#"{"image_url":"not even a url"}"#,
        )
        .unwrap();
        assert_eq!(url, "not even a url");
    }
}
