use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Box with every coordinate rounded to two decimals.
    pub fn rounded(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: round2(x1),
            y1: round2(y1),
            x2: round2(x2),
            y2: round2(y2),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Detection {
    pub object: String,
    pub confidence: f64,
    pub description: String,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetectResponse {
    pub image_url: String,
    pub detections: Vec<Detection>,
    pub total_detections: usize,
}

impl DetectResponse {
    pub fn new(image_url: String, detections: Vec<Detection>) -> Self {
        Self {
            image_url,
            total_detections: detections.len(),
            detections,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub model: String,
    pub model_loaded: bool,
}

/// Round to two decimal places, computed in f64 so values like `0.87`
/// serialize without f32 widening noise.
pub fn round2(value: f32) -> f64 {
    (f64::from(value) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(0.8734), 0.87);
        assert_eq!(round2(0.876), 0.88);
        assert_eq!(round2(1.0), 1.0);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(123.456), 123.46);
    }

    #[test]
    fn round2_serializes_cleanly() {
        let json = serde_json::to_string(&round2(0.87)).unwrap();
        assert_eq!(json, "0.87");
    }

    #[test]
    fn detection_serializes_box_key() {
        let detection = Detection {
            object: "dog".to_string(),
            confidence: 0.91,
            description: "A loyal domesticated animal.".to_string(),
            bbox: BoundingBox::rounded(1.234, 5.678, 10.0, 20.0),
        };
        let value = serde_json::to_value(&detection).unwrap();
        assert_eq!(value["object"], "dog");
        assert_eq!(value["box"]["x1"], 1.23);
        assert_eq!(value["box"]["y2"], 20.0);
        assert!(value.get("bbox").is_none());
    }

    #[test]
    fn response_counts_detections() {
        let response = DetectResponse::new("https://example.com/a.jpg".to_string(), Vec::new());
        assert_eq!(response.total_detections, 0);
        assert!(response.detections.is_empty());
    }
}
