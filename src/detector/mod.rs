//! Object detection capability.
//!
//! The HTTP layer only sees the [`Detector`] trait; the YOLOv8 ONNX model is
//! one implementation, and tests substitute their own.

pub mod labels;
pub mod postprocess;
pub mod preprocess;
pub mod yolo;

use image::RgbImage;

pub use labels::ClassNames;
pub use yolo::{YoloConfig, YoloDetector};

/// One raw prediction in original-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` with `x1 <= x2` and `y1 <= y2`.
    pub bbox: [f32; 4],
}

/// Inference over a decoded RGB image.
///
/// Implementations are shared between concurrent requests, so `detect`
/// takes `&self` and must not change observable model state.
pub trait Detector: Send + Sync {
    /// Detections in model order. The endpoint never re-sorts them.
    fn detect(&self, image: &RgbImage) -> anyhow::Result<Vec<RawDetection>>;

    fn class_name(&self, class_id: usize) -> Option<&str>;

    /// Identifier reported by the health check.
    fn model_id(&self) -> &str;
}
