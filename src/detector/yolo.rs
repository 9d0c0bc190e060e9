//! YOLOv8 detector on ONNX Runtime.
//!
//! Expects an ultralytics export (`yolo export format=onnx`) with a single
//! `[1, 3, 640, 640]` input and a `[1, 4 + classes, anchors]` output.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use ndarray::ArrayViewD;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use super::labels::ClassNames;
use super::postprocess::{decode_output, non_maximum_suppression};
use super::preprocess::{letterbox, Letterbox, INPUT_SIZE};
use super::{Detector, RawDetection};

/// Upper bound on boxes returned per image.
const MAX_DETECTIONS: usize = 300;

#[derive(Debug, Clone)]
pub struct YoloConfig {
    pub model_path: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub intra_threads: usize,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("yolov8n.onnx"),
            labels_path: None,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            intra_threads: 4,
        }
    }
}

pub struct YoloDetector {
    /// ONNX Runtime session; `run` needs exclusive access
    session: Arc<Mutex<Session>>,
    input_name: String,
    class_names: ClassNames,
    model_id: String,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("model_id", &self.model_id)
            .field("input_name", &self.input_name)
            .field("classes", &self.class_names.len())
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the model and class table.
    ///
    /// # Errors
    /// Returns error if the model file is missing, ONNX Runtime cannot build
    /// a session from it, or the labels file cannot be read.
    pub fn load(config: &YoloConfig) -> Result<Self> {
        let model_path = config.model_path.as_path();
        if !model_path.exists() {
            anyhow::bail!("YOLO model not found: {}", model_path.display());
        }

        info!("Loading YOLO model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(config.intra_threads.max(1))
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load YOLO model from {}", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());
        debug!("YOLO model input: {}", input_name);

        let class_names = match &config.labels_path {
            Some(path) => ClassNames::from_file(path)?,
            None => ClassNames::coco(),
        };

        info!(
            classes = class_names.len(),
            confidence_threshold = config.confidence_threshold,
            iou_threshold = config.iou_threshold,
            "YOLO model loaded"
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            class_names,
            model_id: model_id_from_path(model_path),
            confidence_threshold: config.confidence_threshold.clamp(0.0, 1.0),
            iou_threshold: config.iou_threshold.clamp(0.0, 1.0),
        })
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>> {
        let (tensor, geometry) = letterbox(image, INPUT_SIZE);
        let input = Value::from_array(tensor).context("Failed to create input tensor")?;

        let detections = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("YOLO session lock poisoned"))?;
            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input])
                .context("YOLO inference failed")?;
            let output = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?;
            detections_from_output(
                output,
                &geometry,
                self.confidence_threshold,
                self.iou_threshold,
            )?
        };

        debug!("YOLO produced {} detections", detections.len());
        Ok(detections)
    }

    fn class_name(&self, class_id: usize) -> Option<&str> {
        self.class_names.get(class_id)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Decode, suppress and map a raw head output back onto the source image.
fn detections_from_output(
    output: ArrayViewD<'_, f32>,
    geometry: &Letterbox,
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<RawDetection>> {
    let candidates = decode_output(output, confidence_threshold)?;
    Ok(non_maximum_suppression(candidates, iou_threshold, MAX_DETECTIONS)
        .into_iter()
        .map(|d| RawDetection {
            bbox: geometry.unmap(d.bbox),
            ..d
        })
        .collect())
}

/// `models/yolov8n.onnx` → `yolov8n`
fn model_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
