//! HTTP service that downloads an image by URL, runs YOLOv8 object detection
//! over it, and returns labelled, described bounding boxes.

pub mod api;
pub mod config;
pub mod descriptions;
pub mod detector;
pub mod error;
pub mod fetch;
pub mod models;

pub use api::{create_app, AppState};
pub use config::Config;
pub use descriptions::DescriptionLookup;
pub use detector::{Detector, RawDetection, YoloDetector};
pub use error::{ApiError, DetectError, FetchError};
pub use fetch::{HttpImageFetcher, ImageFetcher};
