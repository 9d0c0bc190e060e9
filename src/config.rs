use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::detector::YoloConfig;

/// Local development origins that are always allowed.
pub const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

/// Server settings. Every flag falls back to an environment variable, which
/// may itself come from a `.env` file loaded at startup.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Object detection over image URLs", long_about = None)]
pub struct Config {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Listen port
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Extra CORS origin; unset or `*` allows any origin
    #[arg(long, env = "FRONTEND_URL")]
    pub frontend_url: Option<String>,

    /// YOLOv8 ONNX export
    #[arg(long, env = "MODEL_PATH", default_value = "yolov8n.onnx")]
    pub model_path: PathBuf,

    /// Class names, one per line (defaults to COCO-80)
    #[arg(long, env = "LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value_t = 0.25)]
    pub confidence_threshold: f32,

    #[arg(long, env = "IOU_THRESHOLD", default_value_t = 0.7)]
    pub iou_threshold: f32,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn yolo(&self) -> YoloConfig {
        YoloConfig {
            model_path: self.model_path.clone(),
            labels_path: self.labels_path.clone(),
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            intra_threads: self.intra_threads,
        }
    }

    /// Allowed origins, or `None` when any origin is allowed.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        let frontend = self
            .frontend_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'));

        let mut origins: Vec<String> = DEV_ORIGINS.iter().map(|o| o.to_string()).collect();
        match frontend {
            None | Some("*") => return None,
            // set but blank: dev origins only
            Some("") => {}
            Some(url) => {
                if !origins.iter().any(|o| o == url) {
                    origins.push(url.to_string());
                }
            }
        }
        Some(origins)
    }

    pub fn cors_layer(&self) -> Result<CorsLayer> {
        let allow_origin = match self.cors_origins() {
            None => AllowOrigin::from(Any),
            Some(origins) => {
                let values = origins
                    .iter()
                    .map(|o| {
                        HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {:?}", o))
                    })
                    .collect::<Result<Vec<_>>>()?;
                AllowOrigin::list(values)
            }
        };

        Ok(CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers(Any))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let argv = std::iter::once("detect-api").chain(args.iter().copied());
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&["--port", "5000"]);
        assert_eq!(config.bind_addr().port(), 5000);
        assert_eq!(config.model_path, PathBuf::from("yolov8n.onnx"));
        assert_eq!(config.confidence_threshold, 0.25);
        assert!(config.labels_path.is_none());
    }

    #[test]
    fn frontend_url_extends_dev_origins() {
        let config = parse(&["--frontend-url", "https://app.example.com/"]);
        let origins = config.cors_origins().unwrap();
        assert_eq!(
            origins,
            vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "https://app.example.com".to_string(),
            ]
        );
        assert!(config.cors_layer().is_ok());
    }

    #[test]
    fn unset_frontend_allows_any_origin() {
        let config = Config {
            frontend_url: None,
            ..parse(&[])
        };
        assert!(config.cors_origins().is_none());
    }

    #[test]
    fn blank_frontend_keeps_dev_origins_only() {
        for blank in ["", "   "] {
            let config = parse(&["--frontend-url", blank]);
            let dev: Vec<String> = DEV_ORIGINS.iter().map(|o| o.to_string()).collect();
            assert_eq!(config.cors_origins(), Some(dev), "frontend url {:?}", blank);
        }
    }

    #[test]
    fn wildcard_frontend_allows_any_origin() {
        let config = parse(&["--frontend-url", "*"]);
        assert!(config.cors_origins().is_none());
    }

    #[test]
    fn yolo_config_carries_thresholds() {
        let config = parse(&["--iou-threshold", "0.5", "--model-path", "m/yolov8s.onnx"]);
        let yolo = config.yolo();
        assert_eq!(yolo.iou_threshold, 0.5);
        assert_eq!(yolo.model_path, PathBuf::from("m/yolov8s.onnx"));
    }
}
