use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::Result;
use ndarray::{ArrayViewD, Axis, Ix2};

use super::RawDetection;

/// Decode a YOLOv8 head output of shape `[1, 4 + C, N]`.
///
/// Rows `0..4` hold `cx, cy, w, h`; rows `4..` hold per-class scores. Each
/// anchor keeps its best class when that score reaches `conf_threshold`.
/// Boxes are returned as `[x1, y1, x2, y2]` in letterbox coordinates.
pub fn decode_output(output: ArrayViewD<'_, f32>, conf_threshold: f32) -> Result<Vec<RawDetection>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
        anyhow::bail!("unexpected YOLO output shape {:?}, expected [1, 4 + classes, anchors]", shape);
    }

    let rows = output.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;
    let num_classes = shape[1] - 4;

    let mut candidates = Vec::new();
    for anchor in rows.axis_iter(Axis(1)) {
        let (class_id, confidence) = (0..num_classes)
            .map(|c| (c, anchor[4 + c]))
            .fold((0, f32::NEG_INFINITY), |(best_id, best), (id, score)| {
                if score > best { (id, score) } else { (best_id, best) }
            });

        if confidence < conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        candidates.push(RawDetection {
            class_id,
            confidence,
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
        });
    }

    Ok(candidates)
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes.
pub fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_x1 = a[0].max(b[0]);
    let inter_y1 = a[1].max(b[1]);
    let inter_x2 = a[2].min(b[2]);
    let inter_y2 = a[3].min(b[3]);

    let inter_area = (inter_x2 - inter_x1).max(0.0) * (inter_y2 - inter_y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union_area = area_a + area_b - inter_area;
    if union_area <= 0.0 { 0.0 } else { inter_area / union_area }
}

fn by_confidence_desc(a: &RawDetection, b: &RawDetection) -> Ordering {
    b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal)
}

/// Per-class non-maximum suppression. Survivors come back ordered by
/// descending confidence, truncated to `max_detections`.
pub fn non_maximum_suppression(
    candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    let mut by_class: HashMap<usize, Vec<RawDetection>> = HashMap::new();
    for candidate in candidates {
        by_class.entry(candidate.class_id).or_default().push(candidate);
    }

    let mut kept = Vec::new();
    for (_class_id, mut group) in by_class {
        group.sort_by(by_confidence_desc);

        let mut suppressed = vec![false; group.len()];
        for i in 0..group.len() {
            if suppressed[i] {
                continue;
            }
            kept.push(group[i]);
            for j in (i + 1)..group.len() {
                if !suppressed[j] && compute_iou(&group[i].bbox, &group[j].bbox) > iou_threshold {
                    suppressed[j] = true;
                }
            }
        }
    }

    // stable order across runs: confidence, then class id for ties
    kept.sort_by(|a, b| by_confidence_desc(a, b).then(a.class_id.cmp(&b.class_id)));
    kept.truncate(max_detections);
    kept
}
