//! Greedy non-maximum suppression over one frame's detections.
//!
//! Suppression is class-agnostic: overlapping boxes compete regardless of
//! label. No state carries over between frames.

use crate::normalize::Detection;

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SuppressParams {
    /// Detections below this confidence are discarded outright.
    pub score_threshold: f32,
    /// A detection is suppressed when its IoU with an accepted one exceeds this.
    pub iou_threshold: f64,
}

impl Default for SuppressParams {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
        }
    }
}

/// Keep the strongest non-overlapping detections, highest confidence first.
///
/// Ties in confidence keep their input order.
pub fn suppress(detections: Vec<Detection>, params: SuppressParams) -> Vec<Detection> {
    let mut candidates: Vec<Detection> = detections
        .into_iter()
        .filter(|det| det.confidence >= params.score_threshold)
        .collect();
    // Vec::sort_by is stable.
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut suppressed = vec![false; candidates.len()];
    let mut accepted = Vec::new();
    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            if !suppressed[j] && candidates[i].bbox.iou(&candidates[j].bbox) > params.iou_threshold {
                suppressed[j] = true;
            }
        }
        accepted.push(i);
    }

    let mut keep = accepted.into_iter().peekable();
    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(idx, det)| {
            if keep.peek() == Some(&idx) {
                keep.next();
                Some(det)
            } else {
                None
            }
        })
        .collect()
}
