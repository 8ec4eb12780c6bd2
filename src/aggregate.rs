//! Whole-video accumulation of surviving detections.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::normalize::Detection;

/// Hard cap on retained sample detections.
pub const MAX_SAMPLES: usize = 20;

/// Bounding box as percentages of the frame, 2 decimal places.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PercentBox {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampleDetection {
    pub label: String,
    pub confidence: f64,
    pub bbox: PercentBox,
}

impl SampleDetection {
    pub fn from_detection(detection: &Detection) -> Self {
        let fw = detection.frame_width as f64;
        let fh = detection.frame_height as f64;
        let b = &detection.bbox;
        Self {
            label: detection.label.clone(),
            confidence: round2(detection.confidence as f64),
            bbox: PercentBox {
                top: percent(b.y, fh),
                left: percent(b.x, fw),
                width: percent(b.w, fw),
                height: percent(b.h, fh),
            },
        }
    }
}

/// Final, read-only view of a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregate {
    pub counts: BTreeMap<String, u64>,
    pub total: u64,
    pub samples: Vec<SampleDetection>,
}

impl Aggregate {
    /// Sum of the per-label counts. Equal to `total` by construction.
    pub fn load_score(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Running counts plus the first `MAX_SAMPLES` detections in frame order.
#[derive(Debug, Default)]
pub struct Aggregator {
    counts: BTreeMap<String, u64>,
    total: u64,
    samples: Vec<SampleDetection>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with these labels present at zero.
    pub fn with_vocabulary<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut aggregator = Self::new();
        for label in labels {
            aggregator.counts.insert(label.as_ref().to_string(), 0);
        }
        aggregator
    }

    pub fn observe(&mut self, detection: &Detection) {
        *self.counts.entry(detection.label.clone()).or_insert(0) += 1;
        self.total += 1;
        if self.samples.len() < MAX_SAMPLES {
            self.samples.push(SampleDetection::from_detection(detection));
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn finalize(self) -> Aggregate {
        Aggregate {
            counts: self.counts,
            total: self.total,
            samples: self.samples,
        }
    }
}

fn percent(value: f64, extent: f64) -> f64 {
    if extent <= 0.0 {
        return 0.0;
    }
    round2((value / extent * 100.0).clamp(0.0, 100.0))
}

/// Two decimal places, exact halves rounded to even.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PixelBox;

    fn det(label: &str, confidence: f32, bbox: PixelBox, fw: u32, fh: u32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox,
            frame_width: fw,
            frame_height: fh,
        }
    }

    fn unit_box() -> PixelBox {
        PixelBox {
            x: 1.0,
            y: 1.0,
            w: 5.0,
            h: 5.0,
        }
    }

    #[test]
    fn percentages_use_their_own_axis() {
        let d = det(
            "car",
            0.876,
            PixelBox {
                x: 10.0,
                y: 20.0,
                w: 30.0,
                h: 40.0,
            },
            100,
            200,
        );
        let sample = SampleDetection::from_detection(&d);
        assert_eq!(sample.confidence, 0.88);
        assert_eq!(
            sample.bbox,
            PercentBox {
                top: 10.0,
                left: 10.0,
                width: 30.0,
                height: 20.0
            }
        );
    }

    #[test]
    fn percentages_are_clamped_when_reported() {
        let d = det(
            "bus",
            0.7,
            PixelBox {
                x: -12.0,
                y: 150.0,
                w: 300.0,
                h: 60.0,
            },
            200,
            200,
        );
        let sample = SampleDetection::from_detection(&d);
        assert_eq!(sample.bbox.left, 0.0);
        assert_eq!(sample.bbox.top, 75.0);
        assert_eq!(sample.bbox.width, 100.0);
        assert_eq!(sample.bbox.height, 30.0);
    }

    #[test]
    fn percentages_round_to_two_places() {
        let d = det(
            "car",
            0.5,
            PixelBox {
                x: 1.0,
                y: 1.0,
                w: 1.0,
                h: 2.0,
            },
            3,
            3,
        );
        let sample = SampleDetection::from_detection(&d);
        assert_eq!(sample.bbox.left, 33.33);
        assert_eq!(sample.bbox.height, 66.67);
    }

    #[test]
    fn exact_halves_round_to_even() {
        let d = det(
            "car",
            0.625,
            PixelBox {
                x: 1.0,
                y: 0.0,
                w: 8.0,
                h: 8.0,
            },
            800,
            800,
        );
        let sample = SampleDetection::from_detection(&d);
        assert_eq!(sample.confidence, 0.62);
        assert_eq!(sample.bbox.left, 0.12);
        assert_eq!(round2(0.875), 0.88);
        assert_eq!(round2(0.876), 0.88);
    }

    #[test]
    fn totals_match_counts() {
        let mut agg = Aggregator::new();
        for label in ["car", "bus", "car", "truck", "car"] {
            agg.observe(&det(label, 0.9, unit_box(), 10, 10));
        }
        let out = agg.finalize();
        assert_eq!(out.total, 5);
        assert_eq!(out.load_score(), out.total);
        assert_eq!(out.counts["car"], 3);
        assert_eq!(out.counts["bus"], 1);
    }

    #[test]
    fn samples_are_a_frozen_prefix() {
        let mut agg = Aggregator::new();
        for i in 0..MAX_SAMPLES {
            agg.observe(&det(&format!("v{}", i), 0.6, unit_box(), 10, 10));
        }
        let before = agg.samples.clone();
        for _ in 0..30 {
            agg.observe(&det("late", 0.99, unit_box(), 10, 10));
        }
        let out = agg.finalize();
        assert_eq!(out.samples.len(), MAX_SAMPLES);
        assert_eq!(out.samples, before);
        assert_eq!(out.samples[0].label, "v0");
        assert_eq!(out.counts["late"], 30);
        assert_eq!(out.total, (MAX_SAMPLES + 30) as u64);
    }

    #[test]
    fn vocabulary_is_reported_at_zero() {
        let agg = Aggregator::with_vocabulary(&["car", "bus", "truck", "motorbike"]);
        let out = agg.finalize();
        assert_eq!(out.total, 0);
        assert_eq!(out.counts.len(), 4);
        assert!(out.counts.values().all(|&c| c == 0));
        assert!(out.samples.is_empty());
    }

    #[test]
    fn labels_outside_vocabulary_are_added() {
        let mut agg = Aggregator::with_vocabulary(&["car"]);
        agg.observe(&det("tractor", 0.8, unit_box(), 10, 10));
        let out = agg.finalize();
        assert_eq!(out.counts["car"], 0);
        assert_eq!(out.counts["tractor"], 1);
        assert_eq!(out.load_score(), 1);
    }
}
