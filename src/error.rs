//! Error kinds surfaced by the lane pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal pipeline errors. Any of these ends the run without a report.
#[derive(Debug, Error)]
pub enum LaneError {
    #[error("could not open input video {path}: {reason}")]
    SourceOpen { path: String, reason: String },

    #[error("could not write output video {path}: {reason}")]
    SinkWrite { path: PathBuf, reason: String },

    #[error("detector backend '{backend}' failed: {reason}")]
    Detector { backend: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// A single raw detection that could not be normalized.
///
/// Never fatal: the pipeline drops the detection and carries on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DetectionError {
    #[error("non-finite box geometry ({cx}, {cy}, {w}, {h})")]
    NonFiniteGeometry { cx: f32, cy: f32, w: f32, h: f32 },

    #[error("box has no area ({w} x {h})")]
    DegenerateBox { w: f64, h: f64 },

    #[error("class id {0} has no label")]
    UnknownClass(usize),
}
