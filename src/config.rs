use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::annotate::LabelStyle;
use crate::detect::{DetectorSettings, OutputLayout};
use crate::suppress::SuppressParams;

const DEFAULT_SYNTHETIC_FRAMES: u64 = 100;

#[derive(Debug, Deserialize, Default)]
struct LaneConfigFile {
    detector: Option<DetectorConfigFile>,
    suppression: Option<SuppressionConfigFile>,
    annotation: Option<AnnotationConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    layout: Option<OutputLayout>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    vehicle_only: Option<bool>,
    seed: Option<u64>,
    require_model: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct SuppressionConfigFile {
    score_threshold: Option<f32>,
    iou_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct AnnotationConfigFile {
    label_style: Option<LabelStyle>,
    font_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    timestamp: Option<bool>,
    synthetic_frames: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LaneConfig {
    pub detector: DetectorSettings,
    pub suppression: SuppressParams,
    pub annotation: AnnotationSettings,
    /// Include `processed_at` in the report.
    pub timestamp: bool,
    /// Frame count for `stub://` inputs without a `frames=` parameter.
    pub synthetic_frames: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationSettings {
    pub label_style: LabelStyle,
    pub font_path: Option<PathBuf>,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            detector: DetectorSettings::default(),
            suppression: SuppressParams::default(),
            annotation: AnnotationSettings::default(),
            timestamp: true,
            synthetic_frames: DEFAULT_SYNTHETIC_FRAMES,
        }
    }
}

impl LaneConfig {
    /// File named by `LANE_CONFIG` (if any), then `LANE_*` overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("LANE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: LaneConfigFile) -> Self {
        let defaults = Self::default();
        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            model_path: detector_file.model_path,
            labels_path: detector_file.labels_path,
            layout: detector_file.layout.unwrap_or(defaults.detector.layout),
            input_size: detector_file
                .input_size
                .unwrap_or(defaults.detector.input_size),
            confidence_threshold: detector_file
                .confidence_threshold
                .unwrap_or(defaults.detector.confidence_threshold),
            vehicle_only: detector_file.vehicle_only,
            seed: detector_file.seed,
            require_model: detector_file.require_model.unwrap_or(false),
        };
        let suppression_file = file.suppression.unwrap_or_default();
        let suppression = SuppressParams {
            score_threshold: suppression_file
                .score_threshold
                .unwrap_or(defaults.suppression.score_threshold),
            iou_threshold: suppression_file
                .iou_threshold
                .unwrap_or(defaults.suppression.iou_threshold),
        };
        let annotation_file = file.annotation.unwrap_or_default();
        let annotation = AnnotationSettings {
            label_style: annotation_file.label_style.unwrap_or_default(),
            font_path: annotation_file.font_path,
        };
        let output_file = file.output.unwrap_or_default();
        Self {
            detector,
            suppression,
            annotation,
            timestamp: output_file.timestamp.unwrap_or(defaults.timestamp),
            synthetic_frames: output_file
                .synthetic_frames
                .unwrap_or(defaults.synthetic_frames),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = non_empty_env("LANE_MODEL_PATH") {
            self.detector.model_path = Some(PathBuf::from(path));
        }
        if let Some(path) = non_empty_env("LANE_LABELS_PATH") {
            self.detector.labels_path = Some(PathBuf::from(path));
        }
        if let Some(layout) = non_empty_env("LANE_MODEL_LAYOUT") {
            self.detector.layout = layout.parse()?;
        }
        if let Some(seed) = non_empty_env("LANE_SEED") {
            self.detector.seed = Some(
                seed.parse()
                    .map_err(|_| anyhow!("LANE_SEED must be an unsigned integer"))?,
            );
        }
        if let Some(threshold) = non_empty_env("LANE_SCORE_THRESHOLD") {
            self.suppression.score_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("LANE_SCORE_THRESHOLD must be a number"))?;
        }
        if let Some(threshold) = non_empty_env("LANE_IOU_THRESHOLD") {
            self.suppression.iou_threshold = threshold
                .parse()
                .map_err(|_| anyhow!("LANE_IOU_THRESHOLD must be a number"))?;
        }
        if let Some(style) = non_empty_env("LANE_LABEL_STYLE") {
            self.annotation.label_style = style.parse()?;
        }
        if let Some(path) = non_empty_env("LANE_FONT_PATH") {
            self.annotation.font_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.suppression.score_threshold) {
            return Err(anyhow!("score_threshold must be within [0, 1]"));
        }
        if !unit.contains(&(self.suppression.iou_threshold as f32)) {
            return Err(anyhow!("iou_threshold must be within [0, 1]"));
        }
        if !unit.contains(&self.detector.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be within [0, 1]"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("input_size must be greater than zero"));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<LaneConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
