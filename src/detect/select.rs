//! Backend selection.
//!
//! Exactly one backend is built per run. A model-backed backend is used when
//! a model is configured, present on disk, and compiled in; otherwise the
//! simulated backend keeps the pipeline runnable unless `require_model` is set.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use super::backend::DetectorBackend;
use super::backends::SimulatedBackend;

/// Labels kept by a vehicle-only model, and reported at zero when unseen.
pub const VEHICLE_VOCABULARY: [&str; 4] = ["car", "bus", "truck", "motorbike"];

pub const DEFAULT_INPUT_SIZE: u32 = 416;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
/// Names file looked up next to the model when no labels path is given.
pub const DEFAULT_LABELS_FILE: &str = "coco.names";

/// How a model's output rows are laid out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLayout {
    /// `[cx, cy, w, h, objectness, class scores...]`, coordinates as fractions
    /// of the frame.
    #[default]
    Center,
    /// `[x1, y1, x2, y2, score, class]` in model-input pixels.
    Corner,
}

impl std::str::FromStr for OutputLayout {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "center" => Ok(OutputLayout::Center),
            "corner" => Ok(OutputLayout::Corner),
            other => Err(anyhow!(
                "output layout must be 'center' or 'corner', got '{}'",
                other
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorSettings {
    pub model_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub layout: OutputLayout,
    pub input_size: u32,
    pub confidence_threshold: f32,
    /// Keep only `VEHICLE_VOCABULARY`. Defaults to true for the center layout.
    pub vehicle_only: Option<bool>,
    /// Seed for the simulated backend.
    pub seed: Option<u64>,
    /// Fail instead of falling back to the simulated backend.
    pub require_model: bool,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            labels_path: None,
            layout: OutputLayout::default(),
            input_size: DEFAULT_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            vehicle_only: None,
            seed: None,
            require_model: false,
        }
    }
}

/// Fully resolved model settings, handed to a model-backed backend.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub layout: OutputLayout,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub vehicle_only: bool,
}

impl DetectorSettings {
    /// Resolve the model settings, or `None` when no usable model is on disk.
    pub fn model_config(&self) -> Result<Option<ModelConfig>> {
        let Some(model_path) = self.model_path.clone() else {
            return Ok(None);
        };
        if !model_path.is_file() {
            if self.require_model {
                return Err(anyhow!("model not found at {}", model_path.display()));
            }
            log::warn!(
                "model {} not found; falling back to simulated detections",
                model_path.display()
            );
            return Ok(None);
        }
        let labels_path = match &self.labels_path {
            Some(path) => path.clone(),
            None => model_path
                .parent()
                .map(|dir| dir.join(DEFAULT_LABELS_FILE))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LABELS_FILE)),
        };
        if !labels_path.is_file() {
            return Err(anyhow!("label names not found at {}", labels_path.display()));
        }
        Ok(Some(ModelConfig {
            model_path,
            labels_path,
            layout: self.layout,
            input_size: self.input_size,
            confidence_threshold: self.confidence_threshold,
            vehicle_only: self
                .vehicle_only
                .unwrap_or(self.layout == OutputLayout::Center),
        }))
    }
}

/// Build the backend for this run.
pub fn select_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let mut backend: Box<dyn DetectorBackend> = match settings.model_config()? {
        Some(model) => model_backend(settings, &model)?,
        None if settings.require_model => {
            return Err(anyhow!("a model is required but none was configured"));
        }
        None => Box::new(SimulatedBackend::new(settings.seed)),
    };
    backend.warm_up()?;
    log::info!("detector backend: {}", backend.name());
    Ok(backend)
}

#[cfg(feature = "backend-tract")]
fn model_backend(
    _settings: &DetectorSettings,
    model: &ModelConfig,
) -> Result<Box<dyn DetectorBackend>> {
    Ok(Box::new(super::backends::TractBackend::new(model)?))
}

#[cfg(not(feature = "backend-tract"))]
fn model_backend(
    settings: &DetectorSettings,
    model: &ModelConfig,
) -> Result<Box<dyn DetectorBackend>> {
    if settings.require_model {
        return Err(anyhow!(
            "model {} requires the backend-tract feature",
            model.model_path.display()
        ));
    }
    log::warn!(
        "backend-tract feature not enabled; ignoring model {} and using simulated detections",
        model.model_path.display()
    );
    Ok(Box::new(SimulatedBackend::new(settings.seed)))
}
