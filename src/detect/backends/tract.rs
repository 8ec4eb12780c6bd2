#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::labels::LabelTable;
use crate::detect::raw::{BoxGeometry, GeometryKind, RawDetection};
use crate::detect::select::{ModelConfig, OutputLayout, VEHICLE_VOCABULARY};
use crate::frame::Frame;

/// Tract-based backend for ONNX inference.
///
/// Weights and labels are loaded once here and owned by the backend; nothing
/// is shared process-wide.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    labels: LabelTable,
    layout: OutputLayout,
    input_size: u32,
    confidence_threshold: f32,
    allowed: Option<Vec<usize>>,
}

impl TractBackend {
    /// Load an ONNX model and its label names from disk.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let model = load_model(&config.model_path, config.input_size)?;
        let mut labels = LabelTable::from_names_file(&config.labels_path)?;
        let allowed = if config.vehicle_only {
            labels = labels.with_vocabulary(VEHICLE_VOCABULARY);
            Some(
                VEHICLE_VOCABULARY
                    .iter()
                    .filter_map(|label| labels.class_id(label))
                    .collect(),
            )
        } else {
            None
        };
        log::info!(
            "tract backend: loaded {} ({} labels, {:?} layout)",
            config.model_path.display(),
            labels.len(),
            config.layout
        );

        Ok(Self {
            model,
            labels,
            layout: config.layout,
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            allowed,
        })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let view = ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(frame.width, frame.height, frame.pixels())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
        let side = self.input_size;
        let resized = imageops::resize(&view, side, side, FilterType::Triangle);

        let side = side as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn keeps(&self, class_id: usize, confidence: f32) -> bool {
        if confidence.is_nan() || confidence <= self.confidence_threshold {
            return false;
        }
        match &self.allowed {
            Some(allowed) => allowed.contains(&class_id),
            None => true,
        }
    }

    fn decode(&self, outputs: &TVec<TValue>, frame: &Frame) -> Result<Vec<RawDetection>> {
        let mut detections = Vec::new();
        for output in outputs.iter() {
            let view = output
                .to_array_view::<f32>()
                .context("model output tensor was not f32")?;
            let row_len = *view
                .shape()
                .last()
                .ok_or_else(|| anyhow!("model output has no dimensions"))?;
            if row_len == 0 {
                continue;
            }
            let values: Vec<f32> = view.iter().copied().collect();

            for row in values.chunks_exact(row_len) {
                let decoded = match self.layout {
                    OutputLayout::Center => decode_center_row(row),
                    OutputLayout::Corner => {
                        decode_corner_row(row, self.input_size, frame.width, frame.height)
                    }
                };
                if let Some(det) = decoded {
                    if self.keeps(det.class_id, det.confidence) {
                        detections.push(det);
                    }
                }
            }
        }
        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn geometry(&self) -> GeometryKind {
        match self.layout {
            OutputLayout::Center => GeometryKind::CenterFraction,
            OutputLayout::Corner => GeometryKind::CornerPixel,
        }
    }

    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(&outputs, frame)
    }
}

fn load_model(path: &Path, input_size: u32) -> Result<TypedRunnableModel<TypedModel>> {
    let side = input_size as usize;
    tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to load ONNX model from {}", path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
        )
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")
}

/// `[cx, cy, w, h, objectness, scores...]` → best class, center fractions.
fn decode_center_row(row: &[f32]) -> Option<RawDetection> {
    let scores = row.get(5..)?;
    let (class_id, confidence) = scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((idx, score)),
        })?;
    Some(RawDetection {
        class_id,
        confidence,
        geometry: BoxGeometry::Center {
            cx: row[0],
            cy: row[1],
            w: row[2],
            h: row[3],
        },
    })
}

/// `[x1, y1, x2, y2, score, class]` in model-input pixels → frame pixels.
fn decode_corner_row(
    row: &[f32],
    input_size: u32,
    frame_width: u32,
    frame_height: u32,
) -> Option<RawDetection> {
    if row.len() < 6 || !row[5].is_finite() || row[5] < 0.0 {
        return None;
    }
    let sx = frame_width as f32 / input_size as f32;
    let sy = frame_height as f32 / input_size as f32;
    Some(RawDetection {
        class_id: row[5] as usize,
        confidence: row[4],
        geometry: BoxGeometry::Corner {
            x1: row[0] * sx,
            y1: row[1] * sy,
            x2: row[2] * sx,
            y2: row[3] * sy,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_row_picks_best_class() {
        let row = [0.5, 0.4, 0.2, 0.1, 0.9, 0.1, 0.7, 0.3];
        let det = decode_center_row(&row).unwrap();
        assert_eq!(det.class_id, 1);
        assert_eq!(det.confidence, 0.7);
        assert_eq!(
            det.geometry,
            BoxGeometry::Center {
                cx: 0.5,
                cy: 0.4,
                w: 0.2,
                h: 0.1
            }
        );
    }

    #[test]
    fn center_row_without_scores_is_skipped() {
        assert!(decode_center_row(&[0.5, 0.5, 0.1, 0.1, 0.9]).is_none());
    }

    #[test]
    fn corner_row_scales_to_frame() {
        let row = [104.0, 52.0, 208.0, 104.0, 0.8, 2.0];
        let det = decode_corner_row(&row, 416, 832, 416).unwrap();
        assert_eq!(det.class_id, 2);
        assert_eq!(
            det.geometry,
            BoxGeometry::Corner {
                x1: 208.0,
                y1: 52.0,
                x2: 416.0,
                y2: 104.0
            }
        );
    }
}
