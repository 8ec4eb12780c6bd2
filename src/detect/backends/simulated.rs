use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::DetectorBackend;
use crate::detect::labels::LabelTable;
use crate::detect::raw::{BoxGeometry, GeometryKind, RawDetection};
use crate::frame::Frame;

/// Labels the simulated backend draws from.
pub const SIMULATED_VOCABULARY: [&str; 6] = ["bicycle", "bus", "car", "jeep", "pedestrian", "truck"];

const MIN_BOXES: usize = 1;
const MAX_BOXES: usize = 4;
const MIN_SIDE: u32 = 40;
const MAX_SIDE: u32 = 120;
const MIN_CONFIDENCE: f32 = 0.55;
const MAX_CONFIDENCE: f32 = 0.95;

/// Simulated backend. Emits random in-frame boxes so the pipeline stays
/// runnable without a model. Same seed, same detections.
pub struct SimulatedBackend {
    rng: StdRng,
    labels: LabelTable,
}

impl SimulatedBackend {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            labels: LabelTable::new(SIMULATED_VOCABULARY).with_vocabulary(SIMULATED_VOCABULARY),
        }
    }

    fn sample_box(&mut self, frame_width: u32, frame_height: u32) -> RawDetection {
        let class_id = self.rng.gen_range(0..SIMULATED_VOCABULARY.len());
        let confidence: f32 = self.rng.gen_range(MIN_CONFIDENCE..=MAX_CONFIDENCE);
        let confidence = (confidence * 100.0).round() / 100.0;
        let w = self.rng.gen_range(MIN_SIDE..=MAX_SIDE);
        let h = self.rng.gen_range(MIN_SIDE..=MAX_SIDE);
        let x = self.rng.gen_range(0..=frame_width.saturating_sub(w));
        let y = self.rng.gen_range(0..=frame_height.saturating_sub(h));

        RawDetection {
            class_id,
            confidence,
            geometry: BoxGeometry::Corner {
                x1: x as f32,
                y1: y as f32,
                x2: (x + w) as f32,
                y2: (y + h) as f32,
            },
        }
    }
}

impl DetectorBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn geometry(&self) -> GeometryKind {
        GeometryKind::CornerPixel
    }

    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let count = self.rng.gen_range(MIN_BOXES..=MAX_BOXES);
        Ok((0..count)
            .map(|_| self.sample_box(frame.width, frame.height))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_boxes_stay_in_frame() -> Result<()> {
        let mut backend = SimulatedBackend::new(Some(7));
        let frame = Frame::filled(320, 240, 0, [0, 0, 0])?;

        for _ in 0..50 {
            let detections = backend.detect(&frame)?;
            assert!((MIN_BOXES..=MAX_BOXES).contains(&detections.len()));
            for det in detections {
                assert!(det.confidence >= MIN_CONFIDENCE && det.confidence <= MAX_CONFIDENCE);
                assert!(backend.labels().label_for(det.class_id).is_some());
                let BoxGeometry::Corner { x1, y1, x2, y2 } = det.geometry else {
                    panic!("simulated backend must emit corner boxes");
                };
                assert!(x1 >= 0.0 && y1 >= 0.0);
                assert!(x2 <= 320.0 && y2 <= 240.0);
                assert!((40.0..=120.0).contains(&(x2 - x1)));
            }
        }
        Ok(())
    }

    #[test]
    fn same_seed_same_detections() -> Result<()> {
        let frame = Frame::filled(640, 360, 0, [0, 0, 0])?;
        let mut a = SimulatedBackend::new(Some(42));
        let mut b = SimulatedBackend::new(Some(42));
        for _ in 0..10 {
            assert_eq!(a.detect(&frame)?, b.detect(&frame)?);
        }
        Ok(())
    }

    #[test]
    fn tiny_frames_pin_boxes_to_origin() -> Result<()> {
        let mut backend = SimulatedBackend::new(Some(1));
        let frame = Frame::filled(30, 30, 0, [0, 0, 0])?;
        for det in backend.detect(&frame)? {
            let BoxGeometry::Corner { x1, y1, .. } = det.geometry else {
                panic!("expected corner box");
            };
            assert_eq!((x1, y1), (0.0, 0.0));
        }
        Ok(())
    }
}
