//! Raw detector output → canonical pixel-space detections.

use crate::detect::{BoxGeometry, LabelTable, RawDetection};
use crate::error::DetectionError;

/// Axis-aligned box in absolute pixels. May extend past the frame edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl PixelBox {
    pub fn area(&self) -> f64 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Intersection over union; 0 for disjoint boxes or an empty union.
    pub fn iou(&self, other: &PixelBox) -> f64 {
        let ix = (self.right().min(other.right()) - self.x.max(other.x)).max(0.0);
        let iy = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0);
        let intersection = ix * iy;
        if intersection <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// A labelled detection in frame pixel space.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: PixelBox,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// Resolve the label and convert the box to absolute pixels.
///
/// Center boxes with a NaN or infinite component are rejected, as is any box
/// without a positive width and height. No confidence filtering happens here.
pub fn normalize(
    raw: &RawDetection,
    labels: &LabelTable,
    frame_width: u32,
    frame_height: u32,
) -> Result<Detection, DetectionError> {
    let label = labels
        .label_for(raw.class_id)
        .ok_or(DetectionError::UnknownClass(raw.class_id))?;

    let fw = frame_width as f64;
    let fh = frame_height as f64;
    let bbox = match raw.geometry {
        BoxGeometry::Center { cx, cy, w, h } => {
            if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
                return Err(DetectionError::NonFiniteGeometry { cx, cy, w, h });
            }
            let (cx, cy, w, h) = (cx as f64, cy as f64, w as f64, h as f64);
            PixelBox {
                x: cx * fw - w * fw / 2.0,
                y: cy * fh - h * fh / 2.0,
                w: w * fw,
                h: h * fh,
            }
        }
        BoxGeometry::Corner { x1, y1, x2, y2 } => PixelBox {
            x: x1 as f64,
            y: y1 as f64,
            w: (x2 - x1) as f64,
            h: (y2 - y1) as f64,
        },
    };
    if !(bbox.w > 0.0 && bbox.h > 0.0) {
        return Err(DetectionError::DegenerateBox {
            w: bbox.w,
            h: bbox.h,
        });
    }

    Ok(Detection {
        label: label.to_string(),
        confidence: raw.confidence,
        bbox,
        frame_width,
        frame_height,
    })
}

/// Normalize a frame's raw detections, dropping the ones that fail.
pub fn normalize_all(
    raw: &[RawDetection],
    labels: &LabelTable,
    frame_width: u32,
    frame_height: u32,
) -> Vec<Detection> {
    raw.iter()
        .filter_map(|det| match normalize(det, labels, frame_width, frame_height) {
            Ok(detection) => Some(detection),
            Err(err) => {
                log::debug!("dropping detection: {}", err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelTable {
        LabelTable::new(["car", "bus"])
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn center_box_scales_to_pixels() {
        let raw = RawDetection {
            class_id: 0,
            confidence: 0.8,
            geometry: BoxGeometry::Center {
                cx: 0.5,
                cy: 0.5,
                w: 0.2,
                h: 0.2,
            },
        };
        let det = normalize(&raw, &labels(), 100, 100).unwrap();
        assert_eq!(det.label, "car");
        assert!(approx(det.bbox.x, 40.0));
        assert!(approx(det.bbox.y, 40.0));
        assert!(approx(det.bbox.w, 20.0));
        assert!(approx(det.bbox.h, 20.0));
    }

    #[test]
    fn center_box_uses_each_axis() {
        let raw = RawDetection {
            class_id: 1,
            confidence: 0.6,
            geometry: BoxGeometry::Center {
                cx: 0.25,
                cy: 0.5,
                w: 0.5,
                h: 0.25,
            },
        };
        let det = normalize(&raw, &labels(), 200, 400).unwrap();
        assert!(approx(det.bbox.x, 0.0));
        assert!(approx(det.bbox.y, 150.0));
        assert!(approx(det.bbox.w, 100.0));
        assert!(approx(det.bbox.h, 100.0));
    }

    #[test]
    fn corner_box_passes_through() {
        let raw = RawDetection {
            class_id: 1,
            confidence: 0.7,
            geometry: BoxGeometry::Corner {
                x1: 10.0,
                y1: 20.0,
                x2: 40.0,
                y2: 60.0,
            },
        };
        let det = normalize(&raw, &labels(), 100, 200).unwrap();
        assert_eq!(
            det.bbox,
            PixelBox {
                x: 10.0,
                y: 20.0,
                w: 30.0,
                h: 40.0
            }
        );
        assert_eq!(det.label, "bus");
    }

    #[test]
    fn non_finite_center_box_is_rejected() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let raw = RawDetection {
                class_id: 0,
                confidence: 0.9,
                geometry: BoxGeometry::Center {
                    cx: 0.5,
                    cy: bad,
                    w: 0.1,
                    h: 0.1,
                },
            };
            assert!(matches!(
                normalize(&raw, &labels(), 100, 100),
                Err(DetectionError::NonFiniteGeometry { .. })
            ));
        }
    }

    #[test]
    fn boxes_without_area_are_rejected() {
        for (x2, y2) in [(10.0, 60.0), (4.0, 60.0), (40.0, 20.0), (f32::NAN, 60.0)] {
            let raw = RawDetection {
                class_id: 0,
                confidence: 0.9,
                geometry: BoxGeometry::Corner {
                    x1: 10.0,
                    y1: 20.0,
                    x2,
                    y2,
                },
            };
            assert!(matches!(
                normalize(&raw, &labels(), 100, 100),
                Err(DetectionError::DegenerateBox { .. })
            ));
        }

        let flat = RawDetection {
            class_id: 0,
            confidence: 0.9,
            geometry: BoxGeometry::Center {
                cx: 0.5,
                cy: 0.5,
                w: 0.0,
                h: 0.1,
            },
        };
        assert!(normalize_all(&[flat], &labels(), 100, 100).is_empty());
    }

    #[test]
    fn unknown_class_is_rejected() {
        let raw = RawDetection {
            class_id: 9,
            confidence: 0.9,
            geometry: BoxGeometry::Corner {
                x1: 0.0,
                y1: 0.0,
                x2: 1.0,
                y2: 1.0,
            },
        };
        assert_eq!(
            normalize(&raw, &labels(), 10, 10),
            Err(DetectionError::UnknownClass(9))
        );
    }

    #[test]
    fn normalize_all_drops_only_bad_rows() {
        let good = RawDetection {
            class_id: 0,
            confidence: 0.9,
            geometry: BoxGeometry::Center {
                cx: 0.5,
                cy: 0.5,
                w: 0.1,
                h: 0.1,
            },
        };
        let nan = RawDetection {
            geometry: BoxGeometry::Center {
                cx: f32::NAN,
                cy: 0.5,
                w: 0.1,
                h: 0.1,
            },
            ..good.clone()
        };
        let out = normalize_all(&[nan, good.clone(), good], &labels(), 100, 100);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn iou_of_disjoint_and_identical_boxes() {
        let a = PixelBox {
            x: 0.0,
            y: 0.0,
            w: 10.0,
            h: 10.0,
        };
        let b = PixelBox {
            x: 20.0,
            y: 0.0,
            w: 10.0,
            h: 10.0,
        };
        assert_eq!(a.iou(&b), 0.0);
        assert_eq!(a.iou(&a), 1.0);

        let half = PixelBox {
            x: 5.0,
            y: 0.0,
            w: 10.0,
            h: 10.0,
        };
        assert!(approx(a.iou(&half), 50.0 / 150.0));
    }
}
