/// Box coordinate convention a backend emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryKind {
    /// Center and size as fractions of frame width/height.
    CenterFraction,
    /// Absolute pixel corners.
    CornerPixel,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoxGeometry {
    Center { cx: f32, cy: f32, w: f32, h: f32 },
    Corner { x1: f32, y1: f32, x2: f32, y2: f32 },
}

impl BoxGeometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            BoxGeometry::Center { .. } => GeometryKind::CenterFraction,
            BoxGeometry::Corner { .. } => GeometryKind::CornerPixel,
        }
    }
}

/// Detector output before label lookup and coordinate normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    pub geometry: BoxGeometry,
}
