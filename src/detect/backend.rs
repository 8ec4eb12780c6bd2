use anyhow::Result;

use super::labels::LabelTable;
use super::raw::{GeometryKind, RawDetection};
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend is chosen once at startup and handed to the pipeline as a
/// `Box<dyn DetectorBackend>`. The pipeline never asks which one it has.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Coordinate convention of every `RawDetection` this backend returns.
    fn geometry(&self) -> GeometryKind;

    /// Class id → label mapping for this backend's output.
    fn labels(&self) -> &LabelTable;

    /// Run detection on a frame.
    ///
    /// Backends apply their own confidence cutoff; everything returned is a
    /// candidate for normalization and overlap suppression.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
