mod backend;
pub mod backends;
mod labels;
mod raw;
pub mod select;

pub use backend::DetectorBackend;
pub use backends::{SimulatedBackend, SIMULATED_VOCABULARY};
pub use labels::LabelTable;
pub use raw::{BoxGeometry, GeometryKind, RawDetection};
pub use select::{select_backend, DetectorSettings, ModelConfig, OutputLayout, VEHICLE_VOCABULARY};
