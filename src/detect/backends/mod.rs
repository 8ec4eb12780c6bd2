pub mod simulated;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use simulated::{SimulatedBackend, SIMULATED_VOCABULARY};

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
