//! Lane Signal
//!
//! Turns one lane's video into a congestion report and an annotated copy of
//! the video.
//!
//! # Pipeline
//!
//! Every frame passes through the same stages, in stream order:
//!
//! 1. **Detect**: a `DetectorBackend` proposes raw boxes (model or simulated).
//! 2. **Normalize**: raw geometry becomes labelled pixel boxes.
//! 3. **Suppress**: greedy, class-agnostic non-maximum suppression.
//! 4. **Aggregate**: survivors are counted and the first few sampled.
//! 5. **Annotate**: survivors are outlined and captioned on the frame.
//! 6. **Write**: the frame goes to the output video.
//!
//! After the last frame the aggregate is classified into a signal phase
//! (`green`, `amber`, `red`) and serialized as a `LaneReport`.
//!
//! # Module Structure
//!
//! - `ingest`: frame sources (`stub://` synthetic, local files via FFmpeg)
//! - `detect`: detector backends and backend selection
//! - `normalize`, `suppress`, `aggregate`, `phase`: per-frame and per-run logic
//! - `annotate`, `sink`: drawing and output video
//! - `pipeline`, `report`: the frame loop and its JSON result

pub mod aggregate;
pub mod annotate;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod normalize;
pub mod phase;
pub mod pipeline;
pub mod report;
pub mod sink;
pub mod suppress;
pub mod ui;

pub use aggregate::{Aggregate, Aggregator, PercentBox, SampleDetection, MAX_SAMPLES};
pub use annotate::{Annotator, DrawTarget, LabelStyle, TextStyle};
pub use config::LaneConfig;
pub use detect::{select_backend, DetectorBackend, DetectorSettings};
pub use error::{DetectionError, LaneError};
pub use frame::{Frame, VideoInfo};
pub use ingest::{FileConfig, FileSource, FrameSource};
pub use normalize::{normalize, Detection, PixelBox};
pub use phase::{classify, Phase};
pub use pipeline::{LanePipeline, RunSummary};
pub use report::LaneReport;
pub use sink::FrameSink;
pub use suppress::{suppress, SuppressParams};
