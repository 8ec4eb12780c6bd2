//! Frame ingestion.
//!
//! `FileSource` reads a lane video front to back:
//! - `stub://` paths produce synthetic frames (tests, demos)
//! - local files are decoded with FFmpeg (feature: ffmpeg)
//!
//! Sources yield frames strictly in stream order and report end of stream as
//! `Ok(None)`. A decode failure mid-stream ends the stream; it is not retried.

pub mod file;
#[cfg(feature = "ffmpeg")]
pub(crate) mod file_ffmpeg;

use anyhow::Result;

use crate::frame::{Frame, VideoInfo};

pub use file::{FileConfig, FileSource, FileStats};

/// Ordered, finite stream of frames.
pub trait FrameSource {
    fn info(&self) -> VideoInfo;

    /// Next frame in stream order, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl FrameSource for FileSource {
    fn info(&self) -> VideoInfo {
        FileSource::info(self)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        FileSource::next_frame(self)
    }
}
