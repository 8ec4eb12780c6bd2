//! Local file frame source.

use anyhow::{anyhow, Result};

#[cfg(feature = "ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use crate::error::LaneError;
use crate::frame::{Frame, VideoInfo};

const STUB_SCHEME: &str = "stub://";

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path, or `stub://name?frames=N&width=W&height=H&fps=F`.
    pub path: String,
    /// Synthetic source defaults, overridable from the stub path query.
    pub synthetic_frames: u64,
    pub synthetic_width: u32,
    pub synthetic_height: u32,
    pub synthetic_fps: f64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            synthetic_frames: 100,
            synthetic_width: 640,
            synthetic_height: 360,
            synthetic_fps: 20.0,
        }
    }
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    /// Open the source. Fails with `LaneError::SourceOpen` when the input
    /// cannot be read.
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(source_open(
                &config.path,
                "file ingestion only supports local paths (no URL schemes)",
            ));
        }
        if config.path.starts_with(STUB_SCHEME) {
            let source = SyntheticFileSource::new(config)?;
            log::info!(
                "FileSource: opened {} (synthetic, {} frames)",
                source.config.path,
                source.config.synthetic_frames
            );
            return Ok(Self {
                backend: FileBackend::Synthetic(source),
            });
        }
        if !std::path::Path::new(&config.path).is_file() {
            return Err(source_open(&config.path, "input video not found"));
        }
        #[cfg(feature = "ffmpeg")]
        {
            let source = FfmpegFileSource::new(config.clone())
                .map_err(|err| source_open(&config.path, &format!("{:#}", err)))?;
            log::info!("FileSource: opened {} (ffmpeg)", config.path);
            Ok(Self {
                backend: FileBackend::Ffmpeg(source),
            })
        }
        #[cfg(not(feature = "ffmpeg"))]
        {
            Err(source_open(
                &config.path,
                "decoding video files requires the ffmpeg feature",
            ))
        }
    }

    pub fn info(&self) -> VideoInfo {
        match &self.backend {
            FileBackend::Synthetic(source) => source.info(),
            #[cfg(feature = "ffmpeg")]
            FileBackend::Ffmpeg(source) => source.info(),
        }
    }

    /// Next frame in stream order, or `None` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(),
        }
    }

    /// Frame count, when the source knows it up front.
    pub fn expected_frames(&self) -> Option<u64> {
        match &self.backend {
            FileBackend::Synthetic(source) => Some(source.config.synthetic_frames),
            #[cfg(feature = "ffmpeg")]
            FileBackend::Ffmpeg(_) => None,
        }
    }

    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_read: u64,
    pub path: String,
}

fn source_open(path: &str, reason: &str) -> anyhow::Error {
    LaneError::SourceOpen {
        path: path.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://)
// ----------------------------------------------------------------------------

struct SyntheticFileSource {
    config: FileConfig,
    info: VideoInfo,
    frame_count: u64,
}

impl SyntheticFileSource {
    fn new(mut config: FileConfig) -> Result<Self> {
        apply_stub_query(&mut config)?;
        if config.synthetic_width == 0 || config.synthetic_height == 0 {
            return Err(source_open(&config.path, "synthetic frames need a non-zero size"));
        }
        let info = VideoInfo::new(
            config.synthetic_width,
            config.synthetic_height,
            config.synthetic_fps,
        );
        Ok(Self {
            config,
            info,
            frame_count: 0,
        })
    }

    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_count >= self.config.synthetic_frames {
            return Ok(None);
        }
        let index = self.frame_count;
        self.frame_count += 1;
        let pixels = self.generate_pixels(index)?;
        Frame::new(pixels, self.info.width, self.info.height, index).map(Some)
    }

    fn generate_pixels(&self, index: u64) -> Result<Vec<u8>> {
        let len = self.info.frame_len()?;
        Ok((0..len)
            .map(|i| ((i as u64 / 3 + index) % 256) as u8)
            .collect())
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_read: self.frame_count,
            path: self.config.path.clone(),
        }
    }
}

/// Apply `?frames=..&width=..&height=..&fps=..` from a stub path.
fn apply_stub_query(config: &mut FileConfig) -> Result<()> {
    let Some((_, query)) = config.path.split_once('?') else {
        return Ok(());
    };
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("stub parameter '{}' has no value", pair))?;
        let invalid = || anyhow!("stub parameter {}='{}' is not a number", key, value);
        match key {
            "frames" => config.synthetic_frames = value.parse().map_err(|_| invalid())?,
            "width" => config.synthetic_width = value.parse().map_err(|_| invalid())?,
            "height" => config.synthetic_height = value.parse().map_err(|_| invalid())?,
            "fps" => config.synthetic_fps = value.parse().map_err(|_| invalid())?,
            other => return Err(anyhow!("unknown stub parameter '{}'", other)),
        }
    }
    Ok(())
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with(STUB_SCHEME) {
        return true;
    }
    !path.contains("://")
}
