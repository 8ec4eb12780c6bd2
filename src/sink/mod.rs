//! Annotated video output.
//!
//! A `FrameSink` writes to a hidden `.partial-` sibling of the requested path
//! and only renames it into place on `finish()`. A sink dropped before
//! `finish()` deletes the partial file, so a failed run never leaves a
//! truncated video under the requested name.
//!
//! - `.rgb` paths: headerless RGB24 frames, always available
//! - anything else: MPEG-4 via FFmpeg (feature: ffmpeg)

#[cfg(feature = "ffmpeg")]
mod ffmpeg_writer;
mod raw;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::LaneError;
use crate::frame::{Frame, VideoInfo};

#[cfg(feature = "ffmpeg")]
use ffmpeg_writer::FfmpegWriter;
use raw::RawWriter;

pub const RAW_EXTENSION: &str = "rgb";

enum Writer {
    Raw(RawWriter),
    #[cfg(feature = "ffmpeg")]
    Ffmpeg(FfmpegWriter),
}

pub struct FrameSink {
    writer: Option<Writer>,
    final_path: PathBuf,
    partial_path: PathBuf,
    info: VideoInfo,
    frames_written: u64,
}

impl FrameSink {
    /// Open the output for `info`-shaped frames.
    pub fn create(path: &Path, info: VideoInfo) -> Result<Self> {
        let partial_path = partial_path_for(path)?;
        let is_raw = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(RAW_EXTENSION));

        let writer = if is_raw {
            Writer::Raw(RawWriter::create(&partial_path).map_err(|err| sink_error(path, err))?)
        } else {
            open_encoded(path, &partial_path, info)?
        };
        log::info!(
            "FrameSink: writing {}x{} @ {:.2} fps to {}",
            info.width,
            info.height,
            info.fps,
            path.display()
        );

        Ok(Self {
            writer: Some(writer),
            final_path: path.to_path_buf(),
            partial_path,
            info,
            frames_written: 0,
        })
    }

    pub fn write(&mut self, frame: &Frame) -> Result<()> {
        if frame.width != self.info.width || frame.height != self.info.height {
            return Err(sink_error(
                &self.final_path,
                anyhow::anyhow!(
                    "frame {} is {}x{}, output is {}x{}",
                    frame.index,
                    frame.width,
                    frame.height,
                    self.info.width,
                    self.info.height
                ),
            ));
        }
        let result = match self.writer.as_mut() {
            Some(Writer::Raw(writer)) => writer.write(frame),
            #[cfg(feature = "ffmpeg")]
            Some(Writer::Ffmpeg(writer)) => writer.write(frame),
            None => Err(anyhow::anyhow!("sink already finished")),
        };
        result.map_err(|err| sink_error(&self.final_path, err))?;
        self.frames_written += 1;
        Ok(())
    }

    /// Flush, close and move the output into place.
    pub fn finish(mut self) -> Result<PathBuf> {
        let result = match self.writer.take() {
            Some(Writer::Raw(writer)) => writer.finish(),
            #[cfg(feature = "ffmpeg")]
            Some(Writer::Ffmpeg(writer)) => writer.finish(),
            None => Ok(()),
        }
        .and_then(|()| {
            std::fs::rename(&self.partial_path, &self.final_path)
                .context("failed to move output into place")
        });
        if let Err(err) = result {
            let _ = std::fs::remove_file(&self.partial_path);
            return Err(sink_error(&self.final_path, err));
        }
        log::info!(
            "FrameSink: wrote {} frames to {}",
            self.frames_written,
            self.final_path.display()
        );
        Ok(self.final_path.clone())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Drop for FrameSink {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            if let Err(err) = std::fs::remove_file(&self.partial_path) {
                log::warn!(
                    "FrameSink: could not remove partial output {}: {}",
                    self.partial_path.display(),
                    err
                );
            } else {
                log::warn!(
                    "FrameSink: discarded unfinished output {}",
                    self.final_path.display()
                );
            }
        }
    }
}

#[cfg(feature = "ffmpeg")]
fn open_encoded(path: &Path, partial_path: &Path, info: VideoInfo) -> Result<Writer> {
    FfmpegWriter::create(partial_path, info)
        .map(Writer::Ffmpeg)
        .map_err(|err| sink_error(path, err))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_encoded(path: &Path, _partial_path: &Path, _info: VideoInfo) -> Result<Writer> {
    Err(sink_error(
        path,
        anyhow::anyhow!(
            "encoding requires the ffmpeg feature (use a .{} output for raw frames)",
            RAW_EXTENSION
        ),
    ))
}

fn partial_path_for(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| sink_error(path, anyhow::anyhow!("output path has no file name")))?;
    let mut partial = std::ffi::OsString::from(".partial-");
    partial.push(name);
    Ok(path.with_file_name(partial))
}

fn sink_error(path: &Path, err: anyhow::Error) -> anyhow::Error {
    LaneError::SinkWrite {
        path: path.to_path_buf(),
        reason: format!("{:#}", err),
    }
    .into()
}
