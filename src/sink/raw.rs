use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::frame::Frame;

/// Headerless RGB24 frames, back to back (`ffplay -f rawvideo -pixel_format rgb24`).
pub(super) struct RawWriter {
    out: BufWriter<File>,
}

impl RawWriter {
    pub(super) fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub(super) fn write(&mut self, frame: &Frame) -> Result<()> {
        self.out
            .write_all(frame.pixels())
            .context("failed to write raw frame")
    }

    pub(super) fn finish(mut self) -> Result<()> {
        self.out.flush().context("failed to flush raw frames")?;
        self.out
            .get_ref()
            .sync_all()
            .context("failed to sync raw frames")
    }
}
