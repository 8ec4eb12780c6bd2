//! The per-frame loop: detect, normalize, suppress, annotate, aggregate, write.
//!
//! Frames are handled strictly in order; frame N+1 is not read until frame N
//! has been aggregated and written.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::aggregate::{Aggregate, Aggregator};
use crate::annotate::Annotator;
use crate::detect::DetectorBackend;
use crate::error::LaneError;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::normalize::{normalize_all, Detection};
use crate::sink::FrameSink;
use crate::suppress::{suppress, SuppressParams};

/// Outcome of a full run.
#[derive(Debug)]
pub struct RunSummary {
    pub aggregate: Aggregate,
    pub frames: u64,
    pub output: PathBuf,
}

pub struct LanePipeline {
    backend: Box<dyn DetectorBackend>,
    annotator: Annotator,
    params: SuppressParams,
}

impl LanePipeline {
    pub fn new(backend: Box<dyn DetectorBackend>, annotator: Annotator, params: SuppressParams) -> Self {
        Self {
            backend,
            annotator,
            params,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Detections that survive suppression, drawn onto the frame.
    pub fn process_frame(&mut self, frame: &mut Frame) -> Result<Vec<Detection>> {
        let raw = self.backend.detect(frame).map_err(|err| LaneError::Detector {
            backend: self.backend.name().to_string(),
            reason: format!("frame {}: {:#}", frame.index, err),
        })?;
        let normalized = normalize_all(&raw, self.backend.labels(), frame.width, frame.height);
        let kept = suppress(normalized, self.params);
        log::debug!(
            "frame {}: {} raw, {} kept",
            frame.index,
            raw.len(),
            kept.len()
        );
        self.annotator.annotate(frame, &kept);
        Ok(kept)
    }

    /// Process every frame of `source`, writing the annotated video to `output`.
    ///
    /// A zero-frame source is not an error: the aggregate comes back empty.
    /// On any error the partially written output is discarded.
    pub fn run<S: FrameSource>(&mut self, source: &mut S, output: &Path) -> Result<RunSummary> {
        self.run_with_progress(source, output, |_| {})
    }

    /// Like [`LanePipeline::run`], calling `on_frame` with the running frame
    /// count after each frame is written.
    pub fn run_with_progress<S, F>(
        &mut self,
        source: &mut S,
        output: &Path,
        mut on_frame: F,
    ) -> Result<RunSummary>
    where
        S: FrameSource,
        F: FnMut(u64),
    {
        let info = source.info();
        let mut sink = FrameSink::create(output, info)?;
        let mut aggregator = Aggregator::with_vocabulary(self.backend.labels().vocabulary());
        let mut frames = 0u64;

        while let Some(mut frame) = source.next_frame()? {
            let kept = self.process_frame(&mut frame)?;
            for detection in &kept {
                aggregator.observe(detection);
            }
            sink.write(&frame)?;
            frames += 1;
            on_frame(frames);
            if frames % 100 == 0 {
                log::info!("processed {} frames, {} vehicles so far", frames, aggregator.total());
            }
        }

        if frames == 0 {
            log::warn!("input produced no frames; reporting an empty lane");
        }
        let output = sink.finish()?;
        Ok(RunSummary {
            aggregate: aggregator.finalize(),
            frames,
            output,
        })
    }
}
