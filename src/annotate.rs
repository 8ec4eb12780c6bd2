//! Frame annotation: box outlines and "label confidence" captions.
//!
//! The annotator only decides *what* goes where. Pixels are touched through
//! the `DrawTarget` seam, implemented by `Frame`.

use std::path::Path;

use ab_glyph::FontArc;
use anyhow::{Context, Result};
use imageproc::drawing::text_size;
use serde::Deserialize;

use crate::normalize::Detection;

/// Box outline colour (blue).
pub const BOX_COLOR: [u8; 3] = [0, 0, 255];
/// Caption colour.
pub const TEXT_COLOR: [u8; 3] = [255, 255, 255];
pub const BOX_THICKNESS: u32 = 2;
/// Gap between the caption baseline and the top edge of its box.
pub const CAPTION_GAP: i32 = 5;
const DEFAULT_TEXT_SCALE: f32 = 16.0;
/// DejaVu Sans, used when no caption font is configured.
static BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Anything the annotator can draw on.
pub trait DrawTarget {
    fn outline(&mut self, x: i32, y: i32, width: u32, height: u32, color: [u8; 3], thickness: u32);

    fn text(&mut self, x: i32, y: i32, text: &str, style: &TextStyle);
}

/// How confidence is rendered in a caption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    /// `car 0.87`
    #[default]
    Decimal,
    /// `car 87%`
    Percent,
}

impl LabelStyle {
    pub fn caption(self, label: &str, confidence: f32) -> String {
        match self {
            LabelStyle::Decimal => format!("{} {:.2}", label, confidence),
            LabelStyle::Percent => format!("{} {}%", label, (confidence * 100.0) as i32),
        }
    }
}

impl std::str::FromStr for LabelStyle {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "decimal" => Ok(LabelStyle::Decimal),
            "percent" => Ok(LabelStyle::Percent),
            other => Err(anyhow::anyhow!(
                "label style must be 'decimal' or 'percent', got '{}'",
                other
            )),
        }
    }
}

/// Caption font settings. Without a font, captions are laid out but not rendered.
/// The default carries the bundled DejaVu Sans.
#[derive(Clone)]
pub struct TextStyle {
    pub font: Option<FontArc>,
    pub scale: f32,
    pub color: [u8; 3],
}

impl TextStyle {
    pub fn load(font_path: Option<&Path>) -> Result<Self> {
        let font = match font_path {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("failed to read font {}", path.display()))?;
                let font = FontArc::try_from_vec(bytes)
                    .with_context(|| format!("invalid font file {}", path.display()))?;
                Some(font)
            }
            None => bundled_font(),
        };
        Ok(Self {
            font,
            ..Self::default()
        })
    }

    /// Rendered height of a caption, in pixels.
    pub fn line_height(&self, text: &str) -> u32 {
        match &self.font {
            Some(font) => text_size(self.scale, font, text).1,
            None => self.scale.ceil() as u32,
        }
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: bundled_font(),
            scale: DEFAULT_TEXT_SCALE,
            color: TEXT_COLOR,
        }
    }
}

fn bundled_font() -> Option<FontArc> {
    match FontArc::try_from_slice(BUNDLED_FONT) {
        Ok(font) => Some(font),
        Err(err) => {
            log::warn!("bundled caption font is unusable, captions disabled: {}", err);
            None
        }
    }
}

/// Where a detection's outline and caption land on the frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub caption: String,
    pub caption_x: i32,
    pub caption_y: i32,
}

pub struct Annotator {
    label_style: LabelStyle,
    text: TextStyle,
}

impl Annotator {
    pub fn new(label_style: LabelStyle, text: TextStyle) -> Self {
        Self { label_style, text }
    }

    pub fn place(&self, detection: &Detection) -> Placement {
        let x = detection.bbox.x.round() as i32;
        let y = detection.bbox.y.round() as i32;
        let width = detection.bbox.w.round().max(1.0) as u32;
        let height = detection.bbox.h.round().max(1.0) as u32;
        let caption = self
            .label_style
            .caption(&detection.label, detection.confidence);
        let text_height = self.text.line_height(&caption) as i32;
        let caption_y = (y - CAPTION_GAP - text_height).max(0);
        Placement {
            x,
            y,
            width,
            height,
            caption,
            caption_x: x.max(0),
            caption_y,
        }
    }

    /// Draw every detection onto the target, in order.
    pub fn annotate<T: DrawTarget>(&self, target: &mut T, detections: &[Detection]) {
        for detection in detections {
            let placement = self.place(detection);
            target.outline(
                placement.x,
                placement.y,
                placement.width,
                placement.height,
                BOX_COLOR,
                BOX_THICKNESS,
            );
            target.text(
                placement.caption_x,
                placement.caption_y,
                &placement.caption,
                &self.text,
            );
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new(LabelStyle::default(), TextStyle::default())
    }
}
