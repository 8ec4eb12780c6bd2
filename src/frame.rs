//! Decoded video frames.
//!
//! - `VideoInfo`: stream geometry and rate, known once the source is open.
//! - `Frame`: one RGB24 frame owned by the pipeline for the duration of a loop
//!   iteration. Detectors read it, the annotator draws on it, the sink
//!   consumes it.

use ab_glyph::FontArc;
use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::annotate::{DrawTarget, TextStyle};

/// Frame rate used when a container reports 0 fps.
pub const FALLBACK_FPS: f64 = 20.0;

/// Geometry and timing of a video stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl VideoInfo {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            FALLBACK_FPS
        };
        Self { width, height, fps }
    }

    /// Number of bytes in one RGB24 frame.
    pub fn frame_len(&self) -> Result<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))
    }
}

/// One decoded RGB24 frame.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Zero-based position in the source stream.
    pub index: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = VideoInfo::new(width, height, FALLBACK_FPS).frame_len()?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            index,
        })
    }

    /// Solid-colour frame, mostly useful for synthetic sources and tests.
    pub fn filled(width: u32, height: u32, index: u64, rgb: [u8; 3]) -> Result<Self> {
        let len = VideoInfo::new(width, height, FALLBACK_FPS).frame_len()?;
        let data = rgb.iter().copied().cycle().take(len).collect();
        Self::new(data, width, height, index)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Lend the pixel buffer to `image` for in-place drawing.
    fn with_image(&mut self, draw: impl FnOnce(&mut RgbImage)) {
        let data = std::mem::take(&mut self.data);
        // Length is checked in `Frame::new`, so this only fails on a broken invariant.
        if let Some(mut image) = RgbImage::from_raw(self.width, self.height, data) {
            draw(&mut image);
            self.data = image.into_raw();
        }
    }
}

impl DrawTarget for Frame {
    fn outline(&mut self, x: i32, y: i32, width: u32, height: u32, color: [u8; 3], thickness: u32) {
        self.with_image(|image| {
            // Grow inwards so a box touching the frame edge keeps every stroke visible.
            for inset in 0..thickness {
                let w = width.saturating_sub(inset * 2);
                let h = height.saturating_sub(inset * 2);
                if w == 0 || h == 0 {
                    break;
                }
                let rect = Rect::at(x + inset as i32, y + inset as i32).of_size(w, h);
                draw_hollow_rect_mut(image, rect, Rgb(color));
            }
        });
    }

    fn text(&mut self, x: i32, y: i32, text: &str, style: &TextStyle) {
        let Some(font) = style.font.as_ref() else {
            return;
        };
        let font: &FontArc = font;
        let scale = style.scale;
        let color = style.color;
        self.with_image(|image| {
            draw_text_mut(image, Rgb(color), x, y, scale, font, text);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fps_falls_back_to_default() {
        assert_eq!(VideoInfo::new(640, 360, 0.0).fps, FALLBACK_FPS);
        assert_eq!(VideoInfo::new(640, 360, f64::NAN).fps, FALLBACK_FPS);
        assert_eq!(VideoInfo::new(640, 360, 25.0).fps, 25.0);
    }

    #[test]
    fn frame_rejects_wrong_length() {
        assert!(Frame::new(vec![0u8; 10], 2, 2, 0).is_err());
        assert!(Frame::new(vec![0u8; 12], 2, 2, 0).is_ok());
    }

    #[test]
    fn outline_draws_in_place() -> Result<()> {
        let mut frame = Frame::filled(20, 20, 0, [0, 0, 0])?;
        frame.outline(2, 2, 10, 10, [0, 0, 255], 2);

        assert_eq!(frame.pixel(2, 2), Some([0, 0, 255]));
        assert_eq!(frame.pixel(3, 3), Some([0, 0, 255]));
        assert_eq!(frame.pixel(6, 6), Some([0, 0, 0]));
        assert_eq!(frame.pixel(11, 11), Some([0, 0, 255]));
        Ok(())
    }

    #[test]
    fn outline_clips_out_of_frame_boxes() -> Result<()> {
        let mut frame = Frame::filled(8, 8, 0, [0, 0, 0])?;
        frame.outline(-4, -4, 20, 20, [255, 255, 255], 1);
        assert_eq!(frame.pixel(4, 4), Some([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn default_annotator_renders_caption_above_box() -> Result<()> {
        use crate::annotate::Annotator;
        use crate::normalize::{Detection, PixelBox};

        let mut frame = Frame::filled(200, 150, 0, [0, 0, 0])?;
        let car = Detection {
            label: "car".to_string(),
            confidence: 0.9,
            bbox: PixelBox {
                x: 50.0,
                y: 80.0,
                w: 60.0,
                h: 40.0,
            },
            frame_width: 200,
            frame_height: 150,
        };
        Annotator::default().annotate(&mut frame, &[car]);

        let lit = (0..75u32)
            .flat_map(|y| (0..200u32).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.pixel(x, y) != Some([0, 0, 0]))
            .count();
        assert!(lit > 0, "caption pixels expected above the box");
        assert_eq!(frame.pixel(50, 80), Some(crate::annotate::BOX_COLOR));
        Ok(())
    }
}
