//! Debug overlay.
//!
//! Converts relative detection boxes to absolute pixel rectangles and hands
//! them, with a `"<label>\n<score>"` caption, to an `Annotator`. Overlay
//! faults are best-effort: the scheduler logs them and actuation proceeds.

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use crate::detect::{BoundingBox, DetectionResultSet};
use crate::error::AgentError;
use crate::frame::Frame;
use crate::labels::LabelCatalog;

/// Absolute pixel rectangle, inclusive-exclusive bounds within the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.xmax.saturating_sub(self.xmin)
    }

    pub fn height(&self) -> u32 {
        self.ymax.saturating_sub(self.ymin)
    }
}

/// `floor(rel * dim)` per edge, x against width and y against height.
///
/// Results are clamped into `[0, dim]`; well-formed boxes never need it.
pub fn to_pixel_rect(bbox: &BoundingBox, width: u32, height: u32) -> PixelRect {
    PixelRect {
        xmin: scale(bbox.xmin, width),
        ymin: scale(bbox.ymin, height),
        xmax: scale(bbox.xmax, width),
        ymax: scale(bbox.ymax, height),
    }
}

fn scale(relative: f32, dim: u32) -> u32 {
    let absolute = (f64::from(relative) * f64::from(dim)).floor();
    if absolute.is_nan() {
        return 0;
    }
    absolute.clamp(0.0, f64::from(dim)) as u32
}

pub fn caption(label: &str, score: f32) -> String {
    format!("{}\n{:.2}", label, score)
}

/// Overlay drawing capability.
pub trait Annotator {
    /// Start a fresh overlay for `frame`.
    fn clear(&mut self, frame: &Frame) -> Result<()>;

    fn bounding_box(&mut self, rect: PixelRect) -> Result<()>;

    /// Draw `text` with its top-left corner at `origin`.
    fn text(&mut self, origin: (u32, u32), text: &str) -> Result<()>;

    /// Publish the overlay.
    fn update(&mut self) -> Result<()>;
}

/// Draw every detection of a frame.
pub fn annotate_detections<A: Annotator + ?Sized>(
    annotator: &mut A,
    frame: &Frame,
    detections: &DetectionResultSet,
    labels: &LabelCatalog,
) -> crate::error::Result<()> {
    annotator.clear(frame).map_err(AgentError::Annotation)?;
    for detection in detections {
        let rect = to_pixel_rect(&detection.bounding_box, frame.width(), frame.height());
        let label = labels.label(detection.class_id)?;
        annotator
            .bounding_box(rect)
            .map_err(AgentError::Annotation)?;
        annotator
            .text((rect.xmin, rect.ymin), &caption(label, detection.score))
            .map_err(AgentError::Annotation)?;
    }
    annotator.update().map_err(AgentError::Annotation)
}

// ----------------------------------------------------------------------------
// Image file annotator
// ----------------------------------------------------------------------------

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const TEXT_SCALE: f32 = 16.0;

/// Draws on a copy of the frame and writes it to `path` on `update`.
///
/// Captions need a TrueType font; without one only boxes are drawn.
pub struct ImageAnnotator {
    path: PathBuf,
    font: Option<FontVec>,
    canvas: Option<RgbImage>,
}

impl ImageAnnotator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            font: None,
            canvas: None,
        }
    }

    pub fn with_font_file<P: AsRef<Path>>(mut self, font_path: P) -> Result<Self> {
        let font_path = font_path.as_ref();
        let bytes = std::fs::read(font_path)
            .with_context(|| format!("read font {}", font_path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow!("invalid font {}: {}", font_path.display(), e))?;
        self.font = Some(font);
        Ok(self)
    }
}

impl Annotator for ImageAnnotator {
    fn clear(&mut self, frame: &Frame) -> Result<()> {
        self.canvas = Some(frame.image().clone());
        Ok(())
    }

    fn bounding_box(&mut self, rect: PixelRect) -> Result<()> {
        let canvas = self
            .canvas
            .as_mut()
            .ok_or_else(|| anyhow!("annotator used before clear"))?;
        let outline = Rect::at(rect.xmin as i32, rect.ymin as i32)
            .of_size(rect.width().max(1), rect.height().max(1));
        draw_hollow_rect_mut(canvas, outline, BOX_COLOR);
        Ok(())
    }

    fn text(&mut self, origin: (u32, u32), text: &str) -> Result<()> {
        let Some(font) = self.font.as_ref() else {
            log::debug!("no overlay font configured, caption skipped: {:?}", text);
            return Ok(());
        };
        let canvas = self
            .canvas
            .as_mut()
            .ok_or_else(|| anyhow!("annotator used before clear"))?;
        for (line_no, line) in text.lines().enumerate() {
            let y = origin.1 as f32 + line_no as f32 * TEXT_SCALE;
            draw_text_mut(
                canvas,
                TEXT_COLOR,
                origin.0 as i32,
                y as i32,
                PxScale::from(TEXT_SCALE),
                font,
                line,
            );
        }
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        let canvas = self
            .canvas
            .take()
            .ok_or_else(|| anyhow!("annotator used before clear"))?;
        canvas
            .save(&self.path)
            .with_context(|| format!("write overlay to {}", self.path.display()))
    }
}
