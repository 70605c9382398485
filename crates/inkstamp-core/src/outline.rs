//! Outline fonts for raster drawing
//!
//! Raster export and typed signatures fill glyph outlines with tiny-skia.
//! `OutlineFont` wraps a TrueType/OpenType face parsed by rusttype; the
//! `GlyphOutlines` trait is the seam the drawing code depends on.

use crate::error::{Result, StampError};
use crate::fonts::TextMeasure;
use rusttype::{point, Font, OutlineBuilder, Scale};
use std::fmt;
use std::path::Path;
use tiny_skia::PathBuilder;

/// Vertical metrics at a given size, y growing downward from the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    /// Distance from baseline to the top of the em box (positive).
    pub ascent: f64,
    /// Distance from baseline to the bottom of the em box (positive).
    pub descent: f64,
}

pub trait GlyphOutlines: TextMeasure {
    fn line_metrics(&self, size: f64) -> LineMetrics;

    /// Outline of `text` laid out on one line with its baseline starting at
    /// `(x, baseline)` in a y-down pixel space. `None` when nothing is inked.
    fn line_path(&self, text: &str, size: f64, x: f64, baseline: f64) -> Option<tiny_skia::Path>;
}

/// A TrueType/OpenType font parsed from bytes.
pub struct OutlineFont {
    name: String,
    font: Font<'static>,
}

impl fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineFont").field("name", &self.name).finish()
    }
}

impl OutlineFont {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| StampError::FontParse(format!("{} is not a usable TrueType/OpenType font", name)))?;
        Ok(Self { name, font })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            StampError::FontUnavailable(format!("{}: {}", path.display(), e))
        })?;
        Self::from_bytes(path.display().to_string(), bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TextMeasure for OutlineFont {
    fn text_width(&self, text: &str, size: f64) -> f64 {
        let scale = Scale::uniform(size as f32);
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0) as f64
    }
}

impl GlyphOutlines for OutlineFont {
    fn line_metrics(&self, size: f64) -> LineMetrics {
        let v = self.font.v_metrics(Scale::uniform(size as f32));
        LineMetrics {
            ascent: v.ascent as f64,
            descent: -v.descent as f64,
        }
    }

    fn line_path(&self, text: &str, size: f64, x: f64, baseline: f64) -> Option<tiny_skia::Path> {
        let scale = Scale::uniform(size as f32);
        let mut sink = PathSink::default();
        for glyph in self
            .font
            .layout(text, scale, point(x as f32, baseline as f32))
        {
            glyph.build_outline(&mut sink);
        }
        sink.builder.finish()
    }
}

/// Feeds rusttype outline callbacks into a tiny-skia path.
#[derive(Default)]
struct PathSink {
    builder: PathBuilder,
}

impl OutlineBuilder for PathSink {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Block glyphs for tests: every non-space character is a filled box
/// `0.5 em` wide and `0.7 em` tall; spaces advance `0.25 em`.
#[cfg(test)]
pub(crate) struct BlockFont;

#[cfg(test)]
impl TextMeasure for BlockFont {
    fn text_width(&self, text: &str, size: f64) -> f64 {
        text.chars()
            .map(|c| if c == ' ' { 0.25 } else { 0.5 })
            .sum::<f64>()
            * size
    }
}

#[cfg(test)]
impl GlyphOutlines for BlockFont {
    fn line_metrics(&self, size: f64) -> LineMetrics {
        LineMetrics {
            ascent: 0.8 * size,
            descent: 0.2 * size,
        }
    }

    fn line_path(&self, text: &str, size: f64, x: f64, baseline: f64) -> Option<tiny_skia::Path> {
        let mut pb = PathBuilder::new();
        let mut pen = x;
        for c in text.chars() {
            if c == ' ' {
                pen += 0.25 * size;
                continue;
            }
            if let Some(rect) = tiny_skia::Rect::from_xywh(
                pen as f32,
                (baseline - 0.7 * size) as f32,
                (0.45 * size) as f32,
                (0.7 * size) as f32,
            ) {
                pb.push_rect(rect);
            }
            pen += 0.5 * size;
        }
        pb.finish()
    }
}
