//! Freehand signature pad

use super::{new_pixmap, pixmap_to_image, SignatureArtifact};
use crate::color::Rgb;
use crate::config::FreehandConfig;
use crate::error::{Result, StampError};
use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Stroke, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Strokes recorded from pointer input, in canvas pixels.
#[derive(Debug, Clone)]
pub struct StrokeCanvas {
    width: u32,
    height: u32,
    pen_color: Rgb,
    pen_width: f64,
    strokes: Vec<Vec<Point>>,
}

impl StrokeCanvas {
    pub fn new(width: u32, height: u32, pen_color: Rgb, pen_width: f64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(StampError::InvalidGeometry(format!(
                "signature pad must not be empty, got {}x{}",
                width, height
            )));
        }
        if !(pen_width.is_finite() && pen_width > 0.0) {
            return Err(StampError::InvalidGeometry(format!(
                "pen width must be positive, got {}",
                pen_width
            )));
        }
        Ok(Self {
            width,
            height,
            pen_color,
            pen_width,
            strokes: Vec::new(),
        })
    }

    pub fn from_config(config: &FreehandConfig) -> Result<Self> {
        Self::new(
            config.canvas_width,
            config.canvas_height,
            Rgb::from_hex(&config.color)?,
            config.pen_width,
        )
    }

    /// Pen down.
    pub fn begin_stroke(&mut self, at: Point) {
        self.strokes.push(vec![at]);
    }

    /// Pen moved while down. A move with no stroke in progress starts one.
    pub fn add_point(&mut self, at: Point) {
        match self.strokes.last_mut() {
            Some(stroke) => stroke.push(at),
            None => self.begin_stroke(at),
        }
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(|s| s.is_empty())
    }

    pub fn strokes(&self) -> &[Vec<Point>] {
        &self.strokes
    }

    /// Draw every stroke onto a transparent canvas of the pad's size.
    pub fn render(&self) -> Result<RgbaImage> {
        let mut pixmap = new_pixmap(self.width, self.height)?;

        let mut paint = Paint::default();
        paint.set_color_rgba8(self.pen_color.r, self.pen_color.g, self.pen_color.b, 255);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: self.pen_width as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };

        for points in self.strokes.iter().filter(|s| !s.is_empty()) {
            let first = points[0];
            let is_dot = points.iter().all(|p| p == &first);
            if is_dot {
                let radius = (self.pen_width / 2.0) as f32;
                if let Some(dot) = PathBuilder::from_circle(first.x as f32, first.y as f32, radius) {
                    pixmap.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
                }
                continue;
            }

            let mut pb = PathBuilder::new();
            pb.move_to(first.x as f32, first.y as f32);
            for p in &points[1..] {
                pb.line_to(p.x as f32, p.y as f32);
            }
            if let Some(path) = pb.finish() {
                pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
            }
        }

        Ok(pixmap_to_image(&pixmap))
    }

    /// Render, trim to the inked area and encode.
    pub fn finish(&self) -> Result<SignatureArtifact> {
        if self.is_empty() {
            return Err(StampError::Validation("Please provide a signature".into()));
        }
        let trimmed = trim_to_ink(&self.render()?)
            .ok_or_else(|| StampError::Validation("Please provide a signature".into()))?;
        tracing::debug!(
            strokes = self.strokes.len(),
            width = trimmed.width(),
            height = trimmed.height(),
            "finished freehand signature"
        );
        SignatureArtifact::from_image(&trimmed)
    }
}

/// Crop to the bounding box of pixels with any opacity. `None` if the image
/// is fully transparent.
pub fn trim_to_ink(image: &RgbaImage) -> Option<RgbaImage> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in image.enumerate_pixels() {
        if px[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
        });
    }
    let (left, top, right, bottom) = bounds?;
    Some(imageops::crop_imm(image, left, top, right - left + 1, bottom - top + 1).to_image())
}
