//! Typed signatures rendered in a decorative font

use super::{new_pixmap, pixmap_to_image, SignatureArtifact};
use crate::color::Rgb;
use crate::config::TypedConfig;
use crate::error::{Result, StampError};
use crate::fonts::TextMeasure;
use crate::outline::GlyphOutlines;
use image::RgbaImage;
use tiny_skia::{FillRule, Paint, Transform};

/// Largest integer size `<= size` at which `text` fits in `max_width`,
/// never below `min_size`.
pub fn fit_font_size<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    size: u32,
    max_width: f64,
    min_size: u32,
) -> u32 {
    let mut fitted = size;
    while fitted > min_size && measure.text_width(text, fitted as f64) > max_width {
        fitted -= 1;
    }
    fitted.max(min_size)
}

pub struct TypedSignature<'f> {
    text: String,
    font: &'f dyn GlyphOutlines,
    size: u32,
    color: Rgb,
    config: TypedConfig,
}

impl<'f> TypedSignature<'f> {
    pub fn new(text: &str, font: &'f dyn GlyphOutlines, config: &TypedConfig) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StampError::Validation("Please type your signature".into()));
        }
        Ok(Self {
            text: text.to_string(),
            font,
            size: config.font_size.clamp(config.min_font_size, config.max_font_size),
            color: Rgb::from_hex(&config.color)?,
            config: config.clone(),
        })
    }

    /// Requested size, kept within the slider range.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size.clamp(self.config.min_font_size, self.config.max_font_size);
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Size actually drawn once the text is shrunk to fit the canvas.
    pub fn fitted_size(&self) -> u32 {
        let max_width = self.config.canvas_width as f64 - 2.0 * self.config.margin as f64;
        fit_font_size(
            self.font,
            &self.text,
            self.size,
            max_width,
            self.config.min_font_size,
        )
    }

    /// Draw onto a transparent canvas scaled by the configured pixel ratio.
    pub fn render(&self) -> Result<RgbaImage> {
        let ratio = self.config.pixel_ratio;
        let logical_w = self.config.canvas_width as f64;
        let logical_h = self.config.canvas_height as f64;
        let mut pixmap = new_pixmap(
            (logical_w * ratio).round() as u32,
            (logical_h * ratio).round() as u32,
        )?;

        let size = self.fitted_size() as f64;
        let width = self.font.text_width(&self.text, size);
        let metrics = self.font.line_metrics(size);
        let x = (logical_w - width) / 2.0;
        let middle = logical_h / 2.0;
        // Baseline that puts the em box's middle on the canvas center
        let baseline = middle + (metrics.ascent - metrics.descent) / 2.0;

        let path = self
            .font
            .line_path(&self.text, size, x, baseline)
            .ok_or_else(|| StampError::Validation("Please type your signature".into()))?;

        let mut paint = Paint::default();
        paint.set_color_rgba8(self.color.r, self.color.g, self.color.b, 255);
        paint.anti_alias = true;

        let transform = Transform::from_rotate_at(
            self.config.rotation_degrees as f32,
            x as f32,
            middle as f32,
        )
        .post_scale(ratio as f32, ratio as f32);
        pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);

        tracing::debug!(size, ratio, "rendered typed signature");
        Ok(pixmap_to_image(&pixmap))
    }

    pub fn finish(&self) -> Result<SignatureArtifact> {
        SignatureArtifact::from_image(&self.render()?)
    }
}
