//! Flatten overlays into an image
//!
//! Fields are mapped from preview space to native pixels, drawn in
//! insertion order and the result is re-encoded in the source format.

use super::ExportOptions;
use crate::coords::{PreviewSize, RasterScale};
use crate::data_uri::DataUri;
use crate::error::{Result, StampError};
use crate::outline::GlyphOutlines;
use crate::overlay::{FieldKind, OverlayField, OverlayLayer};
use crate::signature::{new_pixmap, pixmap_to_image};
use crate::wrap::{line_height, wrap_text};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use tiny_skia::{FillRule, Paint, Transform};

fn draw_signature(canvas: &mut RgbaImage, field: &OverlayField, scale: &RasterScale) -> Result<()> {
    let asset = |reason: String| StampError::asset(Some(field.id), reason);
    let uri = DataUri::parse(&field.content).map_err(|e| asset(e.to_string()))?;
    let signature = image::load_from_memory(&uri.data)
        .map_err(|e| asset(e.to_string()))?
        .to_rgba8();

    let rect = scale.rect(&field.rect());
    // Never larger than the canvas
    let width = (rect.width.round() as u32).clamp(1, canvas.width().max(1));
    let height = (rect.height.round() as u32).clamp(1, canvas.height().max(1));
    let resized = imageops::resize(&signature, width, height, FilterType::CatmullRom);
    imageops::overlay(canvas, &resized, rect.x.round() as i64, rect.y.round() as i64);
    Ok(())
}

fn draw_text(
    canvas: &mut RgbaImage,
    field: &OverlayField,
    scale: &RasterScale,
    font: &dyn GlyphOutlines,
) -> Result<()> {
    let rect = scale.rect(&field.rect());
    let size = field.style.font_size * scale.sy;
    let lines = wrap_text(font, &field.content, size, rect.width);
    if lines.is_empty() {
        return Ok(());
    }
    let color = field.style.rgb()?;

    let mut layer = new_pixmap(canvas.width(), canvas.height())?;
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, 255);
    paint.anti_alias = true;

    for (i, line) in lines.iter().enumerate() {
        let baseline = rect.y + size + i as f64 * line_height(size);
        if let Some(path) = font.line_path(line, size, rect.x, baseline) {
            layer.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    imageops::overlay(canvas, &pixmap_to_image(&layer), 0, 0);
    Ok(())
}

fn encode(canvas: RgbaImage, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoded = match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
            JpegEncoder::new_with_quality(&mut out, jpeg_quality).encode_image(&rgb)
        }
        _ => canvas.write_to(&mut Cursor::new(&mut out), format),
    };
    encoded.map_err(|e| StampError::Encode(e.to_string()))?;
    Ok(out)
}

/// Draw every field of `layer` onto the image and re-encode it.
///
/// With no fields the input bytes are returned unchanged.
#[tracing::instrument(skip_all, fields(fields = layer.len(), format = ?format))]
pub fn stamp_raster(
    bytes: &[u8],
    format: ImageFormat,
    layer: &OverlayLayer,
    preview: PreviewSize,
    options: &ExportOptions<'_>,
) -> Result<Vec<u8>> {
    if layer.is_empty() {
        return Ok(bytes.to_vec());
    }
    if let Some(field) = layer.fields().iter().find(|f| f.page != 1) {
        return Err(StampError::PageOutOfRange {
            page: field.page,
            page_count: 1,
        });
    }
    super::check_bounds(layer, preview)?;

    let mut canvas = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| StampError::DocumentParse(e.to_string()))?
        .to_rgba8();
    let scale = RasterScale::new(canvas.width(), canvas.height(), preview)?;

    for field in layer.fields() {
        match field.kind {
            FieldKind::Signature => draw_signature(&mut canvas, field, &scale)?,
            FieldKind::Text => {
                if field.content.trim().is_empty() {
                    continue;
                }
                let font = options.text_font.ok_or_else(|| {
                    StampError::FontUnavailable(
                        "raster text needs an outline font; set text.font_path".into(),
                    )
                })?;
                draw_text(&mut canvas, field, &scale, font)?;
            }
        }
        tracing::debug!(field = %field.id, kind = ?field.kind, "stamped field");
    }

    let (width, height) = canvas.dimensions();
    let out = encode(canvas, format, options.jpeg_quality)?;
    tracing::info!(width, height, bytes = out.len(), "stamped image");
    Ok(out)
}
