//! Layout files for `inkstamp stamp`
//!
//! A layout lists the fields to place and, optionally, the preview size
//! their coordinates refer to:
//!
//! ```json
//! {
//!   "preview": { "width": 612, "height": 792 },
//!   "fields": [
//!     { "kind": "signature", "page": 1, "x": 362, "y": 642,
//!       "width": 200, "height": 100, "image": "signature.png" },
//!     { "kind": "text", "page": 1, "x": 72, "y": 600, "width": 300,
//!       "height": 40, "content": "Approved", "style": { "color": "#1f3a93" } }
//!   ]
//! }
//! ```

use anyhow::{bail, Context, Result};
use inkstamp_core::config::TextConfig;
use inkstamp_core::data_uri::DataUri;
use inkstamp_core::{FieldKind, FieldStyle, OverlayField, OverlayLayer, PreviewRect, PreviewSize};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub preview: Option<PreviewSize>,
    pub fields: Vec<LayoutField>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayoutField {
    pub kind: FieldKind,
    #[serde(default = "first_page")]
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Text, or a data URI for signatures
    #[serde(default)]
    pub content: Option<String>,
    /// Signature image file, relative to the layout file
    #[serde(default)]
    pub image: Option<PathBuf>,
    #[serde(default)]
    pub style: Option<StyleOverride>,
    #[serde(default)]
    pub lock_aspect_ratio: Option<bool>,
}

fn first_page() -> u32 {
    1
}

/// Style keys that differ from the configured text defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StyleOverride {
    pub font_size: Option<f64>,
    pub color: Option<String>,
    pub font_family: Option<String>,
}

impl StyleOverride {
    fn apply(&self, base: FieldStyle) -> FieldStyle {
        FieldStyle {
            font_size: self.font_size.unwrap_or(base.font_size),
            color: self.color.clone().unwrap_or(base.color),
            font_family: self.font_family.clone().unwrap_or(base.font_family),
        }
    }
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/png",
    }
}

impl Layout {
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse layout {}", path.display()))
    }

    /// Add every field to `layer`, fitted inside `preview`. Image paths
    /// resolve against `base_dir`.
    pub fn apply(
        &self,
        layer: &mut OverlayLayer,
        preview: PreviewSize,
        base_dir: &Path,
        text: &TextConfig,
    ) -> Result<()> {
        for (index, entry) in self.fields.iter().enumerate() {
            let content = match (entry.kind, &entry.content, &entry.image) {
                (FieldKind::Signature, _, Some(image)) => {
                    let path = base_dir.join(image);
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("Failed to read signature {}", path.display()))?;
                    DataUri::new(image_mime(&path), bytes).encode()
                }
                (FieldKind::Signature, Some(uri), None) => uri.clone(),
                (FieldKind::Signature, None, None) => {
                    bail!("field #{} is a signature without an image or content", index + 1)
                }
                (FieldKind::Text, content, _) => content.clone().unwrap_or_default(),
            };

            let rect = PreviewRect {
                x: entry.x,
                y: entry.y,
                width: entry.width,
                height: entry.height,
            };
            let mut field = OverlayField::new(entry.kind, entry.page, rect, content);
            let base = FieldStyle::from(text);
            field.style = match &entry.style {
                Some(over) => over.apply(base),
                None => base,
            };
            field.lock_aspect_ratio = entry
                .lock_aspect_ratio
                .unwrap_or(entry.kind == FieldKind::Signature);

            let id = layer
                .place(field, preview)
                .with_context(|| format!("Invalid layout field #{}", index + 1))?;
            tracing::debug!(field = %id, index, "placed layout field");
        }
        Ok(())
    }
}
