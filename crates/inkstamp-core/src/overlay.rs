//! Overlay fields placed on a document
//!
//! An `OverlayLayer` is an ordered list of fields keyed by identifier.
//! Geometry is always in preview space (CSS pixels, top-left origin of the
//! rendered page); the exporters convert it when flattening.

use crate::color::Rgb;
use crate::config::{FieldDefaults, TextConfig};
use crate::coords::{PreviewRect, PreviewSize};
use crate::error::{Result, StampError};
use crate::signature::SignatureArtifact;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// `content` is an image data URI
    Signature,
    /// `content` is plain text
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStyle {
    /// Font size in preview pixels
    pub font_size: f64,
    /// Hex color, e.g. "#000000"
    pub color: String,
    pub font_family: String,
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self::from(&TextConfig::default())
    }
}

impl From<&TextConfig> for FieldStyle {
    fn from(config: &TextConfig) -> Self {
        Self {
            font_size: config.font_size,
            color: config.color.clone(),
            font_family: config.font_family.clone(),
        }
    }
}

impl FieldStyle {
    pub fn rgb(&self) -> Result<Rgb> {
        Rgb::from_hex(&self.color)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayField {
    pub id: FieldId,
    pub kind: FieldKind,
    /// 1-based page number
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub content: String,
    #[serde(default)]
    pub style: FieldStyle,
    #[serde(default)]
    pub lock_aspect_ratio: bool,
    #[serde(default)]
    pub editing: bool,
}

impl OverlayField {
    /// A field with no id yet; `OverlayLayer::add` assigns one.
    pub fn new(kind: FieldKind, page: u32, rect: PreviewRect, content: impl Into<String>) -> Self {
        Self {
            id: FieldId(0),
            kind,
            page,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            content: content.into(),
            style: FieldStyle::default(),
            lock_aspect_ratio: false,
            editing: false,
        }
    }

    pub fn rect(&self) -> PreviewRect {
        PreviewRect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }

    fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(StampError::InvalidGeometry("pages are numbered from 1".into()));
        }
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.width <= 0.0 || self.height <= 0.0 {
            return Err(StampError::InvalidGeometry(format!(
                "field box {}x{} at ({}, {}) is not a positive finite rectangle",
                self.width, self.height, self.x, self.y
            )));
        }
        if self.style.font_size <= 0.0 || !self.style.font_size.is_finite() {
            return Err(StampError::InvalidGeometry(format!(
                "font size must be positive, got {}",
                self.style.font_size
            )));
        }
        self.style.rgb()?;
        Ok(())
    }

    /// Whether the box lies inside a preview of size `bounds`, give or take
    /// half a pixel.
    pub fn fits_within(&self, bounds: PreviewSize) -> bool {
        const SLACK: f64 = 0.5;
        self.x >= -SLACK
            && self.y >= -SLACK
            && self.x + self.width <= bounds.width + SLACK
            && self.y + self.height <= bounds.height + SLACK
    }
}

/// Ordered collection of overlay fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayLayer {
    next_id: u64,
    fields: Vec<OverlayField>,
    #[serde(skip)]
    defaults: FieldDefaults,
    #[serde(skip)]
    text_style: FieldStyle,
}

impl OverlayLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: FieldDefaults, text: &TextConfig) -> Self {
        Self {
            defaults,
            text_style: FieldStyle::from(text),
            ..Self::default()
        }
    }

    /// Append a field, assigning it the next identifier.
    pub fn add(&mut self, mut field: OverlayField) -> Result<FieldId> {
        field.validate()?;
        self.next_id += 1;
        let id = FieldId(self.next_id);
        field.id = id;
        tracing::debug!(field = %id, kind = ?field.kind, page = field.page, "added overlay field");
        self.fields.push(field);
        Ok(id)
    }

    /// Add a field, shrinking and moving it as `resize` would so that it
    /// lies inside `bounds`.
    pub fn place(&mut self, field: OverlayField, bounds: PreviewSize) -> Result<FieldId> {
        let (x, y, width, height) = (field.x, field.y, field.width, field.height);
        let id = self.add(field)?;
        if let Err(err) = self.resize(id, x, y, width, height, bounds) {
            self.fields.retain(|f| f.id != id);
            return Err(err);
        }
        Ok(id)
    }

    /// Place a captured signature at the bottom-right of the page.
    pub fn add_signature(
        &mut self,
        artifact: &SignatureArtifact,
        page: u32,
        preview: PreviewSize,
    ) -> Result<FieldId> {
        let d = &self.defaults;
        let rect = PreviewRect {
            x: (preview.width - d.signature_width - d.signature_padding).max(0.0),
            y: (preview.height - d.signature_height - d.signature_padding).max(0.0),
            width: d.signature_width,
            height: d.signature_height,
        };
        let mut field = OverlayField::new(FieldKind::Signature, page, rect, artifact.data_uri.clone());
        field.lock_aspect_ratio = true;
        self.place(field, preview)
    }

    /// Place an empty text box in the middle of the page, ready for editing.
    pub fn add_text_box(&mut self, page: u32, preview: PreviewSize) -> Result<FieldId> {
        let d = &self.defaults;
        let rect = PreviewRect {
            x: ((preview.width - d.text_box_width) / 2.0).max(0.0),
            y: ((preview.height - d.text_box_height) / 2.0).max(0.0),
            width: d.text_box_width,
            height: d.text_box_height,
        };
        let mut field = OverlayField::new(FieldKind::Text, page, rect, "");
        field.style = self.text_style.clone();
        field.editing = true;
        self.place(field, preview)
    }

    /// Drag a field, keeping it inside the preview container.
    pub fn move_to(&mut self, id: FieldId, x: f64, y: f64, bounds: PreviewSize) -> Result<()> {
        let field = self.get_mut(id)?;
        field.x = clamp_axis(x, field.width, bounds.width);
        field.y = clamp_axis(y, field.height, bounds.height);
        Ok(())
    }

    /// Resize a field, honoring its minimum size and aspect-ratio lock.
    pub fn resize(
        &mut self,
        id: FieldId,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        bounds: PreviewSize,
    ) -> Result<()> {
        if !(width.is_finite() && height.is_finite()) {
            return Err(StampError::InvalidGeometry("size must be finite".into()));
        }
        let (min_w, min_h) = (self.defaults.min_width, self.defaults.min_height);
        let field = self.get_mut(id)?;

        let (w, h) = if field.lock_aspect_ratio {
            let ratio = field.aspect_ratio();
            let mut w = width.max(min_w);
            let mut h = w / ratio;
            if h < min_h {
                h = min_h;
                w = h * ratio;
            }
            // Shrink uniformly if the box no longer fits the container
            let fit = (bounds.width / w).min(bounds.height / h).min(1.0);
            (w * fit, h * fit)
        } else {
            (
                width.max(min_w).min(bounds.width),
                height.max(min_h).min(bounds.height),
            )
        };

        field.width = w;
        field.height = h;
        field.x = clamp_axis(x, w, bounds.width);
        field.y = clamp_axis(y, h, bounds.height);
        Ok(())
    }

    pub fn set_text(&mut self, id: FieldId, text: impl Into<String>) -> Result<()> {
        let field = self.get_mut(id)?;
        if field.kind != FieldKind::Text {
            return Err(StampError::Validation(format!(
                "field {} is not a text field",
                id
            )));
        }
        field.content = text.into();
        Ok(())
    }

    pub fn set_style(&mut self, id: FieldId, style: FieldStyle) -> Result<()> {
        Rgb::from_hex(&style.color)?;
        if style.font_size <= 0.0 || !style.font_size.is_finite() {
            return Err(StampError::InvalidGeometry(format!(
                "font size must be positive, got {}",
                style.font_size
            )));
        }
        self.get_mut(id)?.style = style;
        Ok(())
    }

    /// Flip the aspect-ratio lock; returns the new state.
    pub fn toggle_aspect_lock(&mut self, id: FieldId) -> Result<bool> {
        let field = self.get_mut(id)?;
        field.lock_aspect_ratio = !field.lock_aspect_ratio;
        Ok(field.lock_aspect_ratio)
    }

    pub fn finish_editing(&mut self, id: FieldId) -> Result<()> {
        self.get_mut(id)?.editing = false;
        Ok(())
    }

    pub fn remove(&mut self, id: FieldId) -> Result<OverlayField> {
        let pos = self
            .fields
            .iter()
            .position(|f| f.id == id)
            .ok_or(StampError::FieldNotFound(id))?;
        Ok(self.fields.remove(pos))
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn get(&self, id: FieldId) -> Option<&OverlayField> {
        self.fields.iter().find(|f| f.id == id)
    }

    fn get_mut(&mut self, id: FieldId) -> Result<&mut OverlayField> {
        self.fields
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(StampError::FieldNotFound(id))
    }

    pub fn fields(&self) -> &[OverlayField] {
        &self.fields
    }

    /// Fields on `page`, in insertion order.
    pub fn fields_for_page(&self, page: u32) -> Vec<&OverlayField> {
        self.fields.iter().filter(|f| f.page == page).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Clamp a box's leading edge so `[pos, pos + size]` stays within `[0, limit]`.
fn clamp_axis(pos: f64, size: f64, limit: f64) -> f64 {
    pos.min(limit - size).max(0.0)
}
