//! Export: flatten the overlay layer into a new copy of the document

pub mod pdf;
pub mod raster;

use crate::config::RasterConfig;
use crate::coords::PreviewSize;
use crate::document::{DocumentKind, DocumentSession};
use crate::error::{Result, StampError};
use crate::outline::GlyphOutlines;
use crate::overlay::OverlayLayer;

/// A finished export, ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// `signed-<original name>`
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Settings that only matter when writing images.
#[derive(Clone, Copy)]
pub struct ExportOptions<'a> {
    pub jpeg_quality: u8,
    /// Outline font for text fields on images; PDFs use standard fonts
    pub text_font: Option<&'a dyn GlyphOutlines>,
}

impl Default for ExportOptions<'_> {
    fn default() -> Self {
        Self::from_config(&RasterConfig::default())
    }
}

impl<'a> ExportOptions<'a> {
    pub fn from_config(config: &RasterConfig) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality,
            text_font: None,
        }
    }

    pub fn with_text_font(mut self, font: &'a dyn GlyphOutlines) -> Self {
        self.text_font = Some(font);
        self
    }
}

/// Every field must lie inside the preview it was placed against.
pub(crate) fn check_bounds(layer: &OverlayLayer, preview: PreviewSize) -> Result<()> {
    match layer.fields().iter().find(|f| !f.fits_within(preview)) {
        Some(field) => Err(StampError::InvalidGeometry(format!(
            "field {} extends outside the {}x{} preview",
            field.id, preview.width, preview.height
        ))),
        None => Ok(()),
    }
}

/// Flatten `layer` onto the session's document.
///
/// The session supplies the source bytes, its kind and the preview size the
/// fields were placed against. Nothing is returned unless every field was
/// drawn.
#[tracing::instrument(skip_all, fields(document = session.name(), fields = layer.len()))]
pub fn export_document(
    session: &DocumentSession,
    layer: &OverlayLayer,
    options: &ExportOptions<'_>,
) -> Result<ExportArtifact> {
    let bytes = if layer.is_empty() {
        session.bytes().to_vec()
    } else {
        let preview = session.require_preview()?;
        match session.kind() {
            DocumentKind::Pdf => pdf::stamp_pdf(session.bytes(), layer, preview)?,
            DocumentKind::Raster(format) => {
                raster::stamp_raster(session.bytes(), format, layer, preview, options)?
            }
        }
    };

    let artifact = ExportArtifact {
        file_name: session.signed_file_name(),
        mime: session.mime().to_string(),
        bytes,
    };
    tracing::info!(
        file = %artifact.file_name,
        bytes = artifact.bytes.len(),
        "exported document"
    );
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::document::tests::png_bytes;

    #[test]
    fn test_no_fields_returns_source_bytes() {
        let source = png_bytes(20, 10);
        let session =
            DocumentSession::open("scan.png", source.clone(), None, Config::default()).unwrap();
        let artifact = session.export(&ExportOptions::default()).unwrap();
        assert_eq!(artifact.bytes, source);
        assert_eq!(artifact.file_name, "signed-scan.png");
        assert_eq!(artifact.mime, "image/png");
    }

    #[test]
    fn test_fields_need_preview() {
        let session =
            DocumentSession::open("scan.png", png_bytes(20, 10), None, Config::default()).unwrap();
        let mut layer = OverlayLayer::new();
        layer
            .add_text_box(1, crate::coords::PreviewSize::new(20.0, 10.0).unwrap())
            .unwrap();
        let err = export_document(&session, &layer, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, StampError::Validation(_)));
    }

    #[test]
    fn test_options_from_config() {
        let options = ExportOptions::from_config(&RasterConfig { jpeg_quality: 70 });
        assert_eq!(options.jpeg_quality, 70);
        assert!(options.text_font.is_none());
    }
}
