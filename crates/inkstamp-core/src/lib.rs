//! Signature and text overlays for PDFs and images
//!
//! Fields are placed on a rendered preview of a page, then flattened into a
//! new copy of the document:
//! - PDFs are edited in place with lopdf (image XObjects, standard fonts)
//! - Images are composited at native resolution and re-encoded in their
//!   original format
//!
//! Signatures can be drawn (`signature::StrokeCanvas`), typed in a
//! decorative font (`signature::TypedSignature`) or uploaded
//! (`signature::UploadedSignature`).

pub mod color;
pub mod config;
pub mod coords;
pub mod data_uri;
pub mod document;
pub mod error;
pub mod export;
pub mod fonts;
pub mod outline;
pub mod overlay;
pub mod signature;
pub mod wrap;

pub use color::Rgb;
pub use config::Config;
pub use coords::{
    pdf_to_preview, preview_to_pdf, MediaBox, PdfRect, PdfScale, PreviewRect, PreviewSize,
    RasterScale,
};
pub use document::{DocumentKind, DocumentSession, ObjectUrl, ObjectUrls};
pub use error::{Result, StampError};
pub use export::{export_document, ExportArtifact, ExportOptions};
pub use fonts::{StandardFont, TextMeasure, SIGNATURE_FONTS};
pub use outline::{GlyphOutlines, OutlineFont};
pub use overlay::{FieldId, FieldKind, FieldStyle, OverlayField, OverlayLayer};
pub use signature::{
    fit_font_size, Point, SignatureArtifact, StrokeCanvas, TypedSignature, UploadedSignature,
};
pub use wrap::wrap_text;
