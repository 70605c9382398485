//! Document session
//!
//! Holds the loaded source file, its page geometry, the preview size the
//! overlays are positioned against, and the overlay layer itself. Loading a
//! new file replaces the whole session state.

use crate::config::Config;
use crate::coords::{MediaBox, PreviewSize};
use crate::error::{Result, StampError};
use crate::export::{self, ExportArtifact, ExportOptions};
use crate::overlay::{FieldId, OverlayLayer};
use crate::signature::SignatureArtifact;
use image::ImageFormat;
use std::collections::BTreeMap;
use std::io::{Cursor, Write};

/// What kind of document was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Raster(ImageFormat),
}

impl DocumentKind {
    pub fn mime(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Raster(format) => format.to_mime_type(),
        }
    }

    /// Sniff the document type from its bytes.
    ///
    /// `mime_hint` mirrors the file picker's `accept` filter: anything other
    /// than `application/pdf` or `image/*` is refused up front.
    pub fn detect(bytes: &[u8], mime_hint: Option<&str>) -> Result<Self> {
        if let Some(mime) = mime_hint {
            let mime = mime.trim().to_ascii_lowercase();
            if mime != "application/pdf" && !mime.starts_with("image/") {
                return Err(StampError::UnsupportedDocument(format!(
                    "{} is neither a PDF nor an image",
                    mime
                )));
            }
        }

        // The PDF header may be preceded by junk within the first 1024 bytes
        let head = &bytes[..bytes.len().min(1024)];
        if head.windows(5).any(|w| w == b"%PDF-") {
            return Ok(DocumentKind::Pdf);
        }

        match image::guess_format(bytes) {
            Ok(
                format @ (ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Gif
                | ImageFormat::WebP
                | ImageFormat::Bmp),
            ) => Ok(DocumentKind::Raster(format)),
            Ok(other) => Err(StampError::UnsupportedDocument(format!(
                "{:?} images are not supported",
                other
            ))),
            Err(_) => Err(StampError::UnsupportedDocument(
                "file is neither a PDF nor a recognized image".into(),
            )),
        }
    }
}

/// Stand-in for browser object URLs: tracks which handles are still live so
/// superseded ones can be released.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct ObjectUrls {
    next: u64,
    live: BTreeMap<ObjectUrl, String>,
}

impl ObjectUrls {
    pub fn create(&mut self, mime: &str) -> ObjectUrl {
        self.next += 1;
        let url = ObjectUrl(format!("blob:inkstamp/{}", self.next));
        self.live.insert(url.clone(), mime.to_string());
        url
    }

    /// Release a URL. Unknown or already-released URLs are ignored.
    pub fn revoke(&mut self, url: &ObjectUrl) -> bool {
        let released = self.live.remove(url).is_some();
        if !released {
            tracing::warn!(url = url.as_str(), "revoking an object URL that is not live");
        }
        released
    }

    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.live.contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// The file being annotated plus everything placed on it.
#[derive(Debug)]
pub struct DocumentSession {
    name: String,
    kind: DocumentKind,
    bytes: Vec<u8>,
    /// Page boxes in document space: PDF points, or native pixels for images
    pages: Vec<MediaBox>,
    current_page: u32,
    preview: Option<PreviewSize>,
    display_url: ObjectUrl,
    urls: ObjectUrls,
    overlays: OverlayLayer,
    config: Config,
}

struct Loaded {
    name: String,
    kind: DocumentKind,
    bytes: Vec<u8>,
    pages: Vec<MediaBox>,
}

fn inspect(name: &str, bytes: Vec<u8>, mime_hint: Option<&str>) -> Result<Loaded> {
    let kind = DocumentKind::detect(&bytes, mime_hint)?;
    let pages = match kind {
        DocumentKind::Pdf => export::pdf::page_boxes(&bytes)?,
        DocumentKind::Raster(format) => {
            let (width, height) = image::ImageReader::with_format(Cursor::new(&bytes), format)
                .into_dimensions()
                .map_err(|e| StampError::DocumentParse(e.to_string()))?;
            vec![MediaBox::from_size(width as f64, height as f64)]
        }
    };
    if pages.is_empty() {
        return Err(StampError::DocumentParse("document has no pages".into()));
    }

    // Keep only the final path component, as a browser File would
    let name = name
        .rsplit(['/', '\\'])
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("document")
        .to_string();

    Ok(Loaded {
        name,
        kind,
        bytes,
        pages,
    })
}

impl DocumentSession {
    /// Load a document into a fresh session.
    pub fn open(name: &str, bytes: Vec<u8>, mime_hint: Option<&str>, config: Config) -> Result<Self> {
        let loaded = inspect(name, bytes, mime_hint)?;
        let mut urls = ObjectUrls::default();
        let display_url = urls.create(loaded.kind.mime());
        let overlays = OverlayLayer::with_defaults(config.fields.clone(), &config.text);

        tracing::info!(
            name = %loaded.name,
            mime = loaded.kind.mime(),
            pages = loaded.pages.len(),
            "opened document"
        );

        Ok(Self {
            name: loaded.name,
            kind: loaded.kind,
            bytes: loaded.bytes,
            pages: loaded.pages,
            current_page: 1,
            preview: None,
            display_url,
            urls,
            overlays,
            config,
        })
    }

    /// Swap in a new document. The previous display URL is released, the
    /// page resets to 1 and every overlay is discarded. On error the current
    /// document is left untouched.
    pub fn replace(&mut self, name: &str, bytes: Vec<u8>, mime_hint: Option<&str>) -> Result<()> {
        let loaded = inspect(name, bytes, mime_hint)?;

        self.urls.revoke(&self.display_url);
        self.display_url = self.urls.create(loaded.kind.mime());
        self.name = loaded.name;
        self.kind = loaded.kind;
        self.bytes = loaded.bytes;
        self.pages = loaded.pages;
        self.current_page = 1;
        self.preview = None;
        self.overlays.clear();

        tracing::info!(name = %self.name, pages = self.pages.len(), "replaced document");
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn mime(&self) -> &'static str {
        self.kind.mime()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn display_url(&self) -> &ObjectUrl {
        &self.display_url
    }

    pub fn urls(&self) -> &ObjectUrls {
        &self.urls
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Document-space box of a 1-based page.
    pub fn page_box(&self, page: u32) -> Option<MediaBox> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .copied()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn next_page(&mut self) -> u32 {
        self.current_page = (self.current_page + 1).min(self.page_count());
        self.current_page
    }

    pub fn prev_page(&mut self) -> u32 {
        self.current_page = self.current_page.saturating_sub(1).max(1);
        self.current_page
    }

    pub fn go_to_page(&mut self, page: u32) -> Result<()> {
        if page == 0 || page > self.page_count() {
            return Err(StampError::PageOutOfRange {
                page,
                page_count: self.page_count(),
            });
        }
        self.current_page = page;
        Ok(())
    }

    /// Record the size of the rendered preview.
    pub fn set_preview(&mut self, width: f64, height: f64) -> Result<()> {
        self.preview = Some(PreviewSize::new(width, height)?);
        Ok(())
    }

    pub fn preview(&self) -> Option<PreviewSize> {
        self.preview
    }

    /// The preview size, or the validation error shown when the page has not
    /// been rendered yet.
    pub fn require_preview(&self) -> Result<PreviewSize> {
        self.preview
            .ok_or_else(|| StampError::Validation("Preview dimensions are unavailable".into()))
    }

    /// Size the first page would be displayed at: PDF pages at one CSS pixel
    /// per point, images at native size scaled down to `max_width`.
    pub fn natural_preview(&self, max_width: Option<f64>) -> PreviewSize {
        let first = self.pages[0];
        let scale = match (self.kind, max_width) {
            (DocumentKind::Raster(_), Some(max)) if max > 0.0 && first.width > max => {
                max / first.width
            }
            _ => 1.0,
        };
        PreviewSize {
            width: first.width * scale,
            height: first.height * scale,
        }
    }

    pub fn overlays(&self) -> &OverlayLayer {
        &self.overlays
    }

    pub fn overlays_mut(&mut self) -> &mut OverlayLayer {
        &mut self.overlays
    }

    /// Add a captured signature to the current page.
    pub fn add_signature(&mut self, artifact: &SignatureArtifact) -> Result<FieldId> {
        let preview = self.require_preview()?;
        self.overlays
            .add_signature(artifact, self.current_page, preview)
    }

    /// Add an empty text box to the current page.
    pub fn add_text_box(&mut self) -> Result<FieldId> {
        let preview = self.require_preview()?;
        self.overlays.add_text_box(self.current_page, preview)
    }

    pub fn move_field(&mut self, id: FieldId, x: f64, y: f64) -> Result<()> {
        let bounds = self.require_preview()?;
        self.overlays.move_to(id, x, y, bounds)
    }

    pub fn resize_field(&mut self, id: FieldId, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
        let bounds = self.require_preview()?;
        self.overlays.resize(id, x, y, width, height, bounds)
    }

    /// Fields drawn over the page currently shown.
    pub fn visible_fields(&self) -> Vec<&crate::overlay::OverlayField> {
        self.overlays.fields_for_page(self.current_page)
    }

    /// Name of the exported copy.
    pub fn signed_file_name(&self) -> String {
        format!("signed-{}", self.name)
    }

    /// Flatten the overlays into a new copy of the document.
    pub fn export(&self, options: &ExportOptions<'_>) -> Result<ExportArtifact> {
        export::export_document(self, &self.overlays, options)
    }

    /// Hand an export to `sink`, holding an object URL only for the duration
    /// of the transfer.
    pub fn deliver<W: Write>(&mut self, artifact: &ExportArtifact, mut sink: W) -> Result<()> {
        let url = self.urls.create(&artifact.mime);
        let written = sink
            .write_all(&artifact.bytes)
            .and_then(|_| sink.flush());
        self.urls.revoke(&url);
        written?;
        tracing::info!(file = %artifact.file_name, bytes = artifact.bytes.len(), "delivered export");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn session(width: u32, height: u32) -> DocumentSession {
        DocumentSession::open(
            "photos/receipt.png",
            png_bytes(width, height),
            Some("image/png"),
            Config::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_detects_pdf_header() {
        assert_eq!(
            DocumentKind::detect(b"%PDF-1.7\n...", None).unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::detect(b"\n\n%PDF-1.4", Some("application/pdf")).unwrap(),
            DocumentKind::Pdf
        );
    }

    #[test]
    fn test_detects_png() {
        assert_eq!(
            DocumentKind::detect(&png_bytes(2, 2), None).unwrap(),
            DocumentKind::Raster(ImageFormat::Png)
        );
    }

    #[test]
    fn test_rejects_other_mime_types() {
        let err = DocumentKind::detect(b"%PDF-1.7", Some("text/plain")).unwrap_err();
        assert!(matches!(err, StampError::UnsupportedDocument(_)));
        assert!(DocumentKind::detect(b"hello world", None).is_err());
    }

    #[test]
    fn test_open_raster_session() {
        let s = session(40, 30);
        assert_eq!(s.name(), "receipt.png");
        assert_eq!(s.signed_file_name(), "signed-receipt.png");
        assert_eq!(s.page_count(), 1);
        assert_eq!(s.page_box(1), Some(MediaBox::from_size(40.0, 30.0)));
        assert_eq!(s.page_box(0), None);
        assert_eq!(s.page_box(2), None);
        assert_eq!(s.mime(), "image/png");
        assert!(s.urls().is_live(s.display_url()));
    }

    #[test]
    fn test_preview_required_before_placing_fields() {
        let mut s = session(40, 30);
        let err = s.add_text_box().unwrap_err();
        assert_eq!(err.to_string(), "Preview dimensions are unavailable");
        assert!(s.overlays().is_empty());

        s.set_preview(400.0, 300.0).unwrap();
        s.add_text_box().unwrap();
        assert_eq!(s.visible_fields().len(), 1);
    }

    #[test]
    fn test_replace_releases_url_and_clears_overlays() {
        let mut s = session(40, 30);
        s.set_preview(400.0, 300.0).unwrap();
        s.add_text_box().unwrap();
        let old_url = s.display_url().clone();

        s.replace("next.png", png_bytes(10, 10), None).unwrap();

        assert!(!s.urls().is_live(&old_url));
        assert!(s.urls().is_live(s.display_url()));
        assert_eq!(s.urls().live_count(), 1);
        assert!(s.overlays().is_empty());
        assert_eq!(s.preview(), None);
        assert_eq!(s.current_page(), 1);
        assert_eq!(s.name(), "next.png");
    }

    #[test]
    fn test_failed_replace_keeps_current_document() {
        let mut s = session(40, 30);
        s.set_preview(400.0, 300.0).unwrap();
        s.add_text_box().unwrap();

        assert!(s.replace("notes.txt", b"plain text".to_vec(), None).is_err());
        assert_eq!(s.name(), "receipt.png");
        assert_eq!(s.overlays().len(), 1);
    }

    #[test]
    fn test_page_navigation_clamps() {
        let mut s = session(40, 30);
        assert_eq!(s.next_page(), 1);
        assert_eq!(s.prev_page(), 1);
        assert!(matches!(
            s.go_to_page(2),
            Err(StampError::PageOutOfRange {
                page: 2,
                page_count: 1
            })
        ));
    }

    #[test]
    fn test_natural_preview() {
        let s = session(2000, 1000);
        assert_eq!(
            s.natural_preview(Some(800.0)),
            PreviewSize {
                width: 800.0,
                height: 400.0
            }
        );
        assert_eq!(
            s.natural_preview(None),
            PreviewSize {
                width: 2000.0,
                height: 1000.0
            }
        );
    }

    #[test]
    fn test_deliver_releases_download_url() {
        let mut s = session(4, 4);
        let artifact = ExportArtifact {
            file_name: s.signed_file_name(),
            mime: "image/png".into(),
            bytes: vec![1, 2, 3],
        };
        let mut out = Vec::new();
        s.deliver(&artifact, &mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
        // Only the display URL is left
        assert_eq!(s.urls().live_count(), 1);
    }

    #[test]
    fn test_revoking_unknown_url_is_harmless() {
        let mut urls = ObjectUrls::default();
        let url = urls.create("application/pdf");
        assert!(urls.revoke(&url));
        assert!(!urls.revoke(&url));
        assert_eq!(urls.live_count(), 0);
    }
}
