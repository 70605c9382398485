//! Signature capture
//!
//! Three ways to produce a signature image: drawing strokes, typing a name
//! in a decorative font, or uploading a picture. Each ends in a
//! `SignatureArtifact`, a PNG data URI that can be dropped onto a page.

pub mod freehand;
pub mod typed;
pub mod upload;

pub use freehand::{Point, StrokeCanvas};
pub use typed::{fit_font_size, TypedSignature};
pub use upload::UploadedSignature;

use crate::data_uri::DataUri;
use crate::error::{Result, StampError};
use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tiny_skia::Pixmap;

/// A finished signature image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureArtifact {
    /// `data:image/png;base64,...`
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

impl SignatureArtifact {
    pub fn from_image(image: &RgbaImage) -> Result<Self> {
        let png = encode_png(image)?;
        Ok(Self {
            data_uri: DataUri::png(png).encode(),
            width: image.width(),
            height: image.height(),
        })
    }

    /// The encoded PNG behind the data URI.
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        Ok(DataUri::parse(&self.data_uri)?.data)
    }
}

pub(crate) fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| StampError::Encode(e.to_string()))?;
    Ok(out)
}

/// Copy a premultiplied tiny-skia pixmap into a straight-alpha image.
pub(crate) fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    RgbaImage::from_fn(pixmap.width(), pixmap.height(), |x, y| {
        match pixmap.pixel(x, y) {
            Some(p) => {
                let c = p.demultiply();
                Rgba([c.red(), c.green(), c.blue(), c.alpha()])
            }
            None => Rgba([0, 0, 0, 0]),
        }
    })
}

pub(crate) fn new_pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height).ok_or_else(|| {
        StampError::InvalidGeometry(format!("cannot allocate a {}x{} canvas", width, height))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_round_trips_png() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let artifact = SignatureArtifact::from_image(&img).unwrap();
        assert_eq!((artifact.width, artifact.height), (3, 2));
        assert!(artifact.data_uri.starts_with("data:image/png;base64,"));

        let decoded = image::load_from_memory(&artifact.png_bytes().unwrap())
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_pixmap_conversion_demultiplies() {
        let mut pixmap = new_pixmap(2, 2).unwrap();
        pixmap.fill(tiny_skia::Color::from_rgba8(200, 100, 0, 255));
        let img = pixmap_to_image(&pixmap);
        assert_eq!(img.get_pixel(1, 1), &Rgba([200, 100, 0, 255]));
    }

    #[test]
    fn test_zero_sized_canvas_rejected() {
        assert!(matches!(
            new_pixmap(0, 10),
            Err(StampError::InvalidGeometry(_))
        ));
    }
}
