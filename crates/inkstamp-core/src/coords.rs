//! Coordinate transformation between preview space and document space
//!
//! Preview space is the on-screen rendered page: pixels, top-left origin.
//! Document space is either PDF user space (points, bottom-left origin,
//! offset by the media box origin) or the native pixel grid of a raster
//! image. Overlay geometry is only ever stored in preview space.

use crate::error::{Result, StampError};
use serde::{Deserialize, Serialize};

/// Size of the rendered preview box, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewSize {
    pub width: f64,
    pub height: f64,
}

impl PreviewSize {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(StampError::InvalidGeometry(format!(
                "preview size must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }
}

/// Axis-aligned rectangle in preview space (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned rectangle in PDF user space; `(x, y)` is the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A page's media box as `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl MediaBox {
    pub fn from_size(width: f64, height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// Build from PDF `[llx lly urx ury]` corners, normalizing swapped corners.
    pub fn from_corners(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self {
            x: llx.min(urx),
            y: lly.min(ury),
            width: (urx - llx).abs(),
            height: (ury - lly).abs(),
        }
    }

    pub fn letter() -> Self {
        Self::from_size(612.0, 792.0)
    }
}

/// Scale factors from preview pixels to PDF points for one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfScale {
    pub sx: f64,
    pub sy: f64,
    pub media_box: MediaBox,
}

impl PdfScale {
    pub fn new(preview: PreviewSize, media_box: MediaBox) -> Result<Self> {
        if preview.width <= 0.0 || preview.height <= 0.0 {
            return Err(StampError::InvalidGeometry(
                "preview dimensions must be positive".into(),
            ));
        }
        Ok(Self {
            sx: media_box.width / preview.width,
            sy: media_box.height / preview.height,
            media_box,
        })
    }

    /// Map a preview rectangle to PDF space, flipping the vertical axis.
    pub fn rect(&self, rect: &PreviewRect) -> PdfRect {
        let mb = self.media_box;
        let width = rect.width * self.sx;
        let height = rect.height * self.sy;
        PdfRect {
            x: mb.x + rect.x * self.sx,
            y: mb.y + mb.height - rect.y * self.sy - height,
            width,
            height,
        }
    }

    /// Preview position of a PDF point.
    pub fn point(&self, pdf_x: f64, pdf_y: f64) -> (f64, f64) {
        let mb = self.media_box;
        (
            (pdf_x - mb.x) / self.sx,
            (mb.y + mb.height - pdf_y) / self.sy,
        )
    }

    /// PDF y of a preview-space horizontal line.
    pub fn top(&self, preview_y: f64) -> f64 {
        self.media_box.y + self.media_box.height - preview_y * self.sy
    }
}

/// Convert a preview rectangle to PDF coordinates.
///
/// With a zero-origin media box of size `(Wd, Hd)` and preview `(Wp, Hp)`,
/// a box at `(x, y)` of size `(w, h)` lands at
/// `(x·Wd/Wp, Hd − y·Hd/Hp − h·Hd/Hp)`.
pub fn preview_to_pdf(
    rect: &PreviewRect,
    preview: PreviewSize,
    media_box: MediaBox,
) -> Result<PdfRect> {
    Ok(PdfScale::new(preview, media_box)?.rect(rect))
}

/// Convert a PDF point back to preview coordinates.
pub fn pdf_to_preview(
    pdf_x: f64,
    pdf_y: f64,
    preview: PreviewSize,
    media_box: MediaBox,
) -> Result<(f64, f64)> {
    Ok(PdfScale::new(preview, media_box)?.point(pdf_x, pdf_y))
}

/// Scale factors from the displayed image size to its native pixel grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterScale {
    pub sx: f64,
    pub sy: f64,
}

impl RasterScale {
    pub fn new(native_width: u32, native_height: u32, displayed: PreviewSize) -> Result<Self> {
        if native_width == 0 || native_height == 0 {
            return Err(StampError::InvalidGeometry("image has no pixels".into()));
        }
        if displayed.width <= 0.0 || displayed.height <= 0.0 {
            return Err(StampError::InvalidGeometry(
                "preview dimensions must be positive".into(),
            ));
        }
        Ok(Self {
            sx: native_width as f64 / displayed.width,
            sy: native_height as f64 / displayed.height,
        })
    }

    /// Map a preview rectangle to native pixels. No axis flip: both spaces
    /// have a top-left origin.
    pub fn rect(&self, rect: &PreviewRect) -> PreviewRect {
        PreviewRect {
            x: rect.x * self.sx,
            y: rect.y * self.sy,
            width: rect.width * self.sx,
            height: rect.height * self.sy,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    prop_compose! {
        fn any_preview()(width in 1.0f64..2000.0, height in 1.0f64..2000.0) -> PreviewSize {
            PreviewSize { width, height }
        }
    }

    prop_compose! {
        fn any_media_box()(
            x in 0.0f64..100.0,
            y in 0.0f64..100.0,
            width in 1.0f64..2000.0,
            height in 1.0f64..2000.0,
        ) -> MediaBox {
            MediaBox { x, y, width, height }
        }
    }

    prop_compose! {
        /// A box whose top-left corner lies inside `preview`.
        fn rect_in(preview: PreviewSize)(
            left in 0.0f64..=1.0,
            top in 0.0f64..=1.0,
            wide in 0.0f64..=1.0,
            tall in 0.0f64..=1.0,
        ) -> PreviewRect {
            PreviewRect {
                x: left * preview.width,
                y: top * preview.height,
                width: wide * preview.width,
                height: tall * preview.height,
            }
        }
    }

    fn preview_and_rect() -> impl Strategy<Value = (PreviewSize, PreviewRect)> {
        any_preview().prop_flat_map(|preview| (Just(preview), rect_in(preview)))
    }

    proptest! {
        #[test]
        fn placement_matches_scale_and_flip(
            (preview, rect) in preview_and_rect(),
            mb in any_media_box(),
        ) {
            let pdf = preview_to_pdf(&rect, preview, mb).unwrap();

            let sx = mb.width / preview.width;
            let sy = mb.height / preview.height;
            prop_assert!((pdf.x - (mb.x + rect.x * sx)).abs() < 1e-6);
            prop_assert!((pdf.y - (mb.y + mb.height - (rect.y + rect.height) * sy)).abs() < 1e-6);
            prop_assert!((pdf.width - rect.width * sx).abs() < 1e-6);
            prop_assert!((pdf.height - rect.height * sy).abs() < 1e-6);
        }

        #[test]
        fn top_left_corner_maps_back(
            (preview, rect) in preview_and_rect(),
            mb in any_media_box(),
        ) {
            let pdf = preview_to_pdf(&rect, preview, mb).unwrap();
            let (x, y) = pdf_to_preview(pdf.x, pdf.y + pdf.height, preview, mb).unwrap();
            prop_assert!((x - rect.x).abs() < 1e-6);
            prop_assert!((y - rect.y).abs() < 1e-6);
        }

        /// Lower in the preview is lower on the page
        #[test]
        fn preview_down_is_pdf_down(
            (preview, rect) in preview_and_rect(),
            mb in any_media_box(),
            drop in 1.0f64..100.0,
        ) {
            let lowered = PreviewRect { y: rect.y + drop, ..rect };
            let before = preview_to_pdf(&rect, preview, mb).unwrap();
            let after = preview_to_pdf(&lowered, preview, mb).unwrap();
            prop_assert!(after.y < before.y);
        }

        #[test]
        fn raster_scale_is_linear(
            native_w in 1u32..5000,
            native_h in 1u32..5000,
            (preview, rect) in preview_and_rect(),
        ) {
            let scale = RasterScale::new(native_w, native_h, preview).unwrap();
            let doubled = PreviewRect { x: rect.x * 2.0, ..rect };
            let once = scale.rect(&rect);
            let twice = scale.rect(&doubled);
            prop_assert!((twice.x - 2.0 * once.x).abs() < 1e-6);
        }
    }
}
