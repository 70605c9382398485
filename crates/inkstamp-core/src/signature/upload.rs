//! Uploaded signature images

use super::SignatureArtifact;
use crate::config::UploadConfig;
use crate::error::{Result, StampError};
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// A decoded upload being sized before it becomes a signature.
#[derive(Debug, Clone)]
pub struct UploadedSignature {
    image: RgbaImage,
    width: f64,
    height: f64,
    aspect_ratio: f64,
    lock_aspect_ratio: bool,
    min_width: f64,
    min_height: f64,
}

impl UploadedSignature {
    /// Decode an uploaded image. Wide images start scaled down to
    /// `max_initial_width`.
    pub fn load(bytes: &[u8], config: &UploadConfig) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| StampError::asset(None, e))?
            .to_rgba8();
        let (iw, ih) = image.dimensions();
        if iw == 0 || ih == 0 {
            return Err(StampError::asset(None, "image has no pixels"));
        }

        let aspect_ratio = iw as f64 / ih as f64;
        let width = (iw as f64).min(config.max_initial_width);
        tracing::debug!(iw, ih, width, "loaded uploaded signature");

        Ok(Self {
            image,
            width,
            height: width / aspect_ratio,
            aspect_ratio,
            lock_aspect_ratio: true,
            min_width: config.min_width,
            min_height: config.min_height,
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn intrinsic_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn is_aspect_locked(&self) -> bool {
        self.lock_aspect_ratio
    }

    pub fn set_aspect_lock(&mut self, locked: bool) {
        self.lock_aspect_ratio = locked;
    }

    /// Change the output size. With the lock on, height follows width; with
    /// it off, both are taken as given and the ratio is updated to match.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<()> {
        if !(width.is_finite() && height.is_finite()) {
            return Err(StampError::InvalidGeometry("size must be finite".into()));
        }
        if self.lock_aspect_ratio {
            let mut w = width.max(self.min_width);
            let mut h = w / self.aspect_ratio;
            if h < self.min_height {
                h = self.min_height;
                w = h * self.aspect_ratio;
            }
            self.width = w;
            self.height = h;
        } else {
            self.width = width.max(self.min_width);
            self.height = height.max(self.min_height);
            self.aspect_ratio = self.width / self.height;
        }
        Ok(())
    }

    /// Resample to the chosen size and encode.
    pub fn finish(&self) -> Result<SignatureArtifact> {
        let w = (self.width.round() as u32).max(1);
        let h = (self.height.round() as u32).max(1);
        let resized = imageops::resize(&self.image, w, h, FilterType::Lanczos3);
        SignatureArtifact::from_image(&resized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tests::png_bytes;
    use pretty_assertions::assert_eq;

    fn upload(width: u32, height: u32) -> UploadedSignature {
        UploadedSignature::load(&png_bytes(width, height), &UploadConfig::default()).unwrap()
    }

    #[test]
    fn test_wide_upload_starts_at_max_width() {
        let sig = upload(800, 200);
        assert_eq!((sig.width(), sig.height()), (400.0, 100.0));
        assert_eq!(sig.intrinsic_size(), (800, 200));
        assert!(sig.is_aspect_locked());
    }

    #[test]
    fn test_small_upload_keeps_size() {
        let sig = upload(120, 60);
        assert_eq!((sig.width(), sig.height()), (120.0, 60.0));
    }

    #[test]
    fn test_locked_resize_follows_width() {
        let mut sig = upload(800, 200);
        sig.resize(300.0, 999.0).unwrap();
        assert_eq!((sig.width(), sig.height()), (300.0, 75.0));
    }

    #[test]
    fn test_locked_resize_respects_minimum() {
        let mut sig = upload(800, 200);
        // 100 wide would be 25 tall; the 50px minimum height wins
        sig.resize(100.0, 0.0).unwrap();
        assert_eq!((sig.width(), sig.height()), (200.0, 50.0));
    }

    #[test]
    fn test_unlocked_resize_adopts_new_ratio() {
        let mut sig = upload(800, 200);
        sig.set_aspect_lock(false);
        sig.resize(120.0, 90.0).unwrap();
        assert_eq!((sig.width(), sig.height()), (120.0, 90.0));

        sig.set_aspect_lock(true);
        sig.resize(240.0, 0.0).unwrap();
        assert_eq!((sig.width(), sig.height()), (240.0, 180.0));
    }

    #[test]
    fn test_unlocked_resize_clamps_each_axis() {
        let mut sig = upload(100, 100);
        sig.set_aspect_lock(false);
        sig.resize(10.0, 10.0).unwrap();
        assert_eq!((sig.width(), sig.height()), (50.0, 50.0));
    }

    #[test]
    fn test_finish_resamples() {
        let mut sig = upload(800, 200);
        sig.resize(200.0, 0.0).unwrap();
        let artifact = sig.finish().unwrap();
        assert_eq!((artifact.width, artifact.height), (200, 50));
    }

    #[test]
    fn test_rejects_garbage() {
        let err = UploadedSignature::load(b"not an image", &UploadConfig::default()).unwrap_err();
        assert!(matches!(err, StampError::AssetLoad { field: None, .. }));
    }
}
