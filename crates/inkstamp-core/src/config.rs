//! Configuration parsing
//!
//! Every tunable of the overlay model, the capture flows and the exporters
//! lives here and can be overridden from a TOML file. An empty file yields
//! the same values as `Config::default()`.

use crate::error::{Result, StampError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure loaded from TOML files
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default geometry of new overlay fields
    #[serde(default)]
    pub fields: FieldDefaults,
    /// Text overlay defaults
    #[serde(default)]
    pub text: TextConfig,
    /// Typed signature rendering
    #[serde(default)]
    pub typed: TypedConfig,
    /// Freehand signature rendering
    #[serde(default)]
    pub freehand: FreehandConfig,
    /// Uploaded signature handling
    #[serde(default)]
    pub upload: UploadConfig,
    /// Raster export encoding
    #[serde(default)]
    pub raster: RasterConfig,
    /// Font files
    #[serde(default)]
    pub fonts: FontsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            StampError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use inkstamp_core::config::Config;
    ///
    /// let config = Config::from_str("[typed]\nfont_size = 60").unwrap();
    /// assert_eq!(config.typed.font_size, 60);
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(s).map_err(|e| StampError::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let typed = &self.typed;
        if typed.min_font_size == 0 || typed.min_font_size > typed.max_font_size {
            return Err(StampError::Config(format!(
                "typed.min_font_size ({}) must be between 1 and typed.max_font_size ({})",
                typed.min_font_size, typed.max_font_size
            )));
        }
        if typed.canvas_width <= 2 * typed.margin || typed.canvas_height == 0 {
            return Err(StampError::Config(
                "typed canvas must be larger than its margins".into(),
            ));
        }
        if typed.pixel_ratio <= 0.0 {
            return Err(StampError::Config("typed.pixel_ratio must be positive".into()));
        }
        if !(1..=100).contains(&self.raster.jpeg_quality) {
            return Err(StampError::Config(format!(
                "raster.jpeg_quality must be 1-100, got {}",
                self.raster.jpeg_quality
            )));
        }
        if self.fields.min_width <= 0.0 || self.fields.min_height <= 0.0 {
            return Err(StampError::Config("field minimum size must be positive".into()));
        }
        Ok(())
    }

    /// Resolve a signature font family (or a direct path) to a font file.
    pub fn signature_font_path(&self, family_or_path: &str) -> Option<PathBuf> {
        if let Some(path) = self.fonts.signature.get(family_or_path) {
            return Some(path.clone());
        }
        let candidate = Path::new(family_or_path);
        candidate.is_file().then(|| candidate.to_path_buf())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefaults {
    #[serde(default = "default_signature_width")]
    pub signature_width: f64,
    #[serde(default = "default_signature_height")]
    pub signature_height: f64,
    /// Gap between a new signature and the bottom-right page corner
    #[serde(default = "default_signature_padding")]
    pub signature_padding: f64,
    #[serde(default = "default_text_box_width")]
    pub text_box_width: f64,
    #[serde(default = "default_text_box_height")]
    pub text_box_height: f64,
    /// Smallest size a field can be resized to
    #[serde(default = "default_min_width")]
    pub min_width: f64,
    #[serde(default = "default_min_height")]
    pub min_height: f64,
}

fn default_signature_width() -> f64 {
    200.0
}

fn default_signature_height() -> f64 {
    100.0
}

fn default_signature_padding() -> f64 {
    50.0
}

fn default_text_box_width() -> f64 {
    200.0
}

fn default_text_box_height() -> f64 {
    100.0
}

fn default_min_width() -> f64 {
    50.0
}

fn default_min_height() -> f64 {
    25.0
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self {
            signature_width: default_signature_width(),
            signature_height: default_signature_height(),
            signature_padding: default_signature_padding(),
            text_box_width: default_text_box_width(),
            text_box_height: default_text_box_height(),
            min_width: default_min_width(),
            min_height: default_min_height(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    /// Font size of new text boxes, in preview pixels
    #[serde(default = "default_text_font_size")]
    pub font_size: f64,
    #[serde(default = "default_text_font_family")]
    pub font_family: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// Outline font used to draw text overlays on raster images
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

fn default_text_font_size() -> f64 {
    12.0
}

fn default_text_font_family() -> String {
    "Helvetica".to_string()
}

fn default_color() -> String {
    "#000000".to_string()
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font_size: default_text_font_size(),
            font_family: default_text_font_family(),
            color: default_color(),
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedConfig {
    #[serde(default = "default_typed_canvas_width")]
    pub canvas_width: u32,
    #[serde(default = "default_typed_canvas_height")]
    pub canvas_height: u32,
    /// Horizontal margin kept free on each side when fitting the text
    #[serde(default = "default_typed_margin")]
    pub margin: u32,
    #[serde(default = "default_typed_font_size")]
    pub font_size: u32,
    #[serde(default = "default_typed_min_font_size")]
    pub min_font_size: u32,
    #[serde(default = "default_typed_max_font_size")]
    pub max_font_size: u32,
    /// Slant applied to typed signatures, in degrees (negative tilts up)
    #[serde(default = "default_typed_rotation")]
    pub rotation_degrees: f64,
    /// Device pixels per logical pixel of the rendered canvas
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f64,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_typed_canvas_width() -> u32 {
    800
}

fn default_typed_canvas_height() -> u32 {
    300
}

fn default_typed_margin() -> u32 {
    20
}

fn default_typed_font_size() -> u32 {
    48
}

fn default_typed_min_font_size() -> u32 {
    24
}

fn default_typed_max_font_size() -> u32 {
    72
}

fn default_typed_rotation() -> f64 {
    // π/60 radians
    -3.0
}

fn default_pixel_ratio() -> f64 {
    1.0
}

impl Default for TypedConfig {
    fn default() -> Self {
        Self {
            canvas_width: default_typed_canvas_width(),
            canvas_height: default_typed_canvas_height(),
            margin: default_typed_margin(),
            font_size: default_typed_font_size(),
            min_font_size: default_typed_min_font_size(),
            max_font_size: default_typed_max_font_size(),
            rotation_degrees: default_typed_rotation(),
            pixel_ratio: default_pixel_ratio(),
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreehandConfig {
    #[serde(default = "default_pen_width")]
    pub pen_width: f64,
    #[serde(default = "default_freehand_width")]
    pub canvas_width: u32,
    #[serde(default = "default_freehand_height")]
    pub canvas_height: u32,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_pen_width() -> f64 {
    2.5
}

fn default_freehand_width() -> u32 {
    600
}

fn default_freehand_height() -> u32 {
    200
}

impl Default for FreehandConfig {
    fn default() -> Self {
        Self {
            pen_width: default_pen_width(),
            canvas_width: default_freehand_width(),
            canvas_height: default_freehand_height(),
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Uploaded images wider than this start scaled down to it
    #[serde(default = "default_upload_max_width")]
    pub max_initial_width: f64,
    #[serde(default = "default_upload_min_size")]
    pub min_width: f64,
    #[serde(default = "default_upload_min_size")]
    pub min_height: f64,
}

fn default_upload_max_width() -> f64 {
    400.0
}

fn default_upload_min_size() -> f64 {
    50.0
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_initial_width: default_upload_max_width(),
            min_width: default_upload_min_size(),
            min_height: default_upload_min_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterConfig {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_jpeg_quality() -> u8 {
    92
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FontsConfig {
    /// Signature font family name → font file
    #[serde(default)]
    pub signature: BTreeMap<String, PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::from_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fields.signature_width, 200.0);
        assert_eq!(config.fields.min_height, 25.0);
        assert_eq!(config.typed.canvas_width, 800);
        assert_eq!(config.typed.min_font_size, 24);
        assert_eq!(config.upload.max_initial_width, 400.0);
        assert_eq!(config.raster.jpeg_quality, 92);
        assert_eq!(config.text.font_family, "Helvetica");
    }

    #[test]
    fn test_partial_override() {
        let toml = r##"
            [text]
            font_size = 14.0
            font_path = "/fonts/DejaVuSans.ttf"

            [fonts.signature]
            "Great Vibes" = "/fonts/GreatVibes-Regular.ttf"
        "##;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.text.font_size, 14.0);
        assert_eq!(config.text.color, "#000000");
        assert_eq!(
            config.text.font_path,
            Some(PathBuf::from("/fonts/DejaVuSans.ttf"))
        );
        assert_eq!(
            config.signature_font_path("Great Vibes"),
            Some(PathBuf::from("/fonts/GreatVibes-Regular.ttf"))
        );
        assert_eq!(config.signature_font_path("Allura"), None);
    }

    #[test]
    fn test_rejects_inverted_font_range() {
        let err = Config::from_str("[typed]\nmin_font_size = 80").unwrap_err();
        assert!(matches!(err, StampError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_jpeg_quality() {
        assert!(Config::from_str("[raster]\njpeg_quality = 0").is_err());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(Config::from_str("[fields\nsignature_width = ").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::from_file("/nonexistent/inkstamp.toml").is_err());
    }
}
