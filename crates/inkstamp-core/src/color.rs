//! Hex color parsing
//!
//! Overlay colors travel as hex strings (`#RRGGBB`) and are converted to
//! normalized components for PDF `rg` operators or to bytes for raster
//! drawing. No color management beyond an sRGB assumption.

use crate::error::{Result, StampError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Parse `#RRGGBB`, `RRGGBB` or the short `#RGB` form.
    pub fn from_hex(color: &str) -> Result<Self> {
        let hex = color.trim().trim_start_matches('#');
        let invalid = || StampError::InvalidColor(color.to_string());

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        match hex.len() {
            6 => {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
                Ok(Rgb {
                    r: channel(0).map_err(|_| invalid())?,
                    g: channel(2).map_err(|_| invalid())?,
                    b: channel(4).map_err(|_| invalid())?,
                })
            }
            3 => {
                // #abc expands to #aabbcc
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
                Ok(Rgb {
                    r: channel(0).map_err(|_| invalid())?,
                    g: channel(1).map_err(|_| invalid())?,
                    b: channel(2).map_err(|_| invalid())?,
                })
            }
            _ => Err(invalid()),
        }
    }

    /// Components in the 0-1 range, as PDF color operators expect.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_form() {
        assert_eq!(
            Rgb::from_hex("#FF8000").unwrap(),
            Rgb {
                r: 255,
                g: 128,
                b: 0
            }
        );
        assert_eq!(Rgb::from_hex("000000").unwrap(), Rgb::BLACK);
    }

    #[test]
    fn test_parse_short_form() {
        assert_eq!(
            Rgb::from_hex("#f0a").unwrap(),
            Rgb {
                r: 255,
                g: 0,
                b: 170
            }
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Rgb::from_hex("red").is_err());
        assert!(Rgb::from_hex("#12345").is_err());
        assert!(Rgb::from_hex("#GG0000").is_err());
        assert!(Rgb::from_hex("").is_err());
    }

    #[test]
    fn test_unit_components() {
        let (r, g, b) = Rgb::from_hex("#ff0000").unwrap().to_unit();
        assert_eq!((r, g, b), (1.0, 0.0, 0.0));
    }

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(Rgb::from_hex("#1A2b3C").unwrap().to_hex(), "#1a2b3c");
    }
}
