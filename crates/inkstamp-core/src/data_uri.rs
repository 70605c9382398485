//! `data:` URIs for signature images
//!
//! Signature overlays carry their image as a base64 data URI, the same
//! artifact the capture flows produce.

use crate::error::{Result, StampError};
use base64::{engine::general_purpose::STANDARD, Engine as _};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub data: Vec<u8>,
}

impl DataUri {
    pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            data,
        }
    }

    /// Parse `data:<mime>[;base64],<payload>`.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| StampError::InvalidDataUri("missing data: scheme".into()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| StampError::InvalidDataUri("missing ',' separator".into()))?;

        let mut params = meta.split(';');
        let mime = match params.next() {
            Some(m) if !m.is_empty() => m.to_ascii_lowercase(),
            _ => "text/plain".to_string(),
        };
        let is_base64 = params.any(|p| p.eq_ignore_ascii_case("base64"));

        let data = if is_base64 {
            // Tolerate whitespace from line-wrapped payloads
            let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| StampError::InvalidDataUri(e.to_string()))?
        } else {
            urlencoding::decode_binary(payload.as_bytes()).into_owned()
        };

        Ok(Self { mime, data })
    }

    pub fn encode(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }

    pub fn png(data: Vec<u8>) -> Self {
        Self::new("image/png", data)
    }
}
