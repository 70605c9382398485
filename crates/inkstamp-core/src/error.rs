use crate::overlay::FieldId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StampError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Field {0} not found")]
    FieldNotFound(FieldId),

    #[error("Page {page} does not exist (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("Failed to parse document: {0}")]
    DocumentParse(String),

    #[error("{}", asset_load_message(.field, .reason))]
    AssetLoad {
        field: Option<FieldId>,
        reason: String,
    },

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Font unavailable: {0}")]
    FontUnavailable(String),

    #[error("Failed to parse font: {0}")]
    FontParse(String),

    #[error("Field {field}: character {ch:?} cannot be encoded with a standard PDF font")]
    TextEncoding { field: FieldId, ch: char },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn asset_load_message(field: &Option<FieldId>, reason: &str) -> String {
    match field {
        Some(id) => format!("Failed to load asset for field {}: {}", id, reason),
        None => format!("Failed to load asset: {}", reason),
    }
}

impl StampError {
    pub(crate) fn asset(field: Option<FieldId>, reason: impl ToString) -> Self {
        StampError::AssetLoad {
            field,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StampError>;
