//! Error types for qrdoc operations

use thiserror::Error;

/// Result type alias using qrdoc's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for qrdoc operations
#[derive(Error, Debug)]
pub enum Error {
    /// Unreadable or malformed CSV/template input, or a missing required column
    #[error("Input error: {0}")]
    Input(String),

    /// Failed to persist an output document or image
    #[error("Write error: {0}")]
    Write(String),

    /// QR code encoding failed
    #[error("Failed to encode QR code: {0}")]
    QrEncode(String),

    /// DOCX parsing or packing failed
    #[error("Document error: {0}")]
    Docx(String),

    /// PDF conversion failed
    #[error("PDF conversion failed: {0}")]
    Pdf(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        match e.position() {
            Some(pos) => Error::Input(format!("CSV line {}: {}", pos.line(), e)),
            None => Error::Input(format!("CSV error: {}", e)),
        }
    }
}

impl From<qrcode::types::QrError> for Error {
    fn from(e: qrcode::types::QrError) -> Self {
        Error::QrEncode(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}

/// Per-record failure to turn a reference into an embeddable image.
///
/// These never abort a batch; the filler writes [`AssetError::placeholder`]
/// where the image would have gone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// File missing, bad share link, HTTP failure or non-image response
    #[error("image fetch failed: {0}")]
    FetchFailed(String),

    /// Extension or decoded format that cannot be embedded
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Bytes that do not decode as an image
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

impl AssetError {
    /// Literal text written into the document in place of the image.
    pub fn placeholder(&self) -> &'static str {
        match self {
            AssetError::FetchFailed(_) => "[Image fetch failed]",
            AssetError::UnsupportedFormat(_) => "[Unsupported format]",
            AssetError::InvalidImage(_) => "[Invalid image]",
        }
    }
}
