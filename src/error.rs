//! Error types for the report library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the report library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON payload or chart definition file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed configuration file
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Slide template archive error
    #[error("Template archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Slide XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// Request payload is missing something the pipeline needs
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Slide template does not have the expected structure
    #[error("Invalid template: {0}")]
    Template(String),

    /// Office-to-PDF conversion failed
    #[error("Conversion of {} failed: {detail}", .file.display())]
    Conversion { file: PathBuf, detail: String },

    /// Chart rendering error
    #[error("Chart error: {0}")]
    Chart(String),

    /// General error
    #[error("{0}")]
    General(String),
}
