//! Error types for the license stamping library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the license stamping library
#[derive(Error, Debug)]
pub enum Error {
    /// The supplied bytes could not be loaded as a PDF document
    #[error("Input is not a loadable PDF document: {0}")]
    InputDocument(#[source] lopdf::Error),

    /// The license payload could not be rendered as a QR code
    #[error("QR encoding failed: {0}")]
    Encoding(String),

    /// A font or image could not be embedded into the document
    #[error("Resource embedding failed: {0}")]
    ResourceEmbed(String),

    /// PDF processing error after the document was loaded
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Raster export error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid process configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Stamp options failed caller-side validation
    #[error("Invalid stamp options: {0}")]
    InvalidOptions(String),

    /// Date parsing error
    #[error("Invalid date expression: {0}")]
    InvalidDateExpression(String),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid glob pattern
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// No files matched pattern
    #[error("No PDF files found matching pattern: {0}")]
    NoFilesMatched(String),
}
