//! License Stamp Library
//!
//! Stamps PDF documents with a license footer and a scannable QR code.
//! This library provides functionality to:
//! - Build the license QR payload and render it as a two-tone raster
//! - Draw the footer as a bottom banner or a diagonal watermark on every page
//! - Read the process-wide opacity and angle tunables
//! - Resolve license dates and inspect stamped documents
//!
//! # Example
//!
//! ```no_run
//! use license_stamp::config::StampConfig;
//! use license_stamp::pdf::{stamp_file, FooterPosition, StampOptions};
//! use std::path::Path;
//!
//! let options = StampOptions {
//!     customer_name: "Jane Smith".to_string(),
//!     organization: None,
//!     order_number: "CAIL-1234".to_string(),
//!     licensed_quantity: 35,
//!     license_id: "test-license-123".to_string(),
//!     date_iso: "2024-01-15".to_string(),
//!     footer_position: FooterPosition::Diagonal,
//! };
//!
//! let config = StampConfig::from_env().expect("Invalid configuration");
//! stamp_file(Path::new("score.pdf"), Path::new("score-stamped.pdf"), &options, &config)
//!     .expect("Failed to stamp PDF");
//! ```

pub mod config;
pub mod date;
pub mod error;
pub mod layout;
pub mod pdf;

// Re-export commonly used items
pub use config::StampConfig;
pub use error::{Error, Result};
pub use pdf::{stamp_pdf, FooterPosition, StampOptions};
