//! PDF stamping module

pub mod fonts;
pub mod metadata;
pub mod qr;
pub mod stamp;

// Re-export commonly used items
pub use metadata::{count_images, count_pages, extract_metadata, extract_metadata_from_path, PdfMetadata};
pub use qr::{qr_payload, QrImage};
pub use stamp::{stamp_file, stamp_pdf, FooterPosition, StampOptions};
