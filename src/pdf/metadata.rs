//! PDF metadata extraction

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};

/// Count pages by reading the Count field from the Pages dictionary
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()?;

    let pages_id = catalog.get(b"Pages")?.as_reference()?;
    let pages_dict = doc.get_object(pages_id)?.as_dict()?;

    let count = pages_dict.get(b"Count")?.as_i64()?;
    Ok(count.max(0) as usize)
}

/// PDF metadata
#[derive(Debug, Clone, PartialEq)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// Extract metadata from PDF bytes
pub fn extract_metadata(pdf_bytes: &[u8]) -> Result<PdfMetadata> {
    let doc = Document::load_mem(pdf_bytes).map_err(Error::InputDocument)?;

    let page_count = count_pages_from_catalog(&doc)?;

    let info = doc
        .trailer
        .get(b"Info")
        .and_then(|obj| obj.as_reference())
        .and_then(|id| doc.get_object(id))
        .and_then(|obj| obj.as_dict())
        .ok();

    let text_entry = |key: &[u8]| -> Option<String> {
        let bytes = info?.get(key).ok()?.as_str().ok()?;
        String::from_utf8(bytes.to_vec()).ok()
    };

    Ok(PdfMetadata {
        page_count,
        title: text_entry(b"Title"),
        author: text_entry(b"Author"),
    })
}

/// Extract metadata from a PDF file
pub fn extract_metadata_from_path(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    extract_metadata(&bytes)
}

/// Count the number of pages in PDF bytes
///
/// Reads the Count field from the Pages dictionary; zero is a valid answer.
pub fn count_pages(pdf_bytes: &[u8]) -> Result<usize> {
    let doc = Document::load_mem(pdf_bytes).map_err(Error::InputDocument)?;
    count_pages_from_catalog(&doc)
}

/// Count image XObjects anywhere in the document
pub fn count_images(pdf_bytes: &[u8]) -> Result<usize> {
    let doc = Document::load_mem(pdf_bytes).map_err(Error::InputDocument)?;

    let images = doc
        .objects
        .values()
        .filter(|obj| match obj {
            Object::Stream(stream) => matches!(
                stream.dict.get(b"Subtype").and_then(|s| s.as_name()),
                Ok(b"Image")
            ),
            _ => false,
        })
        .count();

    Ok(images)
}
