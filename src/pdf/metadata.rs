//! Page counts and document info of generated reports

use std::path::Path;
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;
use crate::error::{Error, Result};

/// Reads `/Root -> /Pages -> /Count`, which also covers nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc
        .catalog()
        .map_err(|_| Error::General("No usable Root in trailer".to_string()))?;
    let pages_id = catalog
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("Catalog has no Pages reference".to_string()))?;
    let count = doc
        .get_dictionary(pages_id)?
        .get(b"Count")
        .and_then(Object::as_i64)
        .map_err(|_| Error::General("Pages has no integer Count".to_string()))?;

    Ok(count.max(0) as usize)
}

/// What `info` reports about a PDF
#[derive(Debug, Clone, Serialize)]
pub struct PdfMetadata {
    pub page_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Usually the converter that wrote the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
}

fn load(path: &Path) -> Result<(Document, usize)> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;
    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }
    Ok((doc, page_count))
}

fn info_text(info: &Dictionary, key: &[u8]) -> Option<String> {
    let bytes = info.get(key).and_then(Object::as_str).ok()?;
    // UTF-16BE strings start with a byte order mark
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16(&units).ok();
    }
    String::from_utf8(bytes.to_vec()).ok()
}

/// Extract page count and document info from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    let (doc, page_count) = load(path)?;

    let info = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_dictionary(id))
        .ok();

    Ok(PdfMetadata {
        page_count,
        title: info.and_then(|d| info_text(d, b"Title")),
        author: info.and_then(|d| info_text(d, b"Author")),
        producer: info.and_then(|d| info_text(d, b"Producer")),
    })
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    load(path).map(|(_, page_count)| page_count)
}
