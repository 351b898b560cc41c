//! Embedded text extraction for PDFs.
//!
//! A PDF whose pages average at least [`MIN_AVG_CHARS_PER_PAGE`] characters
//! of embedded text is taken as-is; anything below that is treated as a scan.

use std::io::Cursor;

use lopdf::Document;
use tracing::debug;

use crate::error::{ConvertError, Result};

/// Separator placed between per-page text, both for text layers and OCR output.
pub const PAGE_BREAK: &str = "\n\n---\n\n";

pub const MIN_AVG_CHARS_PER_PAGE: f64 = 50.0;

/// Per-page embedded text of one PDF.
#[derive(Debug, Clone, Default)]
pub struct TextLayer {
    pub pages: Vec<String>,
}

impl TextLayer {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn joined(&self) -> String {
        self.pages.join(PAGE_BREAK)
    }

    /// Average characters per page, markers excluded.
    pub fn avg_chars_per_page(&self) -> f64 {
        if self.pages.is_empty() {
            return 0.0;
        }
        let total: usize = self.pages.iter().map(|p| p.chars().count()).sum();
        total as f64 / self.pages.len() as f64
    }

    pub fn is_usable(&self) -> bool {
        !self.pages.is_empty() && self.avg_chars_per_page() >= MIN_AVG_CHARS_PER_PAGE
    }
}

/// Extract the text layer of a PDF held in memory.
///
/// Errors mean the PDF could not be parsed; callers fall back to OCR.
/// Pages that fail individually contribute empty text.
pub fn extract_text_layer(data: &[u8]) -> Result<TextLayer> {
    let doc = load(data)?;
    let pages = doc
        .get_pages()
        .into_keys()
        .map(|page_num| match doc.extract_text(&[page_num]) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                debug!("page {}: no extractable text ({})", page_num, e);
                String::new()
            }
        })
        .collect::<Vec<_>>();

    let layer = TextLayer { pages };
    debug!(
        "text layer: {} pages, {:.1} chars/page",
        layer.page_count(),
        layer.avg_chars_per_page()
    );
    Ok(layer)
}

/// Page count, if the PDF parses.
pub fn page_count(data: &[u8]) -> Option<usize> {
    load(data).ok().map(|doc| doc.get_pages().len())
}

fn load(data: &[u8]) -> Result<Document> {
    let doc = Document::load_from(Cursor::new(data))
        .map_err(|e| ConvertError::Parse(format!("failed to load PDF: {}", e)))?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(ConvertError::Parse("PDF is encrypted".to_string()));
    }
    if doc.get_pages().is_empty() {
        return Err(ConvertError::Parse("PDF has no pages".to_string()));
    }
    Ok(doc)
}
