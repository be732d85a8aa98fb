//! PDF text layer extraction.

use std::panic::{self, AssertUnwindSafe};

use lopdf::Document;
use tracing::{debug, warn};

use crate::errors::DocumentError;

/// Text layer of a PDF.
#[derive(Debug, Clone)]
pub struct PdfText {
    /// Page count from the page tree, independent of how the text splits.
    pub page_count: usize,
    /// Text segments in page order. Blank pages are skipped.
    pub pages: Vec<String>,
}

/// Returns the text of each page, in page order.
///
/// Encrypted documents and documents without a text layer fail with
/// `ExtractionFailed`. Replacement characters emitted by the decoder are an
/// `EncodingError`, never passed on.
pub fn extract_pages(bytes: &[u8], filename: &str) -> Result<PdfText, DocumentError> {
    let failed = |reason: String| DocumentError::ExtractionFailed {
        filename: filename.to_string(),
        reason,
    };

    let doc = Document::load_mem(bytes).map_err(|e| failed(format!("unreadable PDF: {e}")))?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(failed("document is encrypted".to_string()));
    }
    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(failed("document has no pages".to_string()));
    }
    debug!("'{}': {} page(s)", filename, page_count);

    // The decoder panics on some malformed content streams.
    let text = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)))
        .map_err(|_| {
            warn!("PDF decoder panicked on '{}'", filename);
            failed("PDF decoder crashed on malformed content".to_string())
        })?
        .map_err(|e| failed(e.to_string()))?;

    if text.contains('\u{FFFD}') {
        return Err(DocumentError::EncodingError {
            filename: filename.to_string(),
            reason: "PDF text layer contains undecodable glyphs".to_string(),
        });
    }

    if text.trim().is_empty() {
        return Err(failed(
            "no text layer found (scanned or image-only PDF)".to_string(),
        ));
    }

    let pages = text
        .split('\x0c')
        .map(|page| page.trim_matches('\n').to_string())
        .filter(|page| !page.trim().is_empty())
        .collect();
    Ok(PdfText { page_count, pages })
}
