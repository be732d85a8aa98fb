// Text extraction: one strategy per sniffed format, all ending in the same
// normalization pass. Output is always non-empty, valid UTF-8.

pub mod docx;
pub mod handlers;
pub mod latex;
pub mod pdf;

use serde::Serialize;
use tracing::info;

use crate::errors::DocumentError;
use crate::intake::{FileKind, ValidatedUpload};

/// Format the text was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Pdf,
    Docx,
    Latex,
    PlainText,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    pub text: String,
    pub format: SourceFormat,
    /// Known for PDFs only.
    pub page_count: Option<usize>,
}

/// Extracts normalized text from a buffer that has already passed intake.
pub fn extract(bytes: &[u8], upload: &ValidatedUpload) -> Result<ExtractedDocument, DocumentError> {
    let filename = upload.filename.as_str();

    let (raw, format, page_count) = match upload.kind {
        FileKind::Pdf => {
            let pdf = pdf::extract_pages(bytes, filename)?;
            (pdf.pages.join("\n\n"), SourceFormat::Pdf, Some(pdf.page_count))
        }
        FileKind::Docx => (docx::extract_text(bytes, filename)?, SourceFormat::Docx, None),
        FileKind::Text => {
            let source = decode_text(bytes, filename)?;
            if latex::has_markup(&source) {
                (latex::strip(&source), SourceFormat::Latex, None)
            } else {
                (source, SourceFormat::PlainText, None)
            }
        }
    };

    let text = normalize(&raw);
    if text.is_empty() {
        return Err(DocumentError::ExtractionFailed {
            filename: filename.to_string(),
            reason: "no text content found".to_string(),
        });
    }

    info!(
        "Extracted {} chars from '{}' ({:?}, pages: {:?})",
        text.chars().count(),
        filename,
        format,
        page_count
    );

    Ok(ExtractedDocument {
        text,
        format,
        page_count,
    })
}

/// Decodes a text upload. Only UTF-8 is accepted; nothing is replaced lossily.
fn decode_text(bytes: &[u8], filename: &str) -> Result<String, DocumentError> {
    if bytes.starts_with(b"\xff\xfe") || bytes.starts_with(b"\xfe\xff") {
        return Err(DocumentError::EncodingError {
            filename: filename.to_string(),
            reason: "UTF-16 text is not supported, save the file as UTF-8".to_string(),
        });
    }

    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|e| DocumentError::EncodingError {
        filename: filename.to_string(),
        reason: e.to_string(),
    })
}

/// CRLF/CR to LF, form feeds to paragraph breaks, trailing whitespace trimmed,
/// blank-line runs collapsed, leading/trailing blank lines removed.
pub fn normalize(text: &str) -> String {
    let text = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\x0c', "\n\n");

    let mut lines: Vec<&str> = Vec::new();
    let mut previous_blank = true;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !previous_blank {
                lines.push("");
            }
            previous_blank = true;
        } else {
            lines.push(line);
            previous_blank = false;
        }
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::IntakeValidator;

    fn upload(bytes: &[u8], name: &str) -> ValidatedUpload {
        IntakeValidator::new(1024 * 1024)
            .validate(bytes, name, None)
            .unwrap()
    }

    #[test]
    fn test_normalize() {
        let raw = "\n\r\nJane Doe  \r\nEngineer\t\n\n\n\nSkills\rRust\n\n";
        assert_eq!(normalize(raw), "Jane Doe\nEngineer\n\nSkills\nRust");
    }

    #[test]
    fn test_normalize_form_feed_is_paragraph_break() {
        assert_eq!(normalize("page one\x0cpage two"), "page one\n\npage two");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let bytes = b"Jane Doe\r\nEXPERIENCE\r\nAcme Corp | 2020 - 2024\r\n";
        let doc = extract(bytes, &upload(bytes, "cv.txt")).unwrap();
        assert_eq!(doc.format, SourceFormat::PlainText);
        assert_eq!(doc.text, "Jane Doe\nEXPERIENCE\nAcme Corp | 2020 - 2024");
        assert_eq!(doc.page_count, None);
    }

    #[test]
    fn test_latex_source_is_stripped() {
        let bytes = b"\\documentclass{article}\n\\begin{document}\n\\section{Experience}\n\\textbf{Engineer} at Acme\n\\end{document}\n";
        let doc = extract(bytes, &upload(bytes, "cv.tex")).unwrap();
        assert_eq!(doc.format, SourceFormat::Latex);
        assert_eq!(doc.text, "Experience\nEngineer at Acme");
    }

    #[test]
    fn test_bom_is_dropped() {
        let bytes = "\u{feff}Résumé".as_bytes();
        let doc = extract(bytes, &upload(bytes, "cv.txt")).unwrap();
        assert_eq!(doc.text, "Résumé");
    }

    #[test]
    fn test_invalid_utf8_is_encoding_error() {
        let bytes = b"Jane Doe\nCaf\xe9 owner\n";
        let err = extract(bytes, &upload(bytes, "cv.txt")).unwrap_err();
        assert!(matches!(err, DocumentError::EncodingError { .. }), "{err:?}");
    }

    #[test]
    fn test_utf16_is_encoding_error() {
        let bytes = b"\xff\xfeJ\x00a\x00n\x00e\x00";
        let err = extract(bytes, &upload(bytes, "cv.txt")).unwrap_err();
        assert!(matches!(err, DocumentError::EncodingError { .. }), "{err:?}");
    }

    #[test]
    fn test_whitespace_only_text_fails_extraction() {
        let bytes = b" \n\t\n \r\n";
        let err = extract(bytes, &upload(bytes, "cv.txt")).unwrap_err();
        assert!(matches!(err, DocumentError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_two_page_pdf_keeps_lines_in_order() {
        let bytes = pdf::tests::pdf_with_pages(&["Experience", "Engineer"]);
        let doc = extract(&bytes, &upload(&bytes, "cv.pdf")).unwrap();
        assert_eq!(doc.format, SourceFormat::Pdf);
        assert_eq!(doc.page_count, Some(2));
        let experience = doc.text.find("Experience").unwrap();
        let engineer = doc.text.find("Engineer").unwrap();
        assert!(experience < engineer, "{}", doc.text);
    }

    #[test]
    fn test_docx_paragraphs_through_intake() {
        let body = ["Jane Doe", "Skills", "Rust, SQL"]
            .iter()
            .map(|p| docx::tests::paragraph(p))
            .collect::<String>();
        let bytes = docx::tests::docx_with_body(&body);
        let doc = extract(&bytes, &upload(&bytes, "cv.docx")).unwrap();
        assert_eq!(doc.format, SourceFormat::Docx);
        assert_eq!(doc.text, "Jane Doe\nSkills\nRust, SQL");
    }

    #[test]
    fn test_comment_only_latex_fails_extraction() {
        let bytes = b"\\documentclass{article}\n% nothing here\n\\begin{document}\n\\end{document}\n";
        let err = extract(bytes, &upload(bytes, "cv.tex")).unwrap_err();
        assert!(matches!(err, DocumentError::ExtractionFailed { .. }));
    }
}
