// File intake: decides what an upload really is before anything parses it.
// Content type comes from magic bytes; the declared name and MIME are hints only.

pub mod sniff;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::errors::DocumentError;
use sniff::Sniffed;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEX: &str = "text/x-tex";
pub const MIME_TEXT: &str = "text/plain";

/// Allow-listed formats, as determined by sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Docx,
    Text,
}

impl FileKind {
    fn accepts_extension(&self, ext: &str) -> bool {
        match self {
            FileKind::Pdf => ext == "pdf",
            FileKind::Docx => ext == "docx",
            FileKind::Text => matches!(ext, "txt" | "text" | "md" | "tex" | "latex" | ""),
        }
    }
}

/// Descriptor handed to the extractor once an upload has passed intake.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedUpload {
    pub filename: String,
    pub extension: String,
    pub kind: FileKind,
    pub mime: &'static str,
    pub size: usize,
    pub declared_mime: Option<String>,
    /// Declared extension or MIME disagreed with the sniffed type.
    pub extension_mismatch: bool,
}

/// Stateless upload validator. Holds only the configured ceiling.
#[derive(Debug, Clone, Copy)]
pub struct IntakeValidator {
    max_upload_bytes: usize,
}

impl IntakeValidator {
    pub fn new(max_upload_bytes: usize) -> Self {
        Self { max_upload_bytes }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.max_upload_bytes)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Validates an upload and returns its descriptor.
    ///
    /// Order of checks: empty buffer, size ceiling, then content sniffing.
    pub fn validate(
        &self,
        bytes: &[u8],
        declared_name: &str,
        declared_mime: Option<&str>,
    ) -> Result<ValidatedUpload, DocumentError> {
        let filename = sanitize_filename(declared_name);

        if bytes.is_empty() {
            return Err(DocumentError::CorruptFile {
                filename,
                reason: "file is empty".to_string(),
            });
        }

        if bytes.len() > self.max_upload_bytes {
            return Err(DocumentError::PayloadTooLarge {
                filename,
                size: bytes.len(),
                limit: self.max_upload_bytes,
            });
        }

        let (kind, mime) = match sniff::sniff(bytes) {
            Sniffed::Pdf => (FileKind::Pdf, MIME_PDF),
            Sniffed::Docx => (FileKind::Docx, MIME_DOCX),
            Sniffed::Text { latex: true } => (FileKind::Text, MIME_TEX),
            Sniffed::Text { latex: false } => (FileKind::Text, MIME_TEXT),
            Sniffed::Foreign(detected) => {
                return Err(DocumentError::UnsupportedFormat {
                    filename,
                    detected: detected.to_string(),
                })
            }
            Sniffed::Corrupt(reason) => return Err(DocumentError::CorruptFile { filename, reason }),
            Sniffed::UnknownBinary => {
                return Err(DocumentError::CorruptFile {
                    filename,
                    reason: "binary content with no recognisable signature".to_string(),
                })
            }
        };

        let extension = extension_of(&filename);
        let declared_mime = declared_mime
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let extension_mismatch = !kind.accepts_extension(&extension)
            || declared_mime
                .as_deref()
                .is_some_and(|m| !mime_agrees(kind, m));

        if extension_mismatch {
            warn!(
                "Upload '{}' declared as .{} ({}) but content is {}",
                filename,
                extension,
                declared_mime.as_deref().unwrap_or("no MIME hint"),
                mime
            );
        }

        info!(
            "Intake accepted '{}': {:?}, {} bytes",
            filename,
            kind,
            bytes.len()
        );

        Ok(ValidatedUpload {
            filename,
            extension,
            kind,
            mime,
            size: bytes.len(),
            declared_mime,
            extension_mismatch,
        })
    }
}

/// Whether a declared MIME hint is compatible with the sniffed kind.
/// Generic hints (`application/octet-stream`) never count as a mismatch.
fn mime_agrees(kind: FileKind, declared: &str) -> bool {
    let declared = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if declared == "application/octet-stream" {
        return true;
    }
    match kind {
        FileKind::Pdf => declared == MIME_PDF,
        FileKind::Docx => declared == MIME_DOCX,
        FileKind::Text => {
            declared.starts_with("text/")
                || matches!(declared.as_str(), "application/x-tex" | "application/x-latex")
        }
    }
}

/// Keeps `[A-Za-z0-9._-]`, strips leading dots/underscores, falls back to `upload`.
pub fn sanitize_filename(name: &str) -> String {
    // Only the last path component is meaningful.
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches(['.', '_']);

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_UPLOAD_BYTES;

    const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF\n";

    fn validator() -> IntakeValidator {
        IntakeValidator::new(DEFAULT_MAX_UPLOAD_BYTES)
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Resume (final).pdf"), "MyResumefinal.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\jane\\cv.docx"), "cv.docx");
        assert_eq!(sanitize_filename(".._hidden.txt"), "hidden.txt");
        assert_eq!(sanitize_filename("日本語"), "upload");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn test_empty_buffer_is_corrupt() {
        let err = validator().validate(b"", "cv.pdf", None).unwrap_err();
        assert!(matches!(err, DocumentError::CorruptFile { .. }));
    }

    #[test]
    fn test_ten_megabyte_pdf_exceeds_five_megabyte_ceiling() {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.resize(10 * 1024 * 1024, b' ');
        bytes.extend_from_slice(b"\n%%EOF\n");

        let err = IntakeValidator::new(5 * 1024 * 1024)
            .validate(&bytes, "huge.pdf", Some(MIME_PDF))
            .unwrap_err();
        match err {
            DocumentError::PayloadTooLarge {
                filename,
                size,
                limit,
            } => {
                assert_eq!(filename, "huge.pdf");
                assert_eq!(size, bytes.len());
                assert_eq!(limit, 5 * 1024 * 1024);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_size_is_checked_before_sniffing() {
        // An executable over the limit reports size, not format.
        let mut bytes = b"MZ".to_vec();
        bytes.resize(64, 0);
        let err = IntakeValidator::new(16)
            .validate(&bytes, "setup.exe", None)
            .unwrap_err();
        assert!(matches!(err, DocumentError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_executable_renamed_to_pdf_is_unsupported() {
        let err = validator()
            .validate(b"MZ\x90\x00\x03\x00\x00\x00\x04\x00", "resume.pdf", Some(MIME_PDF))
            .unwrap_err();
        match err {
            DocumentError::UnsupportedFormat { filename, detected } => {
                assert_eq!(filename, "resume.pdf");
                assert_eq!(detected, "Windows executable");
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_disallowed_signatures_regardless_of_extension() {
        let payloads: &[&[u8]] = &[
            b"\x7fELF\x02\x01\x01\x00",
            b"#!/usr/bin/env python\nprint('hi')\n",
            b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR",
            b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1\x00\x00",
        ];
        for name in ["resume.pdf", "resume.docx", "resume.txt", "resume"] {
            for bytes in payloads {
                let err = validator().validate(bytes, name, None).unwrap_err();
                assert!(
                    matches!(err, DocumentError::UnsupportedFormat { .. }),
                    "{name}: {err:?}"
                );
            }
        }
    }

    #[test]
    fn test_executable_with_embedded_pdf_header_is_unsupported() {
        for magic in [&b"MZ\x90\x00"[..], b"\x7fELF\x02\x01", b"#!/bin/sh"] {
            let mut bytes = magic.to_vec();
            bytes.extend_from_slice(b"\n# %PDF-1.4\n");
            bytes.extend_from_slice(&[b'A'; 512]);
            bytes.extend_from_slice(b"\n%%EOF\n");

            let err = validator()
                .validate(&bytes, "resume.pdf", Some(MIME_PDF))
                .unwrap_err();
            assert!(
                matches!(err, DocumentError::UnsupportedFormat { .. }),
                "{:?}: {err:?}",
                &magic[..2]
            );
        }
    }

    #[test]
    fn test_pdf_accepted_with_matching_extension() {
        let upload = validator()
            .validate(MINIMAL_PDF, "cv.PDF", Some("application/pdf"))
            .unwrap();
        assert_eq!(upload.kind, FileKind::Pdf);
        assert_eq!(upload.mime, MIME_PDF);
        assert_eq!(upload.extension, "pdf");
        assert!(!upload.extension_mismatch);
    }

    #[test]
    fn test_extension_mismatch_is_flagged_not_rejected() {
        let upload = validator().validate(MINIMAL_PDF, "cv.txt", None).unwrap();
        assert_eq!(upload.kind, FileKind::Pdf);
        assert!(upload.extension_mismatch);

        let upload = validator()
            .validate(b"Jane Doe\nEngineer\n", "cv.txt", Some("application/pdf"))
            .unwrap();
        assert_eq!(upload.kind, FileKind::Text);
        assert!(upload.extension_mismatch);
    }

    #[test]
    fn test_text_mime_follows_latex_markers() {
        let upload = validator()
            .validate(b"\\section{Experience}\nEngineer\n", "cv.tex", None)
            .unwrap();
        assert_eq!(upload.mime, MIME_TEX);

        let upload = validator()
            .validate(b"Experience\nEngineer\n", "cv.txt", Some("text/plain; charset=utf-8"))
            .unwrap();
        assert_eq!(upload.mime, MIME_TEXT);
        assert!(!upload.extension_mismatch);
    }

    #[test]
    fn test_docx_detected_from_container() {
        let docx = sniff::tests::zip_with(&[("word/document.xml", "<w:document/>")]);
        let upload = validator()
            .validate(&docx, "cv.docx", Some("application/octet-stream"))
            .unwrap();
        assert_eq!(upload.kind, FileKind::Docx);
        assert!(!upload.extension_mismatch);
    }

    #[test]
    fn test_unknown_binary_is_corrupt() {
        let err = validator()
            .validate(b"\x00\x00\x01\x02\x03", "cv.pdf", None)
            .unwrap_err();
        assert!(matches!(err, DocumentError::CorruptFile { .. }));
    }

    #[test]
    fn test_descriptor_serializes_for_diagnostics() {
        let upload = validator().validate(MINIMAL_PDF, "cv.pdf", None).unwrap();
        let value = serde_json::to_value(&upload).unwrap();
        assert_eq!(value["kind"], "pdf");
        assert_eq!(value["mime"], MIME_PDF);
        assert_eq!(value["size"], MINIMAL_PDF.len());
    }
}
