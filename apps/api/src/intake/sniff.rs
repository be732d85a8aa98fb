//! Magic-byte sniffing. The declared extension is never consulted here.

use std::io::Cursor;

use zip::ZipArchive;

/// Bytes inspected when deciding whether a buffer is text.
pub const SNIFF_WINDOW: usize = 8 * 1024;

/// Window at the end of a PDF that must contain the `%%EOF` trailer.
const PDF_TRAILER_WINDOW: usize = 2048;

const DOCX_BODY_PART: &str = "word/document.xml";

/// Result of inspecting a buffer's leading bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sniffed {
    Pdf,
    Docx,
    /// Text; `latex` is true when LaTeX markers were found.
    Text { latex: bool },
    /// A recognised format outside the allow-list.
    Foreign(&'static str),
    /// A supported signature with inconsistent contents.
    Corrupt(String),
    /// Binary data with no recognisable signature.
    UnknownBinary,
}

/// Known signatures that are never accepted, with a human-readable name.
const FOREIGN_SIGNATURES: &[(&[u8], &str)] = &[
    (b"MZ", "Windows executable"),
    (b"\x7fELF", "ELF executable"),
    (b"\xfe\xed\xfa\xce", "Mach-O executable"),
    (b"\xfe\xed\xfa\xcf", "Mach-O executable"),
    (b"\xce\xfa\xed\xfe", "Mach-O executable"),
    (b"\xcf\xfa\xed\xfe", "Mach-O executable"),
    (b"\xca\xfe\xba\xbe", "Mach-O universal binary"),
    (b"#!", "script"),
    (b"\x89PNG\r\n\x1a\n", "PNG image"),
    (b"\xff\xd8\xff", "JPEG image"),
    (b"GIF87a", "GIF image"),
    (b"GIF89a", "GIF image"),
    (b"\xd0\xcf\x11\xe0\xa1\xb1\x1a\xe1", "legacy Office (OLE2) document"),
    (b"\x1f\x8b", "gzip archive"),
    (b"Rar!\x1a\x07", "RAR archive"),
    (b"7z\xbc\xaf\x27\x1c", "7z archive"),
    (b"%!PS", "PostScript document"),
    (b"{\\rtf", "RTF document"),
    (b"\0asm", "WebAssembly module"),
];

const LATEX_MARKERS: &[&str] = &[
    "\\documentclass",
    "\\begin{document}",
    "\\section",
    "\\usepackage",
    "\\textbf",
    "\\begin{itemize}",
];

/// Classifies `bytes` by content. `bytes` must be non-empty.
///
/// Disallowed signatures are checked first, so a file cannot pass as a PDF by
/// embedding a header after foreign magic bytes.
pub fn sniff(bytes: &[u8]) -> Sniffed {
    if let Some((_, name)) = FOREIGN_SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
    {
        return Sniffed::Foreign(name);
    }

    if pdf_header_at_start(bytes) {
        let tail = &bytes[bytes.len().saturating_sub(PDF_TRAILER_WINDOW)..];
        if find(tail, b"%%EOF").is_none() {
            return Sniffed::Corrupt("PDF header present but no %%EOF trailer".to_string());
        }
        return Sniffed::Pdf;
    }

    if bytes.starts_with(b"PK\x03\x04") {
        return sniff_zip(bytes);
    }

    if bytes.starts_with(b"PK\x05\x06") || bytes.starts_with(b"PK\x07\x08") {
        return Sniffed::Foreign("ZIP archive");
    }

    if is_text(bytes) {
        return Sniffed::Text {
            latex: has_latex_markers(bytes),
        };
    }

    Sniffed::UnknownBinary
}

/// `%PDF-` at offset 0, after an optional UTF-8 BOM and leading whitespace.
fn pdf_header_at_start(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"%PDF-")
}

fn sniff_zip(bytes: &[u8]) -> Sniffed {
    let archive = match ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(e) => return Sniffed::Corrupt(format!("ZIP container cannot be opened: {e}")),
    };

    if archive.file_names().any(|name| name == DOCX_BODY_PART) {
        Sniffed::Docx
    } else {
        Sniffed::Foreign("ZIP archive (not a Word document)")
    }
}

/// UTF-8/UTF-16 BOM, or no NUL and no control bytes besides tab, LF, CR, FF and ESC.
fn is_text(bytes: &[u8]) -> bool {
    if bytes.starts_with(b"\xef\xbb\xbf")
        || bytes.starts_with(b"\xff\xfe")
        || bytes.starts_with(b"\xfe\xff")
    {
        return true;
    }

    bytes[..bytes.len().min(SNIFF_WINDOW)]
        .iter()
        .all(|&b| b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b))
}

fn has_latex_markers(bytes: &[u8]) -> bool {
    let window = String::from_utf8_lossy(&bytes[..bytes.len().min(SNIFF_WINDOW)]);
    LATEX_MARKERS.iter().any(|marker| window.contains(marker))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
