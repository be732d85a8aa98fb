//! DOCX body text, streamed from `word/document.xml` in document order.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::errors::DocumentError;

const BODY_PART: &str = "word/document.xml";

/// One line per body paragraph. Table cells become one line each, row-major,
/// with the paragraphs inside a cell joined by a space.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, DocumentError> {
    let failed = |reason: String| DocumentError::ExtractionFailed {
        filename: filename.to_string(),
        reason,
    };

    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| failed(format!("bad DOCX container: {e}")))?;
    let mut part = archive
        .by_name(BODY_PART)
        .map_err(|e| failed(format!("{BODY_PART} not readable: {e}")))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            DocumentError::EncodingError {
                filename: filename.to_string(),
                reason: format!("{BODY_PART} is not valid UTF-8"),
            }
        } else {
            failed(format!("{BODY_PART} not readable: {e}"))
        }
    })?;

    body_lines(&xml)
        .map(|lines| lines.join("\n"))
        .map_err(|e| failed(format!("malformed {BODY_PART}: {e}")))
}

#[derive(Default)]
struct Walker {
    lines: Vec<String>,
    /// Paragraphs collected per open table cell, innermost last.
    cells: Vec<Vec<String>>,
    paragraph: String,
    in_text: bool,
    in_tab_stops: bool,
}

impl Walker {
    fn emit(&mut self, line: String) {
        match self.cells.last_mut() {
            Some(cell) => cell.push(line),
            None => self.lines.push(line),
        }
    }

    fn end_paragraph(&mut self) {
        let line = std::mem::take(&mut self.paragraph);
        self.emit(line);
    }

    fn end_cell(&mut self) {
        if let Some(cell) = self.cells.pop() {
            let joined = cell
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            self.emit(joined);
        }
    }
}

fn body_lines(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut walker = Walker::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => walker.in_text = true,
                b"tabs" => walker.in_tab_stops = true,
                b"tc" => walker.cells.push(Vec::new()),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if !walker.in_tab_stops => walker.paragraph.push('\t'),
                b"br" | b"cr" => walker.paragraph.push('\n'),
                b"p" => walker.emit(String::new()),
                _ => {}
            },
            Event::Text(t) if walker.in_text => {
                walker.paragraph.push_str(&t.unescape()?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => walker.in_text = false,
                b"tabs" => walker.in_tab_stops = false,
                b"p" => walker.end_paragraph(),
                b"tc" => walker.end_cell(),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(walker.lines)
}
