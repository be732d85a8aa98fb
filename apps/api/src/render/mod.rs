// Document rendering: normalized text + template selection in, complete LaTeX
// source out. Deterministic; every piece of user text is escaped.

pub mod escape;
pub mod handlers;
pub mod resume;
pub mod templates;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::DocumentError;
use escape::{escape_latex, guard_leading_bracket};
use resume::{extract_contact_info, ContactInfo};
use templates::TemplateStyle;

const DEFAULT_STYLE: &str = "modern";
const SUGGESTIONS_HEADER: &str = "% IMPROVEMENT SUGGESTIONS:";

/// Which body layout to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Contact header and recognised resume sections.
    #[default]
    Resume,
    /// The text as plain paragraphs inside the template.
    Document,
}

/// A section supplied directly by the caller rather than parsed from text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataSection {
    pub title: String,
    pub content: String,
}

/// Optional structured data that overrides or supplements the text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeMetadata {
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub sections: Vec<MetadataSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub metadata: Option<ResumeMetadata>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub layout: Layout,
}

fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}

impl RenderRequest {
    pub fn new(text: impl Into<String>, style: TemplateStyle) -> Self {
        Self {
            text: text.into(),
            style: style.id().to_string(),
            metadata: None,
            suggestions: Vec::new(),
            layout: Layout::Resume,
        }
    }
}

/// Renders a complete LaTeX document for the request.
///
/// Fails with `TemplateNotFound` for an unknown style, and with `RenderError`
/// when there is nothing to render, a metadata section has no title, or the
/// template requires a name the metadata does not provide.
pub fn render(request: &RenderRequest) -> Result<String, DocumentError> {
    let style: TemplateStyle = request.style.parse()?;
    let template = style.template();
    let render_error = |reason: &str| DocumentError::RenderError {
        template: style.id().to_string(),
        reason: reason.to_string(),
    };

    let metadata = request.metadata.clone().unwrap_or_default();

    if request.text.trim().is_empty() && metadata.sections.is_empty() {
        return Err(render_error("request has no text and no metadata sections"));
    }
    if metadata.sections.iter().any(|s| s.title.trim().is_empty()) {
        return Err(render_error("metadata section with an empty title"));
    }
    let has_name = metadata
        .contact
        .name
        .as_deref()
        .is_some_and(|n| !n.trim().is_empty());
    if template.requires_name && !has_name {
        return Err(render_error("template requires metadata.name"));
    }

    let body = match request.layout {
        Layout::Resume => {
            let contact = metadata.contact.clone().or(extract_contact_info(&request.text));
            let extra: Vec<(String, String)> = metadata
                .sections
                .iter()
                .map(|s| (s.title.clone(), s.content.clone()))
                .collect();
            resume::render_body(&request.text, &contact, |n| template.name_line(n), &extra)
        }
        Layout::Document => document_body(&request.text),
    };

    let mut parts = vec![template.preamble(), body, String::new()];
    if let Some(comment) = suggestions_comment(&request.suggestions) {
        parts.push(comment);
    }
    parts.push(r"\end{document}".to_string());
    let source = parts.join("\n") + "\n";

    info!(
        "Rendered {} layout with '{}' template: {} bytes",
        match request.layout {
            Layout::Resume => "resume",
            Layout::Document => "document",
        },
        style,
        source.len()
    );

    Ok(source)
}

/// Paragraphs separated by blank lines; line breaks inside a paragraph kept.
fn document_body(text: &str) -> String {
    text.split("\n\n")
        .map(|paragraph| {
            paragraph
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| guard_leading_bracket(&escape_latex(l)))
                .collect::<Vec<_>>()
                .join(" \\\\\n")
        })
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Suggestions as LaTeX comments, one `% ` line per suggestion line.
fn suggestions_comment(suggestions: &[String]) -> Option<String> {
    let lines: Vec<String> = suggestions
        .iter()
        .flat_map(|s| s.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("% {}", escape_latex(l)))
        .collect();

    if lines.is_empty() {
        return None;
    }
    Some(std::iter::once(SUGGESTIONS_HEADER.to_string()).chain(lines).collect::<Vec<_>>().join("\n"))
}
