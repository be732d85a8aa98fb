//! Resume layout: contact header, recognised sections in canonical order,
//! per-section formatting. All user text passes through `escape_latex`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::render::escape::{escape_inline, escape_latex, guard_leading_bracket};

/// Contact details are only looked for in the first lines of the text.
const CONTACT_SCAN_LINES: usize = 10;
const MAX_NAME_WORDS: usize = 4;

const ITEMIZE_BEGIN: &str = r"\begin{itemize}[leftmargin=1em]";
const ITEMIZE_END: &str = r"\end{itemize}";
const BULLET_SEPARATOR: &str = r" $\bullet$ ";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[+]?[1-9]?[-\s.]?\(?[0-9]{3}\)?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4}").unwrap()
});
static LINKEDIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"linkedin\.com/in/[\w-]+").unwrap());
static GITHUB_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"github\.com/[\w-]+").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").unwrap());

static SECTION_PATTERNS: Lazy<Vec<(Regex, SectionKind)>> = Lazy::new(|| {
    [
        (r"(?i)^\s*(?:professional\s+)?(?:work\s+)?experience\s*:?\s*$", SectionKind::Experience),
        (r"(?i)^\s*(?:technical\s+)?skills?\s*:?\s*$", SectionKind::Skills),
        (r"(?i)^\s*education\s*:?\s*$", SectionKind::Education),
        (r"(?i)^\s*(?:professional\s+)?summary\s*:?\s*$", SectionKind::Summary),
        (r"(?i)^\s*projects?\s*:?\s*$", SectionKind::Projects),
        (r"(?i)^\s*certifications?\s*:?\s*$", SectionKind::Certifications),
        (r"(?i)^\s*achievements?\s*:?\s*$", SectionKind::Achievements),
        (r"(?i)^\s*publications?\s*:?\s*$", SectionKind::Publications),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).unwrap(), kind))
    .collect()
});

/// Recognised resume sections, declared in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Summary,
    Experience,
    Skills,
    Projects,
    Education,
    Certifications,
    Achievements,
    Publications,
}

impl SectionKind {
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Summary => "Summary",
            SectionKind::Experience => "Experience",
            SectionKind::Skills => "Skills",
            SectionKind::Projects => "Projects",
            SectionKind::Education => "Education",
            SectionKind::Certifications => "Certifications",
            SectionKind::Achievements => "Achievements",
            SectionKind::Publications => "Publications",
        }
    }

    /// Matches a heading line such as `Work Experience:` or `SKILLS`.
    pub fn from_heading(line: &str) -> Option<SectionKind> {
        SECTION_PATTERNS
            .iter()
            .find(|(re, _)| re.is_match(line))
            .map(|(_, kind)| *kind)
    }
}

/// Contact details, from request metadata or scraped from the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
}

impl ContactInfo {
    /// Fields set on `self` win; gaps are filled from `other`.
    pub fn or(self, other: ContactInfo) -> ContactInfo {
        ContactInfo {
            name: non_empty(self.name).or(other.name),
            email: non_empty(self.email).or(other.email),
            phone: non_empty(self.phone).or(other.phone),
            linkedin: non_empty(self.linkedin).or(other.linkedin),
            github: non_empty(self.github).or(other.github),
        }
    }

    fn details(&self) -> Vec<&str> {
        [&self.email, &self.phone, &self.linkedin, &self.github]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .collect()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Text split at recognised headings.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedResume {
    /// Lines before the first recognised heading.
    pub header: Vec<String>,
    /// Sections in order of first appearance; repeated headings are merged.
    pub sections: Vec<(SectionKind, Vec<String>)>,
}

impl ParsedResume {
    pub fn section(&self, kind: SectionKind) -> Option<&[String]> {
        self.sections
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, lines)| lines.as_slice())
    }
}

pub fn parse_sections(text: &str) -> ParsedResume {
    let mut parsed = ParsedResume::default();
    let mut current: Option<SectionKind> = None;

    for line in text.lines() {
        if let Some(kind) = SectionKind::from_heading(line) {
            if !parsed.sections.iter().any(|(k, _)| *k == kind) {
                parsed.sections.push((kind, Vec::new()));
            }
            current = Some(kind);
            continue;
        }

        let target = match current {
            Some(kind) => parsed
                .sections
                .iter_mut()
                .find(|(k, _)| *k == kind)
                .map(|(_, lines)| lines),
            None => Some(&mut parsed.header),
        };
        if let Some(lines) = target {
            lines.push(line.to_string());
        }
    }

    parsed
}

/// Scrapes contact details from the first lines, stopping at the first heading.
pub fn extract_contact_info(text: &str) -> ContactInfo {
    let mut info = ContactInfo::default();

    for line in text.lines().take(CONTACT_SCAN_LINES) {
        let line = line.trim();
        if SectionKind::from_heading(line).is_some() {
            break;
        }
        let lower = line.to_lowercase();

        if info.email.is_none() {
            info.email = EMAIL_RE.find(line).map(|m| m.as_str().to_string());
        }
        if info.phone.is_none() {
            info.phone = PHONE_RE.find(line).map(|m| m.as_str().trim().to_string());
        }
        if info.linkedin.is_none() && lower.contains("linkedin") {
            info.linkedin = LINKEDIN_RE.find(&lower).map(|m| m.as_str().to_string());
        }
        if info.github.is_none() && lower.contains("github") {
            info.github = GITHUB_RE.find(&lower).map(|m| m.as_str().to_string());
        }
        if info.name.is_none() && looks_like_name(line, &lower) {
            info.name = Some(line.to_string());
        }
    }

    info
}

fn looks_like_name(line: &str, lower: &str) -> bool {
    !line.is_empty()
        && !["@", "phone", "email", "linkedin", "github"]
            .iter()
            .any(|marker| lower.contains(marker))
        && !PHONE_RE.is_match(line)
        && line.split_whitespace().count() <= MAX_NAME_WORDS
}

/// A header line counts as contact information if it carries any contact detail.
fn is_contact_line(line: &str, contact: &ContactInfo) -> bool {
    let lower = line.to_lowercase();
    contact.name.as_deref() == Some(line)
        || EMAIL_RE.is_match(line)
        || PHONE_RE.is_match(line)
        || LINKEDIN_RE.is_match(&lower)
        || GITHUB_RE.is_match(&lower)
}

/// Renders the body (everything between `\begin{document}` and `\end{document}`).
pub fn render_body(
    text: &str,
    contact: &ContactInfo,
    name_line: impl Fn(&str) -> String,
    extra_sections: &[(String, String)],
) -> String {
    let parsed = parse_sections(text);
    let mut blocks: Vec<String> = Vec::new();

    if let Some(name) = contact.name.as_deref() {
        blocks.push(name_line(&escape_inline(name)));
    }

    let details = contact.details();
    if !details.is_empty() {
        let line = details
            .iter()
            .map(|d| escape_inline(d))
            .collect::<Vec<_>>()
            .join(BULLET_SEPARATOR);
        blocks.push(format!(r"\centerline{{{line}}}"));
    }

    let opening: Vec<&str> = parsed
        .header
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !is_contact_line(l, contact))
        .collect();
    if !opening.is_empty() {
        blocks.push(format_generic(&opening));
    }

    let mut ordered: Vec<&(SectionKind, Vec<String>)> = parsed.sections.iter().collect();
    ordered.sort_by_key(|(kind, _)| *kind);

    for (kind, lines) in ordered {
        let lines: Vec<&str> = lines.iter().map(|l| l.trim()).collect();
        if lines.iter().all(|l| l.is_empty()) {
            continue;
        }
        blocks.push(format!(r"\section{{{}}}", kind.title()));
        blocks.push(format_section(*kind, &lines));
    }

    for (title, content) in extra_sections {
        let lines: Vec<&str> = content.lines().map(str::trim).collect();
        if lines.iter().all(|l| l.is_empty()) {
            continue;
        }
        blocks.push(format!(r"\section{{{}}}", escape_inline(title)));
        blocks.push(format_generic(&lines));
    }

    blocks.join("\n\n")
}

fn format_section(kind: SectionKind, lines: &[&str]) -> String {
    match kind {
        SectionKind::Experience => format_experience(lines),
        SectionKind::Skills => format_skills(lines),
        SectionKind::Education => format_education(lines),
        _ => format_generic(lines),
    }
}

fn bullet_text(line: &str) -> Option<&str> {
    line.strip_prefix('•')
        .or_else(|| line.strip_prefix('-'))
        .or_else(|| line.strip_prefix('*'))
        .map(str::trim)
}

fn is_job_header(line: &str) -> bool {
    bullet_text(line).is_none() && (line.contains('|') || YEAR_RE.is_match(line))
}

fn itemize(items: &[String]) -> String {
    let mut out = vec![ITEMIZE_BEGIN.to_string()];
    out.extend(
        items
            .iter()
            .map(|item| format!(r"\item {}", guard_leading_bracket(item))),
    );
    out.push(ITEMIZE_END.to_string());
    out.join("\n")
}

/// Job headers (a `|` or a year) in bold, the lines under them as bullets.
fn format_experience(lines: &[&str]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.is_empty() {
            i += 1;
            continue;
        }

        if is_job_header(line) {
            blocks.push(format!(r"\textbf{{{}}}", escape_inline(line)));
            i += 1;

            let mut items = Vec::new();
            while i < lines.len() && !lines[i].is_empty() && !is_job_header(lines[i]) {
                let next = lines[i];
                items.push(escape_latex(bullet_text(next).unwrap_or(next)));
                i += 1;
            }
            if !items.is_empty() {
                blocks.push(itemize(&items));
            }
        } else {
            let mut items = Vec::new();
            while i < lines.len() {
                match bullet_text(lines[i]) {
                    Some(text) => items.push(escape_latex(text)),
                    None => break,
                }
                i += 1;
            }
            if items.is_empty() {
                blocks.push(escape_latex(line));
                i += 1;
            } else {
                blocks.push(itemize(&items));
            }
        }
    }

    blocks.join("\n\n")
}

/// One comma-separated line becomes bold skills; anything else is joined with bullets.
fn format_skills(lines: &[&str]) -> String {
    let lines: Vec<&str> = lines.iter().copied().filter(|l| !l.is_empty()).collect();

    if let [single] = lines.as_slice() {
        if single.contains(',') && !single.contains(':') {
            return single
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| format!(r"\textbf{{{}}}", escape_latex(s)))
                .collect::<Vec<_>>()
                .join(", ");
        }
    }

    lines
        .iter()
        .map(|l| escape_latex(bullet_text(l).unwrap_or(l)))
        .collect::<Vec<_>>()
        .join(BULLET_SEPARATOR)
}

const DEGREE_WORDS: &[&str] = &["bachelor", "master", "phd", "university", "college"];

fn format_education(lines: &[&str]) -> String {
    lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| {
            let lower = l.to_lowercase();
            if DEGREE_WORDS.iter().any(|w| lower.contains(w)) {
                format!(r"\textbf{{{}}}", escape_latex(l))
            } else {
                escape_latex(l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Bullet runs become `itemize`; other lines are separate paragraphs.
fn format_generic(lines: &[&str]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut items: Vec<String> = Vec::new();

    for line in lines {
        match bullet_text(line) {
            Some(text) => items.push(escape_latex(text)),
            None => {
                if !items.is_empty() {
                    blocks.push(itemize(&std::mem::take(&mut items)));
                }
                if !line.is_empty() {
                    blocks.push(escape_latex(line));
                }
            }
        }
    }
    if !items.is_empty() {
        blocks.push(itemize(&items));
    }

    blocks.join("\n\n")
}
