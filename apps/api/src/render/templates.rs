use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::DocumentError;

/// Visual template selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStyle {
    Modern,
    Classic,
    Minimal,
    Academic,
}

impl TemplateStyle {
    pub const ALL: [TemplateStyle; 4] = [
        TemplateStyle::Modern,
        TemplateStyle::Classic,
        TemplateStyle::Minimal,
        TemplateStyle::Academic,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            TemplateStyle::Modern => "modern",
            TemplateStyle::Classic => "classic",
            TemplateStyle::Minimal => "minimal",
            TemplateStyle::Academic => "academic",
        }
    }

    pub fn template(&self) -> &'static Template {
        match self {
            TemplateStyle::Modern => &MODERN,
            TemplateStyle::Classic => &CLASSIC,
            TemplateStyle::Minimal => &MINIMAL,
            TemplateStyle::Academic => &ACADEMIC,
        }
    }
}

impl fmt::Display for TemplateStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TemplateStyle {
    type Err = DocumentError;

    /// Unknown identifiers fail fast with `TemplateNotFound`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TemplateStyle::ALL
            .into_iter()
            .find(|style| style.id() == wanted)
            .ok_or_else(|| DocumentError::TemplateNotFound { id: s.to_string() })
    }
}

/// How the name line is typeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    Banner,
    Centered,
    SmallCaps,
}

/// Static description of one visual layout.
#[derive(Debug)]
pub struct Template {
    pub document_class: &'static str,
    pub packages: &'static [&'static str],
    pub geometry: &'static str,
    pub colors: &'static str,
    pub section_format: &'static str,
    pub name_style: NameStyle,
    /// Rendering fails unless the request metadata carries a name.
    pub requires_name: bool,
}

static MODERN: Template = Template {
    document_class: r"\documentclass[11pt,a4paper]{article}",
    packages: &[
        r"\usepackage[utf8]{inputenc}",
        r"\usepackage[T1]{fontenc}",
        r"\usepackage{geometry}",
        r"\usepackage{titlesec}",
        r"\usepackage{enumitem}",
        r"\usepackage{hyperref}",
        r"\usepackage{xcolor}",
    ],
    geometry: r"\geometry{top=1in, bottom=1in, left=0.75in, right=0.75in}",
    colors: r"\definecolor{primarycolor}{RGB}{0, 102, 204}",
    section_format: r"\titleformat{\section}{\large\bfseries\color{primarycolor}}{}{0em}{}[\titlerule]",
    name_style: NameStyle::Banner,
    requires_name: false,
};

static CLASSIC: Template = Template {
    document_class: r"\documentclass[11pt,a4paper]{article}",
    packages: &[
        r"\usepackage[utf8]{inputenc}",
        r"\usepackage[T1]{fontenc}",
        r"\usepackage{geometry}",
        r"\usepackage{enumitem}",
    ],
    geometry: r"\geometry{top=1in, bottom=1in, left=1in, right=1in}",
    colors: "",
    section_format: "",
    name_style: NameStyle::Centered,
    requires_name: false,
};

static MINIMAL: Template = Template {
    document_class: r"\documentclass[10pt,a4paper]{article}",
    packages: &[
        r"\usepackage[utf8]{inputenc}",
        r"\usepackage{geometry}",
        r"\usepackage{enumitem}",
    ],
    geometry: r"\geometry{top=0.75in, bottom=0.75in, left=0.75in, right=0.75in}",
    colors: "",
    section_format: r"\renewcommand{\section}[1]{\vspace{0.5em}\textbf{\large #1}\vspace{0.25em}\hrule\vspace{0.25em}}",
    name_style: NameStyle::Centered,
    requires_name: false,
};

static ACADEMIC: Template = Template {
    document_class: r"\documentclass[11pt,letterpaper]{article}",
    packages: &[
        r"\usepackage[utf8]{inputenc}",
        r"\usepackage[T1]{fontenc}",
        r"\usepackage{geometry}",
        r"\usepackage{titlesec}",
        r"\usepackage{enumitem}",
        r"\usepackage{hyperref}",
    ],
    geometry: r"\geometry{top=1in, bottom=1in, left=1in, right=1in}",
    colors: "",
    section_format: r"\titleformat{\section}{\normalsize\scshape}{}{0em}{}[\titlerule]",
    name_style: NameStyle::SmallCaps,
    requires_name: true,
};

impl Template {
    /// Everything up to and including `\begin{document}`, followed by a blank line.
    pub fn preamble(&self) -> String {
        let mut parts: Vec<&str> = vec![self.document_class, ""];
        parts.extend_from_slice(self.packages);
        parts.extend(["", self.geometry, ""]);

        if !self.colors.is_empty() {
            parts.extend([self.colors, ""]);
        }
        if !self.section_format.is_empty() {
            parts.extend([self.section_format, ""]);
        }

        parts.extend([
            r"\setlength{\parindent}{0pt}",
            r"\setlength{\parskip}{0.5em}",
            "",
            r"\begin{document}",
            "",
        ]);
        parts.join("\n")
    }

    /// Typesets an already-escaped name.
    pub fn name_line(&self, escaped_name: &str) -> String {
        match self.name_style {
            NameStyle::Banner => format!(r"\centerline{{\huge\textbf{{{escaped_name}}}}}"),
            NameStyle::Centered => {
                format!(r"\begin{{center}}\textbf{{\Large {escaped_name}}}\end{{center}}")
            }
            NameStyle::SmallCaps => {
                format!(r"\begin{{center}}{{\LARGE\scshape {escaped_name}}}\end{{center}}")
            }
        }
    }
}
