//! Cheap structural checks run before a compiler process is spawned.

use once_cell::sync::Lazy;
use regex::Regex;

const REQUIRED: &[(&str, &str)] = &[
    ("\\documentclass", "document class declaration (\\documentclass)"),
    ("\\begin{document}", "document begin (\\begin{document})"),
    ("\\end{document}", "document end (\\end{document})"),
];

static BEGIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\begin\{([^}]+)\}").unwrap());
static END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\end\{([^}]+)\}").unwrap());
static ITEMIZE_OPTIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\begin\{(?:itemize|enumerate|description)\}\s*\[").unwrap());

/// (package, commands that need it)
const PACKAGE_USES: &[(&str, &[&str])] = &[
    ("geometry", &["\\geometry{"]),
    ("xcolor", &["\\color{", "\\definecolor{", "\\textcolor{"]),
    ("hyperref", &["\\href{", "\\url{"]),
    ("titlesec", &["\\titleformat{", "\\titlerule"]),
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StructureReport {
    /// Required elements that are absent. Non-empty means the source is rejected.
    pub missing: Vec<&'static str>,
    /// Problems worth logging that do not stop compilation.
    pub warnings: Vec<String>,
}

impl StructureReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }

    /// Human-readable findings, used as the log of a rejected document.
    pub fn findings(&self) -> String {
        let mut lines: Vec<String> = self
            .missing
            .iter()
            .map(|m| format!("missing required element: {m}"))
            .collect();
        lines.extend(self.warnings.iter().map(|w| format!("warning: {w}")));
        lines.join("\n")
    }
}

pub fn validate(source: &str) -> StructureReport {
    let mut report = StructureReport {
        missing: REQUIRED
            .iter()
            .filter(|(marker, _)| !source.contains(marker))
            .map(|(_, label)| *label)
            .collect(),
        warnings: Vec::new(),
    };

    if source.matches("\\begin{document}").count() > 1 {
        report
            .warnings
            .push("multiple \\begin{document} found".to_string());
    }

    if let (Some(class), Some(begin)) = (
        source.find("\\documentclass"),
        source.find("\\begin{document}"),
    ) {
        if class > begin {
            report
                .warnings
                .push("\\documentclass should appear before \\begin{document}".to_string());
        }
    }

    report.warnings.extend(unbalanced_environments(source));

    for (package, commands) in PACKAGE_USES {
        if commands.iter().any(|c| source.contains(c)) && !uses_package(source, package) {
            report
                .warnings
                .push(format!("{package} package needed for {}", commands[0]));
        }
    }
    if ITEMIZE_OPTIONS_RE.is_match(source) && !uses_package(source, "enumitem") {
        report
            .warnings
            .push("enumitem package needed for list options".to_string());
    }

    report
}

/// Environments whose `\begin` and `\end` counts differ, in first-seen order.
fn unbalanced_environments(source: &str) -> Vec<String> {
    let mut counts: Vec<(String, i64)> = Vec::new();
    let mut bump = |name: &str, delta: i64| match counts.iter_mut().find(|(n, _)| n == name) {
        Some((_, count)) => *count += delta,
        None => counts.push((name.to_string(), delta)),
    };

    for cap in BEGIN_RE.captures_iter(source) {
        bump(&cap[1], 1);
    }
    for cap in END_RE.captures_iter(source) {
        bump(&cap[1], -1);
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count != 0)
        .map(|(name, _)| format!("unmatched \\begin/\\end for environment '{name}'"))
        .collect()
}

/// Whether `\usepackage[...]{...}` loads `package`, alone or in a list.
fn uses_package(source: &str, package: &str) -> bool {
    static USEPACKAGE_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\\(?:usepackage|RequirePackage)(?:\[[^\]]*\])?\{([^}]*)\}").unwrap());

    USEPACKAGE_RE
        .captures_iter(source)
        .any(|cap| cap[1].split(',').any(|p| p.trim() == package))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "\\documentclass{article}\n\\usepackage[margin=1in]{geometry}\n\\begin{document}\nHi\n\\end{document}\n";

    #[test]
    fn test_valid_document() {
        let report = validate(VALID);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_fragment_is_missing_everything() {
        let report = validate("\\section{Experience} Engineer");
        assert!(!report.is_valid());
        assert_eq!(report.missing.len(), 3);
        assert!(report.findings().contains("\\documentclass"));
    }

    #[test]
    fn test_missing_end_document() {
        let report = validate("\\documentclass{article}\n\\begin{document}\nHi\n");
        assert_eq!(report.missing, vec!["document end (\\end{document})"]);
    }

    #[test]
    fn test_structural_warnings() {
        let source = "\\begin{document}\n\\documentclass{article}\n\\begin{itemize}\n\\item x\n\\end{document}";
        let report = validate(source);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.contains("before")));
        assert!(report.warnings.iter().any(|w| w.contains("'itemize'")));
        // document itself is balanced
        assert!(!report.warnings.iter().any(|w| w.contains("'document'")));
    }

    #[test]
    fn test_missing_package_warnings() {
        let source = "\\documentclass{article}\n\\begin{document}\n\\href{https://x.dev}{x} \\color{red}\n\\begin{itemize}[nosep]\n\\item a\n\\end{itemize}\n\\end{document}";
        let report = validate(source);
        assert!(report.warnings.iter().any(|w| w.starts_with("hyperref")));
        assert!(report.warnings.iter().any(|w| w.starts_with("xcolor")));
        assert!(report.warnings.iter().any(|w| w.starts_with("enumitem")));
    }

    #[test]
    fn test_package_lists_are_understood() {
        assert!(uses_package("\\usepackage{xcolor, hyperref}", "hyperref"));
        assert!(uses_package("\\usepackage[T1]{fontenc}", "fontenc"));
        assert!(!uses_package("\\usepackage{hyperrefx}", "hyperref"));
    }
}
