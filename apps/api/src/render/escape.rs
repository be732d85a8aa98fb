/// Escapes user-supplied text for safe substitution into LaTeX source.
///
/// Covers the ten TeX specials plus `<`, `>`, `|` (mis-rendered under OT1) and
/// `•`. Control characters other than newline are dropped; tabs become spaces.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '{' | '}' | '%' | '$' | '&' | '#' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str(r"\textasciicircum{}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '<' => out.push_str(r"\textless{}"),
            '>' => out.push_str(r"\textgreater{}"),
            '|' => out.push_str(r"\textbar{}"),
            '•' => out.push_str(r"\textbullet{}"),
            '\t' => out.push(' '),
            '\n' => out.push('\n'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Escapes text bound for a single-line argument such as `\section{...}`.
/// Every whitespace run, newlines included, becomes one space.
pub fn escape_inline(text: &str) -> String {
    escape_latex(&text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Prefixes `{}` when escaped text starts with `[`, so the preceding `\item`
/// or `\\` does not read it as an optional argument.
pub fn guard_leading_bracket(escaped: &str) -> String {
    if escaped.starts_with('[') {
        format!("{{}}{escaped}")
    } else {
        escaped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_ampersand_dollar() {
        assert_eq!(escape_latex("50% match & $100"), r"50\% match \& \$100");
    }

    #[test]
    fn test_full_special_set() {
        assert_eq!(
            escape_latex(r"\ { } % $ & # _ ^ ~ < > |"),
            r"\textbackslash{} \{ \} \% \$ \& \# \_ \textasciicircum{} \textasciitilde{} \textless{} \textgreater{} \textbar{}"
        );
    }

    #[test]
    fn test_backslash_is_not_double_escaped() {
        // The braces emitted for \textbackslash must not be escaped again.
        assert_eq!(escape_latex(r"C:\dir"), r"C:\textbackslash{}dir");
    }

    #[test]
    fn test_injection_attempt_is_neutralised() {
        let escaped = escape_latex(r"\input{/etc/passwd}\immediate\write18{rm -rf ~}");
        assert!(!escaped.contains(r"\input{"));
        assert!(!escaped.contains(r"\write18{"));
        assert!(escaped.starts_with(r"\textbackslash{}input\{"));
    }

    #[test]
    fn test_control_characters_dropped() {
        assert_eq!(escape_latex("a\u{0007}b\tc\r\nd"), "ab c\nd");
    }

    #[test]
    fn test_plain_and_unicode_text_unchanged() {
        assert_eq!(escape_latex("José Müller, Engineer"), "José Müller, Engineer");
    }

    #[test]
    fn test_inline_collapses_paragraph_breaks() {
        assert_eq!(escape_inline("  Jane\n\nDoe\t& Co \r\n"), r"Jane Doe \& Co");
    }

    #[test]
    fn test_leading_bracket_is_guarded() {
        assert_eq!(guard_leading_bracket("[WIP] beetune"), "{}[WIP] beetune");
        assert_eq!(guard_leading_bracket("beetune [WIP]"), "beetune [WIP]");
    }
}
