//! LaTeX source to plain text.
//!
//! A small scanner, not a TeX engine: it understands enough of the markup
//! resumes are written in to recover the readable text in order.

const MARKERS: &[&str] = &[
    "\\documentclass",
    "\\begin{",
    "\\section",
    "\\subsection",
    "\\usepackage",
    "\\textbf{",
    "\\textit{",
    "\\emph{",
    "\\item",
    "\\href{",
];

const SECTIONING: &[&str] = &[
    "part",
    "chapter",
    "section",
    "subsection",
    "subsubsection",
    "paragraph",
    "subparagraph",
];

/// Preamble and layout macros, dropped together with all their arguments.
const DROPPED: &[&str] = &[
    "documentclass",
    "usepackage",
    "RequirePackage",
    "geometry",
    "newgeometry",
    "definecolor",
    "colorlet",
    "titleformat",
    "titlespacing",
    "setlength",
    "addtolength",
    "setcounter",
    "vspace",
    "hspace",
    "newcommand",
    "renewcommand",
    "providecommand",
    "newenvironment",
    "renewenvironment",
    "label",
    "ref",
    "pageref",
    "cite",
    "pagestyle",
    "thispagestyle",
    "color",
    "hypersetup",
    "setlist",
    "fontsize",
    "input",
    "include",
    "includegraphics",
    "bibliographystyle",
    "bibliography",
    "pagenumbering",
    "linespread",
    "titlerule",
    "hrule",
    "rule",
];

/// Environments whose first brace groups are column specs, not content.
const TABULAR: &[(&str, usize)] = &[
    ("tabular", 1),
    ("array", 1),
    ("longtable", 1),
    ("tabular*", 2),
    ("tabularx", 2),
];

/// Argument-less macros that stand for a character or word.
const SYMBOLS: &[(&str, &str)] = &[
    ("ldots", "..."),
    ("dots", "..."),
    ("textbullet", "•"),
    ("bullet", "•"),
    ("cdot", "·"),
    ("textbar", "|"),
    ("textless", "<"),
    ("textgreater", ">"),
    ("textbackslash", "\\"),
    ("textasciitilde", "~"),
    ("textasciicircum", "^"),
    ("textendash", "–"),
    ("textemdash", "—"),
    ("LaTeX", "LaTeX"),
    ("TeX", "TeX"),
    ("quad", " "),
    ("qquad", " "),
];

/// Whether `text` carries LaTeX markup worth stripping.
pub fn has_markup(text: &str) -> bool {
    MARKERS.iter().any(|marker| text.contains(marker))
}

/// Converts LaTeX source to plain text. Plain text comes back unchanged
/// apart from whitespace tidying.
pub fn strip(source: &str) -> String {
    let without_comments = strip_comments(source);
    let body = document_body(&without_comments);

    let mut scanner = Scanner::new(body);
    scanner.run();

    scanner
        .out
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

/// Removes `%` comments. A `%` preceded by an odd number of backslashes is literal.
/// Lines that held nothing but a comment disappear entirely.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        let cut = comment_start(line);
        match cut {
            Some(idx) if line[..idx].trim().is_empty() => continue,
            Some(idx) => out.push_str(&line[..idx]),
            None => out.push_str(line),
        }
        out.push('\n');
    }
    out
}

fn comment_start(line: &str) -> Option<usize> {
    let mut backslashes = 0usize;
    for (idx, c) in line.char_indices() {
        match c {
            '\\' => backslashes += 1,
            '%' if backslashes % 2 == 0 => return Some(idx),
            _ => backslashes = 0,
        }
    }
    None
}

/// The part between `\begin{document}` and `\end{document}`, or all of it.
fn document_body(source: &str) -> &str {
    const BEGIN: &str = "\\begin{document}";
    const END: &str = "\\end{document}";

    match source.find(BEGIN) {
        Some(start) => {
            let body = &source[start + BEGIN.len()..];
            match body.find(END) {
                Some(end) => &body[..end],
                None => body,
            }
        }
        None => source,
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    out: String,
    /// The last line break was generated by markup, so the next source newline is redundant.
    soft_break: bool,
}

impl Scanner {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            out: String::new(),
            soft_break: false,
        }
    }

    fn run(&mut self) {
        while let Some(c) = self.next() {
            match c {
                '\\' => self.command(),
                '{' | '}' | '$' => {}
                '~' => self.push(" "),
                '&' => self.push(" | "),
                '\n' => {
                    if self.soft_break {
                        self.soft_break = false;
                    } else {
                        self.out.push('\n');
                    }
                }
                ' ' | '\t' => self.out.push(' '),
                other => {
                    self.out.push(other);
                    self.soft_break = false;
                }
            }
        }
    }

    fn command(&mut self) {
        let Some(c) = self.peek() else {
            return;
        };

        if !c.is_ascii_alphabetic() {
            self.pos += 1;
            match c {
                '\\' => {
                    self.skip_optional();
                    self.line_break();
                }
                '%' | '&' | '$' | '#' | '_' | '{' | '}' => self.push(&c.to_string()),
                ' ' => self.push(" "),
                _ => {}
            }
            return;
        }

        let name = self.read_name();
        let name = name.as_str();

        if SECTIONING.contains(&name.trim_end_matches('*')) {
            self.skip_optional();
            let title = self.read_group().unwrap_or_default();
            self.line_break();
            self.push(&strip_fragment(&title));
            self.line_break();
            return;
        }

        match name {
            "item" => {
                self.skip_optional();
                self.line_break();
                self.push("• ");
                self.skip_spaces();
            }
            "begin" => {
                let env = self.read_group().unwrap_or_default();
                self.skip_optional();
                if let Some((_, specs)) = TABULAR.iter().find(|(e, _)| *e == env) {
                    for _ in 0..*specs {
                        self.read_group();
                    }
                }
                self.line_break();
            }
            "end" => {
                self.read_group();
                self.line_break();
            }
            "par" | "newline" | "linebreak" => self.line_break(),
            "href" => {
                self.read_group();
                if let Some(text) = self.read_group() {
                    self.push(&strip_fragment(&text));
                }
            }
            "url" => {
                if let Some(url) = self.read_group() {
                    self.push(&url);
                }
            }
            _ if DROPPED.contains(&name.trim_end_matches('*')) => {
                self.skip_all_args();
            }
            _ => {
                if let Some((_, text)) = SYMBOLS.iter().find(|(n, _)| *n == name) {
                    self.push(text);
                    return;
                }
                // Formatting macro: keep whatever its arguments contain.
                self.skip_optional();
                let mut first = true;
                while let Some(arg) = self.read_group() {
                    if !first {
                        self.push(" ");
                    }
                    self.push(&strip_fragment(&arg));
                    first = false;
                }
            }
        }
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
        if text.chars().any(|c| !c.is_whitespace()) {
            self.soft_break = false;
        }
    }

    fn line_break(&mut self) {
        let kept = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(kept);
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.soft_break = true;
    }

    fn next(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_alphabetic) {
            name.push(c);
            self.pos += 1;
        }
        if self.peek() == Some('*') {
            name.push('*');
            self.pos += 1;
        }
        name
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.pos += 1;
        }
    }

    /// Skips spaces, then a `[...]` argument if one follows.
    fn skip_optional(&mut self) {
        let save = self.pos;
        self.skip_spaces();
        if self.peek() == Some('[') {
            self.read_delimited('[', ']');
        } else {
            self.pos = save;
        }
    }

    /// Reads a `{...}` argument, allowing leading spaces. Braces inside are kept.
    fn read_group(&mut self) -> Option<String> {
        let save = self.pos;
        self.skip_spaces();
        if self.peek() == Some('{') {
            Some(self.read_delimited('{', '}'))
        } else {
            self.pos = save;
            None
        }
    }

    fn skip_all_args(&mut self) {
        loop {
            let save = self.pos;
            self.skip_spaces();
            match self.peek() {
                Some('[') => {
                    self.read_delimited('[', ']');
                }
                Some('{') => {
                    self.read_delimited('{', '}');
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }
    }

    /// Reads from an opening delimiter to its balanced closing one.
    /// Escaped delimiters do not count towards nesting.
    fn read_delimited(&mut self, open: char, close: char) -> String {
        self.pos += 1;
        let mut depth = 1usize;
        let mut content = String::new();
        while let Some(c) = self.next() {
            if c == '\\' {
                content.push(c);
                if let Some(escaped) = self.next() {
                    content.push(escaped);
                }
                continue;
            }
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            content.push(c);
        }
        content
    }
}

/// Strips a macro argument, keeping it on one line.
fn strip_fragment(fragment: &str) -> String {
    let mut scanner = Scanner::new(fragment);
    scanner.run();
    scanner.out.split_whitespace().collect::<Vec<_>>().join(" ")
}
