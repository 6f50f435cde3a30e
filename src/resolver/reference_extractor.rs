use super::dialect::{has_known_extension, ScriptDialect};
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// A file path, as written
    Path,
    /// A dotted module identifier (`pkg.module`, `..sibling`)
    Module,
}

/// A candidate reference exactly as it appears in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
    pub text: &'a str,
    pub kind: ReferenceKind,
}

struct Rule {
    regex: Regex,
    kind: ReferenceKind,
    /// Group 1 holds comma-separated identifiers (`import a, b as c`)
    list: bool,
    /// Only keep captures that look like file paths
    path_like: bool,
}

impl Rule {
    fn directive(pattern: &str) -> Self {
        Self {
            regex: Regex::new(pattern).unwrap(),
            kind: ReferenceKind::Path,
            list: false,
            path_like: false,
        }
    }

    fn quoted(pattern: &str) -> Self {
        Self {
            path_like: true,
            ..Self::directive(pattern)
        }
    }

    fn module_list(pattern: &str) -> Self {
        Self {
            kind: ReferenceKind::Module,
            list: true,
            ..Self::directive(pattern)
        }
    }
}

fn generic_rules() -> Vec<Rule> {
    vec![
        Rule::quoted(r#""([^"\r\n]{1,260})""#),
        Rule::quoted(r"'([^'\r\n]{1,260})'"),
        Rule::directive(
            r#"(?i)(?:#\s*include|\binclude|\brequire_once|\brequire|\bloadfile|\bdofile|\bexecfile)\s*\(?\s*["'<]?([^"'<>()\[\]\s;,=]+)["'>]?(?:\s|$|[;,)])"#,
        ),
    ]
}

fn with_generic(mut rules: Vec<Rule>) -> Vec<Rule> {
    rules.extend(generic_rules());
    rules
}

static GENERIC_RULES: Lazy<Vec<Rule>> = Lazy::new(generic_rules);

static SHELL_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    with_generic(vec![
        Rule::directive(r#"(?:^|[;&|(]|\s)(?:source|\.)\s+["']?([^"'\s;&|)]+)"#),
        Rule::directive(r#"\b(?:bash|sh|zsh|ksh|dash)\s+["']?([^"'\s;&|)]+\.(?:sh|bash|zsh|ksh))\b"#),
    ])
});

static PYTHON_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    with_generic(vec![
        Rule::module_list(r"^\s*from\s+(\.*[\w.]*)\s+import\b"),
        Rule::module_list(r"^\s*import\s+([\w.]+(?:\s+as\s+\w+)?(?:\s*,\s*[\w.]+(?:\s+as\s+\w+)?)*)"),
    ])
});

static POWERSHELL_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    with_generic(vec![
        // dot-sourcing: . .\lib.ps1
        Rule::directive(r#"^\s*\.\s+["']?([^"'\s]+)"#),
        Rule::directive(r#"(?i)\b(?:Import-Module|ipmo)\s+(?:-Name\s+)?["']?([^"'\s;]+)"#),
        Rule::directive(r#"&\s*["']?([^"'\s]+\.ps1)\b"#),
    ])
});

static BATCH_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    with_generic(vec![
        Rule::directive(r#"(?i)\bcall\s+"?([^:"\s&|][^"\s&|]*)"#),
        Rule::directive(r#"(?i)\bstart\s+(?:"[^"]*"\s+)?"?([^"\s&|]+\.(?:bat|cmd|ps1|vbs))"#),
    ])
});

static VB_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    with_generic(vec![
        Rule::directive(r#"(?i)<!--\s*#include\s+(?:file|virtual)\s*=\s*"([^"]+)""#),
        Rule::module_list(r"(?i)^\s*Imports\s+([\w.]+)"),
    ])
});

impl ScriptDialect {
    fn rules(&self) -> &'static [Rule] {
        match self {
            ScriptDialect::Generic => GENERIC_RULES.as_slice(),
            ScriptDialect::ShellFamily => SHELL_RULES.as_slice(),
            ScriptDialect::PythonFamily => PYTHON_RULES.as_slice(),
            ScriptDialect::PowerShellFamily => POWERSHELL_RULES.as_slice(),
            ScriptDialect::BatchFamily => BATCH_RULES.as_slice(),
            ScriptDialect::VBFamily => VB_RULES.as_slice(),
        }
    }
}

/// Lazily scans `content` line by line. Within a line, references come out
/// in the order they start; duplicates are kept.
pub struct References<'a> {
    lines: std::str::Lines<'a>,
    rules: &'static [Rule],
    pending: std::vec::IntoIter<Reference<'a>>,
}

impl<'a> Iterator for References<'a> {
    type Item = Reference<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(reference) = self.pending.next() {
                return Some(reference);
            }
            let line = self.lines.next()?;
            self.pending = scan_line(line, self.rules).into_iter();
        }
    }
}

pub fn extract_references(content: &str, dialect: ScriptDialect) -> References<'_> {
    References {
        lines: content.lines(),
        rules: dialect.rules(),
        pending: Vec::new().into_iter(),
    }
}

fn scan_line<'a>(line: &'a str, rules: &[Rule]) -> Vec<Reference<'a>> {
    let mut found: Vec<(usize, Reference<'a>)> = Vec::new();

    for rule in rules {
        for caps in rule.regex.captures_iter(line) {
            let Some(m) = caps.get(1) else {
                continue;
            };

            if rule.list {
                let mut offset = m.start();
                for item in m.as_str().split(',') {
                    let name = item.split_whitespace().next().unwrap_or("");
                    if !name.is_empty() && name != "." {
                        found.push((offset, Reference { text: name, kind: rule.kind }));
                    }
                    offset += item.len() + 1;
                }
                continue;
            }

            let text = m.as_str().trim();
            if text.is_empty() || (rule.path_like && !looks_like_path(text)) {
                continue;
            }
            found.push((m.start(), Reference { text, kind: rule.kind }));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, reference)| reference).collect()
}

/// Quoted strings count when they carry a separator or a known extension.
fn looks_like_path(text: &str) -> bool {
    if text.contains("://") || text.contains(['<', '>', '|', '\t']) || text.starts_with('-') {
        return false;
    }
    if text.chars().all(|c| c == '.' || c == '/' || c == '\\') {
        return false;
    }
    text.contains('/') || text.contains('\\') || has_known_extension(text)
}
