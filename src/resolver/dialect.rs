use std::path::Path;

/// Extensions a quoted string may end in to count as a file reference.
pub const KNOWN_TEXT_EXTENSIONS: &[&str] = &[
    // Scripts
    "py", "pyw", "ps1", "psm1", "psd1", "bat", "cmd", "sh", "bash", "zsh", "ksh", "fish",
    "vb", "vbs", "bas", "cls", "frm", "atsb",
    // Web / markup
    "html", "htm", "css", "scss", "sass", "less", "xml", "xsl", "svg",
    // Data / configs
    "json", "jsonc", "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "properties",
    "csv", "tsv",
    // Code
    "js", "mjs", "cjs", "ts", "tsx", "jsx", "java", "kt", "kts",
    "c", "h", "cpp", "hpp", "cc", "hh", "cs", "go", "rs", "swift", "php", "r", "m", "mm",
    "sql", "lua", "pl", "pm", "rb", "tcl",
    // Docs
    "txt", "md", "rst", "adoc", "log",
    // Build/other
    "gradle", "groovy", "cmake", "make", "mak", "dockerfile", "tex",
];

/// Families of scripting languages that share reference syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptDialect {
    Generic,
    ShellFamily,
    PythonFamily,
    PowerShellFamily,
    BatchFamily,
    VBFamily,
}

impl ScriptDialect {
    /// Detect dialect from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "sh" | "bash" | "zsh" | "ksh" | "dash" | "fish" => Some(ScriptDialect::ShellFamily),
            "py" | "pyw" => Some(ScriptDialect::PythonFamily),
            "ps1" | "psm1" | "psd1" => Some(ScriptDialect::PowerShellFamily),
            "bat" | "cmd" => Some(ScriptDialect::BatchFamily),
            "vb" | "vbs" | "bas" | "cls" | "frm" | "atsb" => Some(ScriptDialect::VBFamily),
            _ => None,
        }
    }

    /// Detect dialect from a shebang line
    pub fn from_shebang(line: &str) -> Option<Self> {
        let line = line.trim();
        if !line.starts_with("#!") {
            return None;
        }

        if line.contains("pwsh") || line.contains("powershell") {
            Some(ScriptDialect::PowerShellFamily)
        } else if line.contains("python") {
            Some(ScriptDialect::PythonFamily)
        } else if line.ends_with("sh") || line.contains("sh ") || line.contains("bash") {
            Some(ScriptDialect::ShellFamily)
        } else {
            None
        }
    }

    /// Extension first, then the shebang of `content`, then Generic.
    pub fn detect(path: &Path, content: &str) -> Self {
        Self::from_extension(path)
            .or_else(|| content.lines().next().and_then(Self::from_shebang))
            .unwrap_or(ScriptDialect::Generic)
    }
}

pub fn has_known_extension(reference: &str) -> bool {
    Path::new(reference)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| {
            KNOWN_TEXT_EXTENSIONS.contains(&ext.as_str())
                || crate::config::ALWAYS_EXCLUDED_EXTENSIONS.contains(&ext.as_str())
        })
}
