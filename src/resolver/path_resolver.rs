use super::reference_extractor::ReferenceKind;
use crate::config::CollectorConfig;
use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

static VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)|%([A-Za-z_][A-Za-z0-9_]*)%").unwrap()
});

/// Turns raw reference strings into existing files.
pub struct PathResolver {
    extra_roots: Vec<PathBuf>,
    wildcard_cap: usize,
    bare_search_cap: usize,
    bare_search_depth: usize,
    /// Directory names the bare-name search never descends into
    excluded_dirs: Vec<String>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::from_config(&CollectorConfig::default())
    }
}

impl PathResolver {
    pub fn from_config(config: &CollectorConfig) -> Self {
        Self {
            extra_roots: config.extra_roots.clone(),
            wildcard_cap: config.wildcard_cap,
            bare_search_cap: config.bare_search_cap,
            bare_search_depth: config.bare_search_depth,
            excluded_dirs: config.excluded_dirs(),
        }
    }

    /// Resolve `raw` as written in a file living in `referencing_dir`.
    ///
    /// Returns canonical paths of existing regular files, at most one per
    /// path and never more than the relevant cap. An empty result means the
    /// reference is unresolved.
    pub fn resolve(&self, raw: &str, kind: ReferenceKind, referencing_dir: &Path) -> Vec<PathBuf> {
        let expanded = expand_reference(raw, referencing_dir);
        let resolved = match kind {
            ReferenceKind::Path => self.resolve_path(&expanded, referencing_dir),
            ReferenceKind::Module => self.resolve_module(&expanded, referencing_dir),
        };
        dedup_preserving_order(resolved)
    }

    fn resolve_path(&self, reference: &str, dir: &Path) -> Vec<PathBuf> {
        let path = Path::new(reference);

        if path.is_absolute() {
            if let Some(found) = existing_file(path) {
                return vec![found];
            }
        } else if let Some(found) = existing_file(&dir.join(path)) {
            return vec![found];
        }

        if reference.contains(['*', '?', '[']) {
            let matches = self.expand_wildcard(reference, dir);
            if !matches.is_empty() {
                return matches;
            }
        }

        if !reference.contains('/') && !path.is_absolute() {
            return self.search_bare_name(reference, false, dir);
        }

        Vec::new()
    }

    fn resolve_module(&self, module: &str, dir: &Path) -> Vec<PathBuf> {
        let relative = module_to_relative_path(module);

        if relative.contains('/') {
            let candidate = dir.join(&relative);
            let (Some(parent), Some(stem)) = (candidate.parent(), candidate.file_name().and_then(|n| n.to_str())) else {
                return Vec::new();
            };
            return self.stem_matches(parent, stem);
        }

        let direct = self.stem_matches(dir, &relative);
        if !direct.is_empty() {
            return direct;
        }
        self.search_bare_name(&relative, true, dir)
    }

    /// Wildcards only ever expand inside the referencing directory. Absolute
    /// patterns and patterns with `..` or `**` are not expanded at all, so the
    /// walk is bounded by the number of pattern components.
    fn expand_wildcard(&self, reference: &str, dir: &Path) -> Vec<PathBuf> {
        let reference = reference.trim_start_matches("./");
        if Path::new(reference).is_absolute()
            || reference.contains("**")
            || reference.split('/').any(|part| part == "..")
        {
            debug!("refusing to expand wildcard {reference} outside {}", dir.display());
            return Vec::new();
        }

        let Ok(dir) = std::fs::canonicalize(dir) else {
            return Vec::new();
        };
        let pattern = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), reference);

        let Ok(paths) = glob::glob(&pattern) else {
            debug!("invalid wildcard reference {reference}");
            return Vec::new();
        };

        paths
            .filter_map(|entry| entry.ok())
            .filter_map(|path| existing_file(&path))
            .filter(|path| path.parent().is_some_and(|parent| parent.starts_with(&dir)))
            .take(self.wildcard_cap)
            .collect()
    }

    /// Breadth-limited search for `name` below the referencing directory and
    /// any configured extra roots. With `by_stem`, `name` is compared to file
    /// stems; otherwise a stem match is only used when `name` has no extension.
    fn search_bare_name(&self, name: &str, by_stem: bool, dir: &Path) -> Vec<PathBuf> {
        let by_stem = by_stem || Path::new(name).extension().is_none();
        let mut found = Vec::new();

        let roots = std::iter::once(dir).chain(self.extra_roots.iter().map(PathBuf::as_path));
        for root in roots {
            let walker = WalkDir::new(root)
                .max_depth(self.bare_search_depth)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0
                        || !e.file_type().is_dir()
                        || !self.is_excluded_dir(&e.file_name().to_string_lossy())
                });

            for entry in walker.filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let name_matches = path.file_name().is_some_and(|n| n == name)
                    || (by_stem && path.file_stem().is_some_and(|s| s == name));
                if !name_matches {
                    continue;
                }
                if let Some(file) = existing_file(path) {
                    found.push(file);
                    if found.len() >= self.bare_search_cap {
                        return found;
                    }
                }
            }
        }

        found
    }

    fn is_excluded_dir(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|d| d == name)
    }

    /// Files in `dir` whose stem is `stem`, plus `stem/__init__.py` for packages.
    fn stem_matches(&self, dir: &Path, stem: &str) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.file_stem().is_some_and(|s| s == stem))
            .collect();
        files.sort();

        let package_init = dir.join(stem).join("__init__.py");
        if package_init.is_file() {
            files.push(package_init);
        }

        files
            .iter()
            .filter_map(|p| existing_file(p))
            .take(self.bare_search_cap)
            .collect()
    }
}

/// Expand `~`, environment variables and script-relative markers, and
/// normalise separators to `/`.
pub fn expand_reference(raw: &str, referencing_dir: &Path) -> String {
    let dir = referencing_dir.to_string_lossy();
    let script_dir_markers = ["$PSScriptRoot", "${PSScriptRoot}", "%~dp0"];

    let mut text = raw.trim().to_string();
    for marker in script_dir_markers {
        if text.contains(marker) {
            let replacement = if marker == "%~dp0" { format!("{dir}/") } else { dir.to_string() };
            text = text.replace(marker, &replacement);
        }
    }

    let text = VARIABLE_REGEX.replace_all(&text, |caps: &Captures| {
        let name = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
    });

    let mut text = text.replace('\\', "/");
    if text == "~" || text.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            text = format!("{}{}", home.to_string_lossy(), &text[1..]);
        }
    }

    while text.contains("//") && !text.starts_with("//") {
        text = text.replace("//", "/");
    }
    text
}

/// `pkg.mod` -> `pkg/mod`, `.mod` -> `mod`, `..pkg.mod` -> `../pkg/mod`.
fn module_to_relative_path(module: &str) -> String {
    let dots = module.chars().take_while(|&c| c == '.').count();
    let rest = module[dots..].replace('.', "/");

    let mut path = "../".repeat(dots.saturating_sub(1));
    path.push_str(&rest);
    path
}

fn existing_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        std::fs::canonicalize(path).ok()
    } else {
        None
    }
}

fn dedup_preserving_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn canonical(path: &Path) -> PathBuf {
        fs::canonicalize(path).unwrap()
    }

    #[test]
    fn test_relative_and_absolute() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("lib")).unwrap();
        fs::write(base.join("lib/common.sh"), "echo").unwrap();

        let resolver = PathResolver::default();
        let expected = vec![canonical(&base.join("lib/common.sh"))];

        assert_eq!(resolver.resolve("lib/common.sh", ReferenceKind::Path, base), expected);
        assert_eq!(resolver.resolve("./lib/common.sh", ReferenceKind::Path, base), expected);
        assert_eq!(resolver.resolve("lib\\common.sh", ReferenceKind::Path, base), expected);

        let absolute = base.join("lib/common.sh").display().to_string();
        assert_eq!(resolver.resolve(&absolute, ReferenceKind::Path, Path::new("/")), expected);

        assert!(resolver.resolve("lib/missing.sh", ReferenceKind::Path, base).is_empty());
    }

    #[test]
    fn test_wildcard_is_capped() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path();
        for i in 0..5 {
            fs::write(base.join(format!("part{i}.sh")), "echo").unwrap();
        }

        let config = CollectorConfig {
            wildcard_cap: 3,
            ..CollectorConfig::default()
        };
        let resolver = PathResolver::from_config(&config);
        let found = resolver.resolve("part*.sh", ReferenceKind::Path, base);

        assert_eq!(found.len(), 3);
        assert_eq!(found[0], canonical(&base.join("part0.sh")));
    }

    #[test]
    fn test_bare_name_search_below_dir_and_extra_roots() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path().join("project");
        let shared = temp.path().join("shared");
        fs::create_dir_all(base.join("scripts/deep")).unwrap();
        fs::create_dir_all(base.join(".git")).unwrap();
        fs::create_dir_all(&shared).unwrap();
        fs::write(base.join("scripts/deep/helper.ps1"), "x").unwrap();
        fs::write(base.join(".git/helper.ps1"), "x").unwrap();
        fs::write(shared.join("Tools.psm1"), "x").unwrap();

        let resolver = PathResolver::from_config(&CollectorConfig::default().with_extra_root(&shared));

        assert_eq!(
            resolver.resolve("helper.ps1", ReferenceKind::Path, &base),
            vec![canonical(&base.join("scripts/deep/helper.ps1"))]
        );
        assert_eq!(
            resolver.resolve("Tools", ReferenceKind::Path, &base),
            vec![canonical(&shared.join("Tools.psm1"))]
        );
    }

    #[test]
    fn test_wildcard_stays_inside_referencing_dir() {
        let temp = tempfile::tempdir().unwrap();
        let proj = temp.path().join("proj");
        let elsewhere = temp.path().join("elsewhere");
        fs::create_dir_all(proj.join("a/b/c")).unwrap();
        fs::create_dir_all(proj.join("lib")).unwrap();
        fs::create_dir_all(&elsewhere).unwrap();
        fs::write(proj.join("a/b/c/deep.sh"), "echo").unwrap();
        fs::write(proj.join("lib/one.sh"), "echo").unwrap();
        fs::write(elsewhere.join("secret.conf"), "key=1").unwrap();

        let resolver = PathResolver::default();
        let absolute = format!("{}/*/secret.conf", temp.path().display());

        assert!(resolver.resolve("**/deep.sh", ReferenceKind::Path, &proj).is_empty());
        assert!(resolver.resolve("../*/secret.conf", ReferenceKind::Path, &proj).is_empty());
        assert!(resolver.resolve("lib/../../*/secret.conf", ReferenceKind::Path, &proj).is_empty());
        assert!(resolver.resolve(&absolute, ReferenceKind::Path, &proj).is_empty());
        assert!(resolver.resolve("/**/secret.conf", ReferenceKind::Path, &proj).is_empty());

        assert_eq!(
            resolver.resolve("lib/*.sh", ReferenceKind::Path, &proj),
            vec![canonical(&proj.join("lib/one.sh"))]
        );
    }

    #[test]
    fn test_bare_name_search_is_capped() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path();
        for i in 0..5 {
            let sub = base.join(format!("copy{i}"));
            fs::create_dir_all(&sub).unwrap();
            fs::write(sub.join("common.sh"), "echo").unwrap();
        }

        let config = CollectorConfig {
            bare_search_cap: 2,
            ..CollectorConfig::default()
        };
        let found = PathResolver::from_config(&config).resolve("common.sh", ReferenceKind::Path, base);

        assert_eq!(
            found,
            vec![canonical(&base.join("copy0/common.sh")), canonical(&base.join("copy1/common.sh"))]
        );
    }

    #[test]
    fn test_bare_name_search_depth() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("one/two/three")).unwrap();
        fs::write(base.join("one/two/three/tool.sh"), "echo").unwrap();

        let shallow = CollectorConfig {
            bare_search_depth: 3,
            ..CollectorConfig::default()
        };
        assert!(PathResolver::from_config(&shallow)
            .resolve("tool.sh", ReferenceKind::Path, base)
            .is_empty());

        let deep = CollectorConfig {
            bare_search_depth: 4,
            ..CollectorConfig::default()
        };
        assert_eq!(
            PathResolver::from_config(&deep).resolve("tool.sh", ReferenceKind::Path, base),
            vec![canonical(&base.join("one/two/three/tool.sh"))]
        );
    }

    #[test]
    fn test_bare_name_search_skips_extra_excluded_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("vendor")).unwrap();
        fs::write(base.join("vendor/setup.cmd"), "@echo off").unwrap();

        assert_eq!(PathResolver::default().resolve("setup.cmd", ReferenceKind::Path, base).len(), 1);

        let config = CollectorConfig {
            extra_exclude_dirs: vec!["vendor".to_string()],
            ..CollectorConfig::default()
        };
        assert!(PathResolver::from_config(&config)
            .resolve("setup.cmd", ReferenceKind::Path, base)
            .is_empty());
    }

    #[test]
    fn test_python_modules() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("app/pkg")).unwrap();
        fs::write(base.join("app/utils.py"), "").unwrap();
        fs::write(base.join("app/pkg/__init__.py"), "").unwrap();
        fs::write(base.join("app/pkg/mod.py"), "").unwrap();
        fs::write(base.join("app/top.py"), "").unwrap();

        let resolver = PathResolver::default();
        let app = base.join("app");

        assert_eq!(
            resolver.resolve("utils", ReferenceKind::Module, &app),
            vec![canonical(&app.join("utils.py"))]
        );
        assert_eq!(
            resolver.resolve("pkg.mod", ReferenceKind::Module, &app),
            vec![canonical(&app.join("pkg/mod.py"))]
        );
        assert_eq!(
            resolver.resolve("pkg", ReferenceKind::Module, &app),
            vec![canonical(&app.join("pkg/__init__.py"))]
        );
        assert_eq!(
            resolver.resolve("..top", ReferenceKind::Module, &app.join("pkg")),
            vec![canonical(&app.join("top.py"))]
        );
        assert!(resolver.resolve("os.path", ReferenceKind::Module, &app).is_empty());
    }

    #[test]
    fn test_expand_reference() {
        std::env::set_var("CODE2TXT_TEST_LIB", "/opt/lib");
        let dir = Path::new("/work/scripts");

        assert_eq!(expand_reference("$CODE2TXT_TEST_LIB/a.sh", dir), "/opt/lib/a.sh");
        assert_eq!(expand_reference("${CODE2TXT_TEST_LIB}/b.sh", dir), "/opt/lib/b.sh");
        assert_eq!(expand_reference("%CODE2TXT_TEST_LIB%\\c.bat", dir), "/opt/lib/c.bat");
        assert_eq!(expand_reference("$PSScriptRoot\\run.ps1", dir), "/work/scripts/run.ps1");
        assert_eq!(expand_reference("%~dp0build.cmd", dir), "/work/scripts/build.cmd");
        assert_eq!(expand_reference("$CODE2TXT_UNSET_VAR/x", dir), "$CODE2TXT_UNSET_VAR/x");
    }

    #[test]
    fn test_module_to_relative_path() {
        assert_eq!(module_to_relative_path("pkg.mod"), "pkg/mod");
        assert_eq!(module_to_relative_path(".mod"), "mod");
        assert_eq!(module_to_relative_path("..pkg.mod"), "../pkg/mod");
    }
}
