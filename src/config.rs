use crate::error::{CollectError, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions that are never collected, whatever their content looks like.
pub const ALWAYS_EXCLUDED_EXTENSIONS: &[&str] = &[
    "hex", "bin",          // generic binaries / Intel HEX
    "s19", "s28", "s37",   // Motorola S-Record variants
    "srec", "mot",
    "xbin",
    "ihx", "ihex",         // Intel HEX variants
];

/// Directory names pruned by folder mode before descent.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    ".git", ".hg", ".svn", ".idea", ".vs",
    "__pycache__", ".mypy_cache", ".pytest_cache",
    "node_modules", "dist", "build", "out", "target",
    "bin", "obj",
    "venv", ".venv",
];

/// Tunables for a single collection run.
///
/// A value of this type is handed to every walker explicitly; nothing reads
/// limits from global state, so concurrent runs never interfere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Node budget: total files classified in one main-file walk.
    pub max_referenced_files: usize,
    /// Files at this depth are collected but their references are not followed.
    pub max_depth: usize,
    /// Maximum paths a single wildcard reference may expand to.
    pub wildcard_cap: usize,
    /// Maximum matches returned by the bare-filename search.
    pub bare_search_cap: usize,
    /// Directory levels the bare-filename search descends below each root.
    pub bare_search_depth: usize,
    /// Bytes read from the head of a file for classification.
    pub sample_size: usize,
    /// Fraction of control bytes above which a sample counts as binary.
    pub binary_ratio_threshold: f64,
    /// Non-blank lines inspected by the firmware signature test.
    pub firmware_sample_lines: usize,
    /// Minimum sampled lines before the firmware test can fire.
    pub firmware_min_lines: usize,
    /// Fraction of sampled lines that must be valid records.
    pub firmware_match_ratio: f64,
    /// Files larger than this are rejected as limit-exceeded.
    pub max_file_bytes: Option<u64>,
    /// Additional directories searched for bare file names.
    pub extra_roots: Vec<PathBuf>,
    /// Directory names pruned in addition to [`DEFAULT_EXCLUDED_DIRS`].
    pub extra_exclude_dirs: Vec<String>,
    /// Reject resolved files outside the main file's directory and `extra_roots`.
    pub confine_to_roots: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_referenced_files: 2000,
            max_depth: 10,
            wildcard_cap: 100,
            bare_search_cap: 100,
            bare_search_depth: 4,
            sample_size: 64 * 1024,
            binary_ratio_threshold: 0.30,
            firmware_sample_lines: 200,
            firmware_min_lines: 5,
            firmware_match_ratio: 0.6,
            max_file_bytes: None,
            extra_roots: Vec::new(),
            extra_exclude_dirs: Vec::new(),
            confine_to_roots: false,
        }
    }
}

impl CollectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CollectError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content).map_err(|source| CollectError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Self = toml::from_str(content)?;
        Ok(config.validate())
    }

    /// Replace values no walker can work with by their defaults.
    pub fn validate(mut self) -> Self {
        let defaults = Self::default();

        if self.sample_size == 0 {
            warn!("sample_size must be positive, using {}", defaults.sample_size);
            self.sample_size = defaults.sample_size;
        }
        if !(self.binary_ratio_threshold > 0.0 && self.binary_ratio_threshold <= 1.0) {
            warn!(
                "binary_ratio_threshold {} outside (0, 1], using {}",
                self.binary_ratio_threshold, defaults.binary_ratio_threshold
            );
            self.binary_ratio_threshold = defaults.binary_ratio_threshold;
        }
        if !(self.firmware_match_ratio > 0.0 && self.firmware_match_ratio <= 1.0) {
            warn!(
                "firmware_match_ratio {} outside (0, 1], using {}",
                self.firmware_match_ratio, defaults.firmware_match_ratio
            );
            self.firmware_match_ratio = defaults.firmware_match_ratio;
        }
        if self.firmware_sample_lines == 0 {
            self.firmware_sample_lines = defaults.firmware_sample_lines;
        }

        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_files(mut self, max: usize) -> Self {
        self.max_referenced_files = max;
        self
    }

    pub fn with_extra_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.extra_roots.push(root.into());
        self
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        DEFAULT_EXCLUDED_DIRS.contains(&name)
            || self.extra_exclude_dirs.iter().any(|d| d == name)
    }

    /// All pruned directory names, sorted, for the dump header.
    pub fn excluded_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = DEFAULT_EXCLUDED_DIRS
            .iter()
            .map(|d| d.to_string())
            .chain(self.extra_exclude_dirs.iter().cloned())
            .collect();
        dirs.sort();
        dirs.dedup();
        dirs
    }
}
