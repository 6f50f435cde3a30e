use super::file_classifier::{Classification, FileClassifier};
use crate::config::CollectorConfig;
use crate::error::{CollectError, Result};
use crate::types::{AcceptedFile, FolderOutcome, RejectReason, RejectedFile};
use log::{debug, info};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Recursive collection of every safe text file below a directory.
pub struct FolderWalker<'a> {
    config: &'a CollectorConfig,
    classifier: FileClassifier,
    skip: Vec<PathBuf>,
}

impl<'a> FolderWalker<'a> {
    pub fn new(config: &'a CollectorConfig) -> Self {
        Self {
            config,
            classifier: FileClassifier::from_config(config),
            skip: Vec::new(),
        }
    }

    /// Never list `path`, typically the dump being written inside the tree.
    pub fn skip_path(mut self, path: &Path) -> Self {
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.skip.push(path);
        self
    }

    pub fn walk(&self, root: &Path) -> Result<FolderOutcome> {
        let root = validate_root(root)?;
        let mut outcome = FolderOutcome {
            root: root.clone(),
            ..FolderOutcome::default()
        };

        // files of a directory first, then its subdirectories, each by name
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by(compare_entries)
            .into_iter()
            .filter_entry(|e| !self.is_pruned(e));

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(err) => {
                    debug!("cannot walk entry: {err}");
                    if let Some(path) = err.path() {
                        outcome.rejected.push(RejectedFile {
                            path: path.to_path_buf(),
                            reason: RejectReason::Unreadable,
                        });
                    }
                }
            }
        }

        files.retain(|p| !self.skip.iter().any(|s| s == p));

        let classified: Vec<_> = files
            .par_iter()
            .map(|path| self.classifier.inspect(path, false))
            .collect();

        for (path, inspection) in files.into_iter().zip(classified) {
            match inspection.classification {
                Classification::Accept(encoding) => {
                    let relative = path.strip_prefix(&root).map(Path::to_path_buf).unwrap_or_else(|_| path.clone());
                    let order = outcome.accepted.len();
                    outcome.accepted.push(AcceptedFile {
                        path,
                        relative,
                        size: inspection.size,
                        encoding,
                        order,
                    });
                }
                Classification::Reject(reason) => {
                    debug!("rejected {} ({reason})", path.display());
                    outcome.rejected.push(RejectedFile { path, reason });
                }
            }
        }

        info!(
            "folder walk of {}: {} accepted, {} rejected",
            root.display(),
            outcome.accepted.len(),
            outcome.rejected.len()
        );
        Ok(outcome)
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry.file_name().to_str().is_some_and(|name| self.config.is_excluded_dir(name))
    }
}

fn compare_entries(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn validate_root(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        return Err(CollectError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(CollectError::RootNotADirectory(root.to_path_buf()));
    }

    let canonical = std::fs::canonicalize(root).map_err(|source| CollectError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;
    std::fs::read_dir(&canonical).map_err(|source| CollectError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_files_before_subdirectories() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("a_dir")).unwrap();
        fs::write(base.join("a_dir/inner.txt"), "inner").unwrap();
        fs::write(base.join("z.txt"), "z").unwrap();
        fs::write(base.join("b.txt"), "b").unwrap();

        let config = CollectorConfig::default();
        let outcome = FolderWalker::new(&config).walk(base).unwrap();
        let relative: Vec<_> = outcome.accepted.iter().map(|f| f.relative.clone()).collect();

        assert_eq!(
            relative,
            vec![PathBuf::from("b.txt"), PathBuf::from("z.txt"), PathBuf::from("a_dir/inner.txt")]
        );
    }

    #[test]
    fn test_skip_path() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("keep.md"), "keep").unwrap();
        fs::write(temp.path().join("combined.txt"), "old dump").unwrap();

        let config = CollectorConfig::default();
        let outcome = FolderWalker::new(&config)
            .skip_path(&temp.path().join("combined.txt"))
            .walk(temp.path())
            .unwrap();

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].relative, PathBuf::from("keep.md"));
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        let config = CollectorConfig::default();
        assert!(matches!(
            FolderWalker::new(&config).walk(&file),
            Err(CollectError::RootNotADirectory(_))
        ));
    }
}
