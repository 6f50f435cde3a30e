use super::dialect::ScriptDialect;
use super::encoding::TextEncoding;
use super::file_classifier::{Classification, FileClassifier, Inspection};
use super::path_resolver::PathResolver;
use super::reference_extractor::extract_references;
use crate::config::CollectorConfig;
use crate::error::{CollectError, Result};
use crate::types::{
    AcceptedFile, FileCandidate, MainFileOutcome, RejectReason, RejectedFile, UnresolvedReference,
};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation shared between a walker and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owned by exactly one walk.
#[derive(Default)]
struct TraversalState {
    /// Canonical paths that were ever enqueued
    visited: HashSet<PathBuf>,
    queue: VecDeque<FileCandidate>,
    processed: usize,
    accepted: Vec<(PathBuf, u64, TextEncoding)>,
    rejected: Vec<RejectedFile>,
    unresolved: Vec<UnresolvedReference>,
    limits_hit: bool,
    cancelled: bool,
}

impl TraversalState {
    /// Returns false when the path was already seen.
    fn enqueue(&mut self, candidate: FileCandidate) -> bool {
        let Some(path) = candidate.resolved.clone() else {
            return false;
        };
        if !self.visited.insert(path) {
            return false;
        }
        self.queue.push_back(candidate);
        true
    }

    /// Pop every queued candidate at the depth of the queue head.
    fn take_frontier(&mut self) -> Vec<FileCandidate> {
        let Some(depth) = self.queue.front().map(|c| c.depth) else {
            return Vec::new();
        };
        let mut frontier = Vec::new();
        while self.queue.front().is_some_and(|c| c.depth == depth) {
            if let Some(candidate) = self.queue.pop_front() {
                frontier.push(candidate);
            }
        }
        frontier
    }
}

/// Breadth-first walk over the references reachable from one main file.
pub struct GraphWalker<'a> {
    config: &'a CollectorConfig,
    classifier: FileClassifier,
    resolver: PathResolver,
    allowed_roots: Vec<PathBuf>,
    cancel: Option<CancelFlag>,
}

impl<'a> GraphWalker<'a> {
    pub fn new(config: &'a CollectorConfig) -> Self {
        Self {
            config,
            classifier: FileClassifier::from_config(config),
            resolver: PathResolver::from_config(config),
            allowed_roots: Vec::new(),
            cancel: None,
        }
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    pub fn walk(mut self, main_file: &Path) -> Result<MainFileOutcome> {
        let main_file = validate_main_file(main_file)?;
        let main_dir = main_file.parent().map(Path::to_path_buf).unwrap_or_default();

        if self.config.confine_to_roots {
            self.allowed_roots = std::iter::once(main_dir.clone())
                .chain(self.config.extra_roots.iter().filter_map(|r| std::fs::canonicalize(r).ok()))
                .collect();
        }

        let mut state = TraversalState::default();
        state.enqueue(FileCandidate::root(main_file.clone()));

        while !state.queue.is_empty() {
            if self.is_cancelled() {
                warn!("walk cancelled after {} files", state.processed);
                state.cancelled = true;
                break;
            }
            let frontier = state.take_frontier();

            // Classifying a sample is pure per file; results are consumed in queue order.
            let inspections: Vec<Inspection> = frontier
                .par_iter()
                .map(|candidate| self.inspect(candidate))
                .collect();

            let frontier_len = frontier.len();
            for (index, (candidate, inspection)) in frontier.into_iter().zip(inspections).enumerate() {
                if self.is_cancelled() {
                    warn!("walk cancelled after {} files", state.processed);
                    state.cancelled = true;
                    break;
                }

                let in_flight = frontier_len - index - 1;
                self.process(&mut state, candidate, inspection, in_flight);
            }

            if state.cancelled {
                break;
            }
        }

        if state.limits_hit {
            warn!(
                "reference graph of {} exceeded the configured limits (depth {}, {} files); output is partial",
                main_file.display(),
                self.config.max_depth,
                self.config.max_referenced_files
            );
        }
        info!(
            "main-file walk of {}: {} accepted, {} rejected, {} unresolved references",
            main_file.display(),
            state.accepted.len(),
            state.rejected.len(),
            state.unresolved.len()
        );

        Ok(finish(main_file, main_dir, state))
    }

    fn inspect(&self, candidate: &FileCandidate) -> Inspection {
        let Some(path) = candidate.resolved.as_deref() else {
            return Inspection {
                classification: Classification::Reject(RejectReason::Unreadable),
                size: 0,
                content: None,
            };
        };

        if !self.allowed_roots.is_empty() && !self.allowed_roots.iter().any(|r| path.starts_with(r)) {
            debug!("{} lies outside the allowed roots", path.display());
            return Inspection {
                classification: Classification::Reject(RejectReason::Unreadable),
                size: 0,
                content: None,
            };
        }

        self.classifier.inspect(path, false)
    }

    fn process(&self, state: &mut TraversalState, candidate: FileCandidate, inspection: Inspection, in_flight: usize) {
        let Some(path) = candidate.resolved.clone() else {
            return;
        };
        state.processed += 1;

        let encoding = match inspection.classification {
            Classification::Reject(reason) => {
                debug!("rejected {} ({reason})", path.display());
                state.rejected.push(RejectedFile { path, reason });
                return;
            }
            Classification::Accept(encoding) => encoding,
        };

        // Whole files are read one at a time, only frontier samples are held in parallel.
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(err) => {
                debug!("rejected {} ({err})", path.display());
                state.rejected.push(RejectedFile {
                    path,
                    reason: RejectReason::Unreadable,
                });
                return;
            }
        };

        debug!("accepted {} (depth {}, {encoding})", path.display(), candidate.depth);
        state.accepted.push((path.clone(), content.len() as u64, encoding));

        let text = encoding.decode(&content);
        let dialect = ScriptDialect::detect(&path, &text);
        let dir = path.parent().unwrap_or_else(|| Path::new("/"));

        let may_expand = candidate.depth < self.config.max_depth
            && state.processed < self.config.max_referenced_files;

        for reference in extract_references(&text, dialect) {
            let resolved = self.resolver.resolve(reference.text, reference.kind, dir);

            if resolved.is_empty() {
                if may_expand {
                    debug!("unresolved reference {:?} in {}", reference.text, path.display());
                    state.unresolved.push(UnresolvedReference {
                        raw: reference.text.to_string(),
                        referenced_by: path.clone(),
                    });
                }
                continue;
            }

            for target in resolved {
                if state.visited.contains(&target) {
                    continue;
                }

                if !may_expand {
                    // Something new is reachable but the walk may not grow any further.
                    state.limits_hit = true;
                    continue;
                }

                let outstanding = state.processed + in_flight + state.queue.len();
                if outstanding >= self.config.max_referenced_files {
                    state.limits_hit = true;
                    state.visited.insert(target.clone());
                    state.rejected.push(RejectedFile {
                        path: target,
                        reason: RejectReason::LimitExceeded,
                    });
                    continue;
                }

                debug!("{} -> {}", path.display(), target.display());
                state.enqueue(FileCandidate::referenced(reference.text, target, &path, candidate.depth + 1));
            }
        }
    }
}

fn validate_main_file(main_file: &Path) -> Result<PathBuf> {
    if !main_file.exists() {
        return Err(CollectError::RootNotFound(main_file.to_path_buf()));
    }
    if !main_file.is_file() {
        return Err(CollectError::RootNotAFile(main_file.to_path_buf()));
    }

    let canonical = std::fs::canonicalize(main_file).map_err(|source| CollectError::RootUnreadable {
        path: main_file.to_path_buf(),
        source,
    })?;
    std::fs::File::open(&canonical).map_err(|source| CollectError::RootUnreadable {
        path: main_file.to_path_buf(),
        source,
    })?;

    Ok(canonical)
}

fn finish(main_file: PathBuf, main_dir: PathBuf, state: TraversalState) -> MainFileOutcome {
    let base = common_ancestor(state.accepted.iter().filter_map(|(p, _, _)| p.parent()))
        .unwrap_or(main_dir);

    let accepted = state
        .accepted
        .into_iter()
        .enumerate()
        .map(|(order, (path, size, encoding))| AcceptedFile {
            relative: path.strip_prefix(&base).map(Path::to_path_buf).unwrap_or_else(|_| path.clone()),
            path,
            size,
            encoding,
            order,
        })
        .collect();

    MainFileOutcome {
        main_file,
        base,
        accepted,
        rejected: state.rejected,
        unresolved: state.unresolved,
        limits_hit: state.limits_hit,
        cancelled: state.cancelled,
    }
}

/// Deepest directory containing every given directory.
pub fn common_ancestor<'p>(mut dirs: impl Iterator<Item = &'p Path>) -> Option<PathBuf> {
    let mut base = dirs.next()?.to_path_buf();
    for dir in dirs {
        while !dir.starts_with(&base) {
            if !base.pop() {
                return None;
            }
        }
    }
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_common_ancestor() {
        let dirs = [Path::new("/a/b/c"), Path::new("/a/b/d/e"), Path::new("/a/b")];
        assert_eq!(common_ancestor(dirs.into_iter()), Some(PathBuf::from("/a/b")));
        assert_eq!(common_ancestor(std::iter::empty()), None);
    }

    #[test]
    fn test_frontier_takes_one_depth() {
        let mut state = TraversalState::default();
        let root = Path::new("/r");
        state.enqueue(FileCandidate::referenced("a", PathBuf::from("/a"), root, 1));
        state.enqueue(FileCandidate::referenced("b", PathBuf::from("/b"), root, 1));
        state.enqueue(FileCandidate::referenced("c", PathBuf::from("/c"), root, 2));
        assert!(!state.enqueue(FileCandidate::referenced("a", PathBuf::from("/a"), root, 2)));

        let frontier = state.take_frontier();
        assert_eq!(frontier.len(), 2);
        assert_eq!(state.queue.len(), 1);
    }

    #[test]
    fn test_cancelled_walk_returns_partial_result() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("main.sh"), "source a.sh\n").unwrap();
        fs::write(temp.path().join("a.sh"), "echo a\n").unwrap();

        let flag = CancelFlag::new();
        flag.cancel();
        let config = CollectorConfig::default();
        let outcome = GraphWalker::new(&config)
            .with_cancel_flag(flag)
            .walk(&temp.path().join("main.sh"))
            .unwrap();

        assert!(outcome.cancelled);
        assert!(outcome.accepted.is_empty());
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_references_past_the_sample_are_followed() {
        let temp = tempfile::tempdir().unwrap();
        let mut script = String::from("#!/bin/bash\n");
        script.push_str(&"# padding line\n".repeat(40));
        script.push_str("source tail.sh\n");
        fs::write(temp.path().join("main.sh"), &script).unwrap();
        fs::write(temp.path().join("tail.sh"), "echo tail\n").unwrap();

        let config = CollectorConfig {
            sample_size: 64,
            ..CollectorConfig::default()
        };
        let outcome = GraphWalker::new(&config).walk(&temp.path().join("main.sh")).unwrap();

        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.accepted[0].size, script.len() as u64);
        assert!(outcome.accepted[1].path.ends_with("tail.sh"));
    }

    #[test]
    fn test_missing_main_file_is_fatal() {
        let config = CollectorConfig::default();
        let err = GraphWalker::new(&config).walk(Path::new("/definitely/not/here.py")).unwrap_err();
        assert!(matches!(err, CollectError::RootNotFound(_)));
    }
}
