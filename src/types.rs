use crate::resolver::encoding::TextEncoding;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A reference discovered in some file, on its way through resolution.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub raw: String,
    pub resolved: Option<PathBuf>,
    /// File whose content produced the reference. `None` for the main file.
    pub referenced_by: Option<PathBuf>,
    pub depth: usize,
}

impl FileCandidate {
    pub fn root(path: PathBuf) -> Self {
        Self {
            raw: path.display().to_string(),
            resolved: Some(path),
            referenced_by: None,
            depth: 0,
        }
    }

    pub fn referenced(raw: &str, resolved: PathBuf, referenced_by: &Path, depth: usize) -> Self {
        Self {
            raw: raw.to_string(),
            resolved: Some(resolved),
            referenced_by: Some(referenced_by.to_path_buf()),
            depth,
        }
    }
}

/// A file that passed classification and will be part of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedFile {
    pub path: PathBuf,
    pub relative: PathBuf,
    pub size: u64,
    pub encoding: TextEncoding,
    pub order: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    ExcludedExtension,
    FirmwareSignature,
    BinaryContent,
    Unreadable,
    LimitExceeded,
}

impl RejectReason {
    pub fn tag(&self) -> &'static str {
        match self {
            RejectReason::ExcludedExtension => "excluded-extension",
            RejectReason::FirmwareSignature => "firmware-signature",
            RejectReason::BinaryContent => "binary-content",
            RejectReason::Unreadable => "unreadable",
            RejectReason::LimitExceeded => "limit-exceeded",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedFile {
    pub path: PathBuf,
    pub reason: RejectReason,
}

/// A reference that matched a pattern but did not resolve to any file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub raw: String,
    pub referenced_by: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MainFileOutcome {
    pub main_file: PathBuf,
    /// Directory the relative paths of `accepted` are computed against.
    pub base: PathBuf,
    pub accepted: Vec<AcceptedFile>,
    pub rejected: Vec<RejectedFile>,
    pub unresolved: Vec<UnresolvedReference>,
    pub limits_hit: bool,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderOutcome {
    pub root: PathBuf,
    pub accepted: Vec<AcceptedFile>,
    pub rejected: Vec<RejectedFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_tags_match_serde_names() {
        let reasons = [
            RejectReason::ExcludedExtension,
            RejectReason::FirmwareSignature,
            RejectReason::BinaryContent,
            RejectReason::Unreadable,
            RejectReason::LimitExceeded,
        ];

        for reason in reasons {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.tag()));
            assert_eq!(reason.to_string(), reason.tag());
        }
    }
}
