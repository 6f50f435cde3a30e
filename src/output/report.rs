use crate::error::{CollectError, Result};
use crate::types::{AcceptedFile, FolderOutcome, MainFileOutcome, RejectedFile, UnresolvedReference};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Machine-readable summary of one run, written with `--report`.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub mode: &'static str,
    pub root: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_file: Option<&'a Path>,
    pub output: &'a Path,
    pub accepted: &'a [AcceptedFile],
    pub rejected: &'a [RejectedFile],
    pub unresolved: &'a [UnresolvedReference],
    pub limits_hit: bool,
    pub cancelled: bool,
}

impl<'a> Report<'a> {
    pub fn main_file(outcome: &'a MainFileOutcome, output: &'a Path) -> Self {
        Self {
            mode: "main",
            root: &outcome.base,
            main_file: Some(&outcome.main_file),
            output,
            accepted: &outcome.accepted,
            rejected: &outcome.rejected,
            unresolved: &outcome.unresolved,
            limits_hit: outcome.limits_hit,
            cancelled: outcome.cancelled,
        }
    }

    pub fn folder(outcome: &'a FolderOutcome, output: &'a Path) -> Self {
        Self {
            mode: "folder",
            root: &outcome.root,
            main_file: None,
            output,
            accepted: &outcome.accepted,
            rejected: &outcome.rejected,
            unresolved: &[],
            limits_hit: false,
            cancelled: false,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn write_report(report: &Report<'_>, path: &Path) -> Result<()> {
    let output_error = |source| CollectError::Output {
        path: PathBuf::from(path),
        source,
    };
    let json = report.to_json().map_err(|e| output_error(e.into()))?;
    fs::write(path, json + "\n").map_err(output_error)
}
