//! Collects related text and script files into one reviewable dump while
//! keeping firmware images and binaries out of it.
//!
//! Two collection strategies are offered: [`run_main_file_mode`] follows the
//! references of one main script breadth-first, [`run_folder_mode`] takes
//! every safe text file below a directory.

pub mod config;
pub mod error;
pub mod output;
pub mod resolver;
pub mod types;

pub use config::CollectorConfig;
pub use error::{CollectError, Result};
pub use resolver::{CancelFlag, FileClassifier, FolderWalker, GraphWalker};
pub use types::{AcceptedFile, FolderOutcome, MainFileOutcome, RejectReason, RejectedFile};

use std::path::Path;

/// Walk the reference graph of `main_file`.
///
/// Hitting the depth or file budget is not an error; it is reported through
/// [`MainFileOutcome::limits_hit`].
pub fn run_main_file_mode(main_file: &Path, config: &CollectorConfig) -> Result<MainFileOutcome> {
    GraphWalker::new(config).walk(main_file)
}

/// Collect every accepted file below `root` in walk order.
pub fn run_folder_mode(root: &Path, config: &CollectorConfig) -> Result<FolderOutcome> {
    FolderWalker::new(config).walk(root)
}
