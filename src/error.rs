use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole run.
///
/// Anything that goes wrong with an individual file during a walk is recorded
/// as a [`crate::types::RejectReason`] instead and never surfaces here.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("root path does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("main file is not a regular file: {}", .0.display())]
    RootNotAFile(PathBuf),

    #[error("root folder is not a directory: {}", .0.display())]
    RootNotADirectory(PathBuf),

    #[error("cannot read {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot write output {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CollectError>;
