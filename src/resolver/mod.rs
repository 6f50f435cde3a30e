pub mod dialect;
pub mod encoding;
pub mod file_classifier;
pub mod firmware;
pub mod folder_walker;
pub mod graph_walker;
pub mod path_resolver;
pub mod reference_extractor;

pub use dialect::ScriptDialect;
pub use encoding::TextEncoding;
pub use file_classifier::{Classification, FileClassifier, Inspection};
pub use firmware::{FirmwareFormat, FirmwareThresholds};
pub use folder_walker::FolderWalker;
pub use graph_walker::{CancelFlag, GraphWalker};
pub use path_resolver::PathResolver;
pub use reference_extractor::{extract_references, Reference, ReferenceKind, References};
