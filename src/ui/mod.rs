pub mod progress;
pub mod wizard;

pub use progress::WalkSpinner;
pub use wizard::{default_output, CollectionMode, ModeWizard};
