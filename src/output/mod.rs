pub mod report;
pub mod writer;

pub use report::{write_report, Report};
pub use writer::{DumpHeader, DumpWriter};
