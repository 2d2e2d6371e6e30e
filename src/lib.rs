pub mod error;
pub mod reader;
pub mod splitter;
pub mod workbook;

pub use error::SplitterError;
pub use splitter::{SplitConfig, SplitReport, Splitter};

pub type Result<T> = std::result::Result<T, error::SplitterError>;
