use std::io;
use std::path::PathBuf;

use thiserror::Error;
use zip::result::ZipError;

#[derive(Debug, Error)]
pub enum SplitterError {
    #[error("cannot open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' is an encrypted workbook, decrypt it before splitting", .0.display())]
    Encrypted(PathBuf),

    #[error("invalid workbook: {0}")]
    InvalidFormat(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("batch size {0} is too small, at least 2 rows are needed per file")]
    InvalidBatchSize(usize),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("zip: {0}")]
    Zip(#[from] ZipError),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),
}
