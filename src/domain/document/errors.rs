//! Document Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Cannot open package archive: {0}")]
    Archive(String),

    #[error("Package entry not found: {0}")]
    MissingEntry(String),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Invalid container manifest: {0}")]
    InvalidManifest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for DocumentError {
    fn from(err: zip::result::ZipError) -> Self {
        DocumentError::Archive(err.to_string())
    }
}
