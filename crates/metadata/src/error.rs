use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("malformed meta sidecar: {0}")]
    Malformed(String),

    #[error("I/O error writing meta sidecar: {0}")]
    Io(#[from] std::io::Error),
}
