use thiserror::Error;

/// Errors from the server side of a session.
///
/// Most of these are recoverable at the dispatch level: a handler returning
/// `Err` is downgraded to an `NG` reply and logged. Only the variants
/// documented as fatal below abort the whole session.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Fatal: the staged snapshot (or its `.meta` directory) could not be
    /// created at startup.
    #[error("failed to create staged snapshot at {path}: {source}")]
    StagingFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{verb} for {path} has no parent directory staged yet")]
    MissingParent { verb: &'static str, path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Metadata(#[from] metadata::MetadataError),

    #[error("FILE record received without a preceding BODY target")]
    NoCurrentFile,

    #[error("{0}")]
    Statfs(String),
}
