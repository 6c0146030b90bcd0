use thiserror::Error;

/// The top-level error type for both binaries; every variant maps to exit
/// code 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Args(String),

    #[error("transport command template: {0}")]
    Template(String),

    #[error(transparent)]
    Walk(#[from] walk::WalkError),

    #[error(transparent)]
    Engine(#[from] engine::EngineError),

    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),

    #[error(transparent)]
    Logging(#[from] logging::LoggingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}
