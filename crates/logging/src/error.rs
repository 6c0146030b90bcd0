use thiserror::Error;

/// Errors setting up the logging stack.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open syslog connection: {0}")]
    Syslog(String),
}
