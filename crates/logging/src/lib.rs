//! Logging setup shared by the client and server binaries.
//!
//! Both sides log through `tracing` to stderr. The server additionally
//! mirrors `ERROR`- and `INFO`-level records to syslog facility
//! `LOG_LOCAL0`, ident `<program>[<pid>]`.

mod error;
mod syslog_layer;

pub use error::LoggingError;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Initializes stderr-only logging, for the client.
///
/// Honors `RUST_LOG` if set; otherwise logs at `info` and above.
pub fn init_client() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}

/// Initializes stderr plus syslog (`LOG_LOCAL0`) logging, for the server.
///
/// `ident` should be the program's basename; the pid is appended
/// automatically by the syslog formatter.
pub fn init_server(ident: &str) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let syslog_layer = syslog_layer::SyslogLayer::new(ident.to_string()).map_err(LoggingError::Syslog)?;

    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).with(syslog_layer).try_init();
    Ok(())
}
