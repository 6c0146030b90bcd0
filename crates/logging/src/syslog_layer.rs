use std::sync::Mutex;

use syslog::{Facility, Formatter3164, Logger, LoggerBackend};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Mirrors `ERROR`- and `INFO`-level events to syslog facility `LOG_LOCAL0`
/// (errors and informational session events, respectively). `WARN`/`DEBUG`/
/// `TRACE` stay on the fmt layer only.
pub struct SyslogLayer {
    logger: Mutex<Logger<LoggerBackend, Formatter3164>>,
}

impl SyslogLayer {
    pub fn new(ident: String) -> Result<Self, String> {
        let formatter = Formatter3164 {
            facility: Facility::LOG_LOCAL0,
            hostname: None,
            process: ident,
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter).map_err(|e| e.to_string())?;
        Ok(SyslogLayer { logger: Mutex::new(logger) })
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for SyslogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level != Level::ERROR && level != Level::INFO {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut logger = self.logger.lock().unwrap_or_else(|e| e.into_inner());
        let line = format!("{} {}", event.metadata().target(), visitor.message);
        let _ = if level == Level::ERROR { logger.err(line) } else { logger.info(line) };
    }
}
