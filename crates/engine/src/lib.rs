//! Server-side snapshot engine (C4) and retention policy (C5).
//!
//! [`SessionContext`] is the session's entire mutable state, created once at
//! startup and threaded by `&mut` through every record handler — there is no
//! process-global state, so nothing prevents running several independent
//! server processes against different backup roots on the same host.

mod commit;
mod context;
mod dispatch;
mod error;
mod retention;
mod startup;

pub use commit::{commit, exit_status};
pub use context::SessionContext;
pub use dispatch::{dispatch, Outcome};
pub use error::EngineError;
pub use retention::{prune, BackupName, MAX_SNAPSHOTS};
pub use startup::start_session;
