use thiserror::Error;

/// Fatal errors from the client side of a session.
///
/// Per-entry failures (an unreadable file, a directory entry that vanished
/// mid-walk, a contended `flock`) are not represented here — they are
/// logged and folded into [`crate::SessionStats::skipped`] instead, per the
/// non-fatal/fatal split in the design.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path {path:?} exceeds the {limit}-byte normalization buffer")]
    PathTooLong { path: String, limit: usize },

    #[error("path {path:?} does not start with configured root {root:?}")]
    RootMismatch { path: String, root: String },

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("unexpected reply to {verb}: {reply:?}")]
    UnexpectedReply { verb: &'static str, reply: String },
}
