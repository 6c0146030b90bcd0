use thiserror::Error;

/// Errors raised while decoding a wire-protocol line or reply.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The buffer handed to `decode` does not contain a terminated line yet.
    #[error("incomplete line")]
    Incomplete,

    /// A line exceeded [`crate::MAX_LINE`] without a terminator.
    #[error("line too long ({len} bytes)")]
    LineTooLong { len: usize },

    /// The verb token did not match any known request.
    #[error("unknown verb {verb:?}")]
    UnknownVerb { verb: String },

    /// A reply line did not start with a recognised keyword.
    #[error("unrecognised reply {line:?}")]
    UnrecognisedReply { line: String },

    /// A required argument was missing or malformed.
    #[error("malformed {field} in {verb:?}: {detail}")]
    Malformed {
        verb: &'static str,
        field: &'static str,
        detail: String,
    },

    /// A quoted string was not terminated before the end of the line.
    #[error("unterminated quoted string")]
    UnterminatedString,

    /// A reply carried a verb-incompatible keyword (e.g. `CHANGED` for `DIR`).
    #[error("reply {reply:?} is not valid for verb {verb}")]
    ReplyMismatch { verb: &'static str, reply: String },
}
