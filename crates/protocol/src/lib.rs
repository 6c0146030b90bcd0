//! Wire protocol for ubackup client/server sessions.
//!
//! The protocol is a line-oriented, CRLF-terminated request/response grammar
//! with one out-of-band binary frame (the `BODY` payload). This crate owns
//! the pure encode/decode logic only; it does not perform any I/O itself —
//! callers own the transport and decide when to read the next line or the
//! next `size` bytes of a body.
//!
//! # Design
//!
//! - [`Record`] is a sum type, one variant per request verb.
//! - [`Reply`] is the small set of server responses.
//! - [`Record::decode`] and [`Reply::decode`] are pure functions from a byte
//!   slice to a parsed value plus the number of bytes consumed, so callers
//!   can feed them a buffer that may contain trailing data (this mirrors the
//!   "residual offset" shape used by streaming parsers elsewhere in the
//!   workspace rather than requiring an exact, pre-split line).
//! - The `BODY` payload itself is never represented inside a [`Record`]; once
//!   a caller observes `Record::Body { size }` it reads `size` raw bytes from
//!   the transport directly.

mod error;
mod quote;
mod record;
mod reply;
mod timestamp;

pub use error::ProtocolError;
pub use quote::{quote, unquote};
pub use record::Record;
pub use reply::Reply;
pub use timestamp::Timestamp;

/// Maximum size of a single protocol line: the 4096-byte path limit plus
/// headroom for the surrounding fields.
pub const MAX_LINE: usize = 4096 + 256;
