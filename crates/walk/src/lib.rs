//! Client-side path normalization and filesystem traversal.
//!
//! This crate owns components C1 (path normalizer) and C3 (walker) of the
//! ubackup design. It talks to a peer (normally the session's transport,
//! but a plain in-memory pipe in tests) through the [`Peer`] trait, so the
//! walk logic itself never touches a socket or child process directly.

mod error;
mod path;
mod peer;
mod stats;
mod tree;

pub use error::WalkError;
pub use path::{normalize, relative_to_root};
pub use peer::Peer;
pub use stats::SessionStats;
pub use tree::{backup_tree, WalkOptions};
