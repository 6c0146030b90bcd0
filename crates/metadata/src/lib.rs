//! Meta sidecars: the `<name>.meta` files that record permission bits,
//! owner, and group for an entry that is otherwise only recoverable from
//! the materialized filesystem object (which may itself be a hard link
//! carrying the previous snapshot's attributes).

mod error;
mod sidecar;

pub use error::MetadataError;
pub use sidecar::{sidecar_path, write_or_link_sidecar, MetaSidecar};
