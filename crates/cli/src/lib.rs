//! Session driver (C6): CLI argument parsing and client/server orchestration.
//!
//! The client side walks the source trees over a [`Peer`](walk::Peer)
//! wrapping whatever [`ChildTransport`](transport::ChildTransport) the
//! `--command` template spawned; the server side dispatches incoming
//! records straight off its own stdin.

mod args;
mod client;
mod error;
mod server;
mod transport;

pub use args::{ClientArgs, ServerArgs};
pub use client::run_client;
pub use error::CliError;
pub use server::run_server;
pub use transport::{render_command, ChildTransport};
