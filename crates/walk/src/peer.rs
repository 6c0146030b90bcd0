use protocol::{Record, Reply};

use crate::error::WalkError;

/// The client's synchronous view of its connection to the server.
///
/// The walker never issues a second request before reading the reply to the
/// first: the session is strictly request/response. `BODY` is the one
/// request whose payload is sent as a separate stream of raw bytes between
/// the request line and its single reply, so the trait exposes `send_raw`
/// and `recv_reply` independently rather than bundling them; [`request`]
/// composes the two for every other verb.
pub trait Peer {
    /// Writes raw bytes to the transport without reading anything back.
    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), WalkError>;

    /// Reads the next reply line from the transport.
    fn recv_reply(&mut self) -> Result<Reply, WalkError>;

    /// Sends `record`'s wire line and reads its matching reply.
    fn request(&mut self, record: &Record) -> Result<Reply, WalkError> {
        self.send_raw(&record.encode())?;
        self.recv_reply()
    }
}
