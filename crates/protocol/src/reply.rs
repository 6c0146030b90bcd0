use crate::error::ProtocolError;

/// A server response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `OK` or `OK <payload>`.
    Ok(Option<String>),
    /// `NG`.
    Ng,
    /// `CHANGED`, valid only as a reply to `FILE`.
    Changed,
    /// `UNCHANGED`, valid only as a reply to `FILE`.
    Unchanged,
}

impl Reply {
    /// Renders the full wire line, including the trailing `\r\n`.
    pub fn encode(&self) -> Vec<u8> {
        let mut line = match self {
            Reply::Ok(None) => "OK".to_string(),
            Reply::Ok(Some(payload)) => format!("OK {payload}"),
            Reply::Ng => "NG".to_string(),
            Reply::Changed => "CHANGED".to_string(),
            Reply::Unchanged => "UNCHANGED".to_string(),
        };
        line.push_str("\r\n");
        line.into_bytes()
    }

    /// Parses a single `Reply` from the start of `buf`, mirroring
    /// [`crate::Record::decode`]'s residual-offset shape.
    pub fn decode(buf: &[u8]) -> Result<(Reply, usize), ProtocolError> {
        let nl = match buf.iter().position(|&b| b == b'\n') {
            Some(p) => p,
            None if buf.len() > crate::MAX_LINE => {
                return Err(ProtocolError::LineTooLong { len: buf.len() })
            }
            None => return Err(ProtocolError::Incomplete),
        };
        let consumed = nl + 1;
        let line = std::str::from_utf8(&buf[..nl])
            .map_err(|_| ProtocolError::Malformed {
                verb: "reply",
                field: "utf8",
                detail: "not valid UTF-8".to_string(),
            })?
            .strip_suffix('\r')
            .map(str::to_string)
            .unwrap_or_else(|| std::str::from_utf8(&buf[..nl]).unwrap().to_string());

        let reply = if line == "OK" {
            Reply::Ok(None)
        } else if let Some(payload) = line.strip_prefix("OK ") {
            Reply::Ok(Some(payload.to_string()))
        } else if line == "NG" {
            Reply::Ng
        } else if line == "CHANGED" {
            Reply::Changed
        } else if line == "UNCHANGED" {
            Reply::Unchanged
        } else {
            return Err(ProtocolError::UnrecognisedReply { line });
        };
        Ok((reply, consumed))
    }

    /// Validates that this reply is a legal response to `verb`, per the
    /// grammar's restriction that `CHANGED`/`UNCHANGED` only answer `FILE`.
    pub fn validate_for(&self, verb: &'static str) -> Result<(), ProtocolError> {
        let ok = match self {
            Reply::Changed | Reply::Unchanged => verb == "FILE",
            Reply::Ok(_) | Reply::Ng => true,
        };
        if ok {
            Ok(())
        } else {
            Err(ProtocolError::ReplyMismatch { verb, reply: format!("{self:?}") })
        }
    }
}
