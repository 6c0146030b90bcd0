use camino::Utf8PathBuf;

use crate::error::ProtocolError;
use crate::quote::{quote, unquote};
use crate::timestamp::Timestamp;

/// One wire-level request the client sends to the server.
///
/// `Record::Body`'s payload is never carried by the value itself — see the
/// module documentation in [`crate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Dir {
        path: Utf8PathBuf,
        mode: u32,
        uid: u32,
        gid: u32,
        ctime: Timestamp,
    },
    File {
        path: Utf8PathBuf,
        mode: u32,
        uid: u32,
        gid: u32,
        mtime: Timestamp,
        ctime: Timestamp,
    },
    Symlink {
        path: Utf8PathBuf,
        mode: u32,
        uid: u32,
        gid: u32,
        ctime: Timestamp,
        target: Utf8PathBuf,
    },
    Body {
        size: u64,
    },
    Name,
    DiskTotal,
    DiskUsage,
    RemoveOld,
    ThankYou,
}

impl Record {
    /// Verb token for this record, used both for encoding and for error
    /// messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Record::Dir { .. } => "DIR",
            Record::File { .. } => "FILE",
            Record::Symlink { .. } => "SYMLINK",
            Record::Body { .. } => "BODY",
            Record::Name => "NAME",
            Record::DiskTotal => "DISK_TOTAL",
            Record::DiskUsage => "DISK_USAGE",
            Record::RemoveOld => "REMOVE_OLD",
            Record::ThankYou => "THANK_YOU",
        }
    }

    /// Renders the full wire line, including the trailing `\r\n`.
    pub fn encode(&self) -> Vec<u8> {
        let mut line = String::from(self.verb());
        match self {
            Record::Dir { path, mode, uid, gid, ctime } => {
                line.push(' ');
                line.push_str(&quote(path.as_str()));
                push_fields(&mut line, &[&format!("{mode:o}"), &uid.to_string(), &gid.to_string(), &ctime.render()]);
            }
            Record::File { path, mode, uid, gid, mtime, ctime } => {
                line.push(' ');
                line.push_str(&quote(path.as_str()));
                push_fields(
                    &mut line,
                    &[&format!("{mode:o}"), &uid.to_string(), &gid.to_string(), &mtime.render(), &ctime.render()],
                );
            }
            Record::Symlink { path, mode, uid, gid, ctime, target } => {
                line.push(' ');
                line.push_str(&quote(path.as_str()));
                push_fields(&mut line, &[&format!("{mode:o}"), &uid.to_string(), &gid.to_string(), &ctime.render()]);
                line.push(' ');
                line.push_str(&quote(target.as_str()));
            }
            Record::Body { size } => {
                line.push(' ');
                line.push_str(&size.to_string());
            }
            Record::Name
            | Record::DiskTotal
            | Record::DiskUsage
            | Record::RemoveOld
            | Record::ThankYou => {}
        }
        line.push_str("\r\n");
        line.into_bytes()
    }

    /// Parses a single `Record` from the start of `buf`.
    ///
    /// `buf` must contain at least one full line (terminated by `\n`,
    /// optionally preceded by `\r`). Returns the parsed record and the
    /// number of bytes consumed, including the terminator.
    pub fn decode(buf: &[u8]) -> Result<(Record, usize), ProtocolError> {
        let nl = match buf.iter().position(|&b| b == b'\n') {
            Some(p) => p,
            None if buf.len() > crate::MAX_LINE => {
                return Err(ProtocolError::LineTooLong { len: buf.len() })
            }
            None => return Err(ProtocolError::Incomplete),
        };
        let consumed = nl + 1;
        let mut line = std::str::from_utf8(&buf[..nl]).map_err(|_| ProtocolError::Malformed {
            verb: "line",
            field: "utf8",
            detail: "not valid UTF-8".to_string(),
        })?;
        line = line.strip_suffix('\r').unwrap_or(line);

        let record = parse_line(line)?;
        Ok((record, consumed))
    }
}

fn push_fields(line: &mut String, fields: &[&str]) {
    for f in fields {
        line.push(' ');
        line.push_str(f);
    }
}

struct Cursor<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Cursor { s, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.s[self.pos..]
    }

    fn skip_one_space(&mut self, verb: &'static str) -> Result<(), ProtocolError> {
        if self.rest().starts_with(' ') {
            self.pos += 1;
            Ok(())
        } else {
            Err(ProtocolError::Malformed {
                verb,
                field: "separator",
                detail: "expected a space".to_string(),
            })
        }
    }

    fn take_token(&mut self) -> &'a str {
        let rest = self.rest();
        let end = rest.find(' ').unwrap_or(rest.len());
        let tok = &rest[..end];
        self.pos += end;
        tok
    }

    fn take_qstring(&mut self, verb: &'static str, field: &'static str) -> Result<Utf8PathBuf, ProtocolError> {
        let (s, consumed) = unquote(self.rest()).map_err(|e| match e {
            ProtocolError::UnterminatedString => ProtocolError::UnterminatedString,
            _ => ProtocolError::Malformed {
                verb,
                field,
                detail: e.to_string(),
            },
        })?;
        self.pos += consumed;
        Ok(Utf8PathBuf::from(s))
    }

    fn take_octal(&mut self, verb: &'static str, field: &'static str) -> Result<u32, ProtocolError> {
        let tok = self.take_token();
        u32::from_str_radix(tok, 8).map_err(|e| ProtocolError::Malformed {
            verb,
            field,
            detail: e.to_string(),
        })
    }

    fn take_decimal_u32(&mut self, verb: &'static str, field: &'static str) -> Result<u32, ProtocolError> {
        let tok = self.take_token();
        tok.parse().map_err(|_| ProtocolError::Malformed {
            verb,
            field,
            detail: format!("{tok:?} is not a decimal number"),
        })
    }

    fn take_decimal_u64(&mut self, verb: &'static str, field: &'static str) -> Result<u64, ProtocolError> {
        let tok = self.take_token();
        tok.parse().map_err(|_| ProtocolError::Malformed {
            verb,
            field,
            detail: format!("{tok:?} is not a decimal number"),
        })
    }

    fn take_timestamp(&mut self, verb: &'static str, field: &'static str) -> Result<Timestamp, ProtocolError> {
        let tok = self.take_token();
        Timestamp::parse(tok).map_err(|_| ProtocolError::Malformed {
            verb,
            field,
            detail: format!("{tok:?} is not a valid timestamp"),
        })
    }
}

fn parse_line(line: &str) -> Result<Record, ProtocolError> {
    let mut c = Cursor::new(line);
    let verb = c.take_token();
    match verb {
        "DIR" => {
            c.skip_one_space("DIR")?;
            let path = c.take_qstring("DIR", "path")?;
            c.skip_one_space("DIR")?;
            let mode = c.take_octal("DIR", "mode")?;
            c.skip_one_space("DIR")?;
            let uid = c.take_decimal_u32("DIR", "uid")?;
            c.skip_one_space("DIR")?;
            let gid = c.take_decimal_u32("DIR", "gid")?;
            c.skip_one_space("DIR")?;
            let ctime = c.take_timestamp("DIR", "ctime")?;
            Ok(Record::Dir { path, mode, uid, gid, ctime })
        }
        "FILE" => {
            c.skip_one_space("FILE")?;
            let path = c.take_qstring("FILE", "path")?;
            c.skip_one_space("FILE")?;
            let mode = c.take_octal("FILE", "mode")?;
            c.skip_one_space("FILE")?;
            let uid = c.take_decimal_u32("FILE", "uid")?;
            c.skip_one_space("FILE")?;
            let gid = c.take_decimal_u32("FILE", "gid")?;
            c.skip_one_space("FILE")?;
            let mtime = c.take_timestamp("FILE", "mtime")?;
            c.skip_one_space("FILE")?;
            let ctime = c.take_timestamp("FILE", "ctime")?;
            Ok(Record::File { path, mode, uid, gid, mtime, ctime })
        }
        "SYMLINK" => {
            c.skip_one_space("SYMLINK")?;
            let path = c.take_qstring("SYMLINK", "path")?;
            c.skip_one_space("SYMLINK")?;
            let mode = c.take_octal("SYMLINK", "mode")?;
            c.skip_one_space("SYMLINK")?;
            let uid = c.take_decimal_u32("SYMLINK", "uid")?;
            c.skip_one_space("SYMLINK")?;
            let gid = c.take_decimal_u32("SYMLINK", "gid")?;
            c.skip_one_space("SYMLINK")?;
            let ctime = c.take_timestamp("SYMLINK", "ctime")?;
            c.skip_one_space("SYMLINK")?;
            let target = c.take_qstring("SYMLINK", "target")?;
            Ok(Record::Symlink { path, mode, uid, gid, ctime, target })
        }
        "BODY" => {
            c.skip_one_space("BODY")?;
            let size = c.take_decimal_u64("BODY", "size")?;
            Ok(Record::Body { size })
        }
        "NAME" => Ok(Record::Name),
        "DISK_TOTAL" => Ok(Record::DiskTotal),
        "DISK_USAGE" => Ok(Record::DiskUsage),
        "REMOVE_OLD" => Ok(Record::RemoveOld),
        "THANK_YOU" => Ok(Record::ThankYou),
        other => Err(ProtocolError::UnknownVerb { verb: other.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(r: &Record) -> String {
        String::from_utf8(r.encode()).unwrap()
    }

    #[test]
    fn dir_round_trips() {
        let r = Record::Dir {
            path: "usr".into(),
            mode: 0o755,
            uid: 0,
            gid: 0,
            ctime: Timestamp::parse("2024-01-01T00:00:00").unwrap(),
        };
        let encoded = line(&r);
        assert_eq!(encoded, "DIR \"usr\" 755 0 0 2024-01-01T00:00:00\r\n");
        let (decoded, consumed) = Record::decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, r);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn file_round_trips_with_changed_fields() {
        let r = Record::File {
            path: "a.txt".into(),
            mode: 0o644,
            uid: 1000,
            gid: 1000,
            mtime: Timestamp::parse("2024-01-02T00:00:00").unwrap(),
            ctime: Timestamp::parse("2024-01-02T00:00:01").unwrap(),
        };
        let encoded = line(&r);
        let (decoded, _) = Record::decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, r);
    }

    #[test]
    fn symlink_with_quoted_path_and_target() {
        let encoded = "SYMLINK \"weird\\\"\\\\name\" 777 0 0 2024-01-01T00:00:00 \"a.txt\"\r\n";
        let (decoded, consumed) = Record::decode(encoded.as_bytes()).unwrap();
        assert_eq!(consumed, encoded.len());
        match decoded {
            Record::Symlink { path, target, .. } => {
                assert_eq!(path.as_str(), "weird\"\\name");
                assert_eq!(target.as_str(), "a.txt");
            }
            other => panic!("unexpected record: {other:?}"),
        }
    }

    #[test]
    fn body_carries_only_size() {
        let encoded = "BODY 5\r\n";
        let (decoded, consumed) = Record::decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, Record::Body { size: 5 });
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn bare_verbs_round_trip() {
        for r in [Record::Name, Record::DiskTotal, Record::DiskUsage, Record::RemoveOld, Record::ThankYou] {
            let encoded = line(&r);
            let (decoded, consumed) = Record::decode(encoded.as_bytes()).unwrap();
            assert_eq!(decoded, r);
            assert_eq!(consumed, encoded.len());
        }
    }

    #[test]
    fn decode_tolerates_bare_lf() {
        let (decoded, consumed) = Record::decode(b"THANK_YOU\n").unwrap();
        assert_eq!(decoded, Record::ThankYou);
        assert_eq!(consumed, 10);
    }

    #[test]
    fn decode_leaves_residual_bytes() {
        let buf = b"THANK_YOU\r\nDISK_TOTAL\r\n";
        let (first, consumed) = Record::decode(buf).unwrap();
        assert_eq!(first, Record::ThankYou);
        let (second, _) = Record::decode(&buf[consumed..]).unwrap();
        assert_eq!(second, Record::DiskTotal);
    }

    #[test]
    fn unknown_verb_is_an_error() {
        let err = Record::decode(b"BOGUS\r\n").unwrap_err();
        assert_eq!(err, ProtocolError::UnknownVerb { verb: "BOGUS".to_string() });
    }

    #[test]
    fn incomplete_line_is_an_error() {
        assert_eq!(Record::decode(b"THANK_Y").unwrap_err(), ProtocolError::Incomplete);
    }
}
