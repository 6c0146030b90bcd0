use std::time::SystemTime;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::ProtocolError;

const WIRE_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// A wire-format timestamp: local time, seconds precision, no timezone.
///
/// This is the representation used for `ctime`/`mtime` arguments on `DIR`,
/// `FILE`, and `SYMLINK` records. Snapshot names extend this with a
/// millisecond suffix, which is handled separately by the engine crate since
/// it never appears inside a [`crate::Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(PrimitiveDateTime);

impl Timestamp {
    /// Parses an ISO-8601 `YYYY-MM-DDTHH:MM:SS` timestamp.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        PrimitiveDateTime::parse(s, WIRE_FORMAT)
            .map(Timestamp)
            .map_err(|e| ProtocolError::Malformed {
                verb: "timestamp",
                field: "iso8601",
                detail: e.to_string(),
            })
    }

    /// Renders as `YYYY-MM-DDTHH:MM:SS`.
    pub fn render(&self) -> String {
        // A fixed, validated format description cannot fail to apply.
        self.0.format(WIRE_FORMAT).expect("format description is valid")
    }

    /// Truncates a [`SystemTime`] to local-time, seconds precision.
    pub fn from_system_time(t: SystemTime) -> Self {
        let odt: OffsetDateTime = t.into();
        let local = odt.to_offset(local_offset());
        Timestamp(PrimitiveDateTime::new(local.date(), local.time().replace_nanosecond(0).unwrap_or(local.time())))
    }

    /// The current local time, seconds precision.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Converts back to a [`SystemTime`], assuming this timestamp is in the
    /// local offset (the same assumption [`Self::from_system_time`] makes).
    pub fn to_system_time(self) -> SystemTime {
        self.0.assume_offset(local_offset()).into()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Returns the local UTC offset, falling back to UTC if it cannot be
/// determined (e.g. in a multi-threaded process on platforms where
/// `time` refuses to read the offset for soundness reasons).
fn local_offset() -> time::UtcOffset {
    time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC)
}
