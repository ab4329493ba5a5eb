use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, UtcOffset};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Timestamp(pub OffsetDateTime);

impl Timestamp {
    pub fn now_utc() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn from(dt: OffsetDateTime) -> Self {
        Self(dt.to_offset(UtcOffset::UTC))
    }

    /// Returns the inner UTC `OffsetDateTime` without consuming the wrapper.
    pub fn as_inner(&self) -> OffsetDateTime {
        self.0
    }

    /// Consumes the wrapper and returns the inner UTC `OffsetDateTime`.
    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn plus(self, delay: Duration) -> Self {
        Self(self.0 + delay)
    }

    pub fn minus(self, delay: Duration) -> Self {
        Self(self.0 - delay)
    }

    /// RFC 3339 rendering used in payloads and API responses.
    pub fn to_rfc3339(&self) -> String {
        self.0.format(&Rfc3339).unwrap_or_default()
    }
}
