//! Strongly typed domain primitives shared by the tree, the strategies and the codec.
//!
//! Identifiers stay plain `String`s because they cross the line codec verbatim; the
//! newtypes here cover time, which needs a stable textual form.

use crate::domain::errors::LedgerError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, SubsecRound, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identity of the built-in system user that seeds every log.
pub const ADMIN_USER: &str = "admin@local.host";

/// Display name of the built-in system user.
pub const ADMIN_NAME: &str = "System";

/// UTC timestamp for strategies and entity modification dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimestampUtc(pub DateTime<Utc>);

impl TimestampUtc {
    /// Creates a timestamp for the current moment, at the log's microsecond precision.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(6))
    }

    /// Returns the timestamp shifted forward by a whole number of seconds.
    /// Fails when the result falls outside the representable range.
    pub fn plus_seconds(&self, seconds: u32) -> Result<Self, LedgerError> {
        self.0
            .checked_add_signed(Duration::seconds(i64::from(seconds)))
            .map(Self)
            .ok_or_else(|| {
                LedgerError::parameter(format!(
                    "{} plus {} seconds is out of range",
                    self.to_log_string(),
                    seconds
                ))
            })
    }

    /// Signed number of seconds from `self` until `later` (negative when `later` is earlier).
    pub fn seconds_until(&self, later: TimestampUtc) -> f64 {
        (later.0 - self.0).num_milliseconds() as f64 / 1000.0
    }

    /// Returns the timestamp as an RFC3339 string.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Formats the timestamp the way the strategy log stores it:
    /// `YYYY-MM-DD HH:MM:SS[.ffffff]+00:00`, with microseconds only when non-zero.
    pub fn to_log_string(&self) -> String {
        if self.0.nanosecond() / 1_000 == 0 {
            self.0.format("%Y-%m-%d %H:%M:%S+00:00").to_string()
        } else {
            self.0.format("%Y-%m-%d %H:%M:%S%.6f+00:00").to_string()
        }
    }

    /// Parses a log timestamp. RFC3339 and offset-less values (assumed UTC) are accepted too.
    pub fn parse_log(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(Self(dt.with_timezone(&Utc)));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(|naive| Self(naive.and_utc()))
    }
}

impl Default for TimestampUtc {
    fn default() -> Self {
        Self::now()
    }
}

impl Display for TimestampUtc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_log_string())
    }
}

impl From<DateTime<Utc>> for TimestampUtc {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

/// Generates a fresh random UID for a backlog or work item.
pub fn generate_uid() -> String {
    Uuid::new_v4().to_string()
}

/// Returns `prefix` if unused, otherwise the first free `prefix N` (N = 1, 2, ...).
pub fn generate_unique_name<'a, I>(prefix: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: Vec<&str> = existing.into_iter().collect();
    let mut candidate = prefix.to_string();
    let mut n = 1;
    while taken.contains(&candidate.as_str()) {
        candidate = format!("{} {}", prefix, n);
        n += 1;
    }
    candidate
}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
