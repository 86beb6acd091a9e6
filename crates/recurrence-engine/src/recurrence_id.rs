//! Recurrence identifiers -- the join key between generated occurrences and
//! stored overrides.
//!
//! The key is derived from an occurrence's *original* start:
//!
//! - master event with a timezone label: the naive local wall clock,
//!   `2024-01-08T09:00:00`
//! - master event without one: the UTC instant, `2024-01-08T09:00:00Z`
//!
//! Overrides are matched by exact string equality, so the same function must
//! produce the key at generation time and at authoring time. Everything goes
//! through [`RecurrenceId::for_start`].

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecurrenceId(String);

impl RecurrenceId {
    /// Derive the key for an occurrence that originally started at `start`.
    pub fn for_start(start: &DateTime<FixedOffset>, has_timezone: bool) -> Self {
        let key = if has_timezone {
            start.naive_local().format(LOCAL_FORMAT).to_string()
        } else {
            start.with_timezone(&Utc).format(UTC_FORMAT).to_string()
        };
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the key as an instant, using `offset` for local keys.
    ///
    /// Returns `None` for keys in neither format. Used to tell a mismatched
    /// override key apart from one that simply lies outside the generated range.
    pub fn to_instant(&self, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&self.0, UTC_FORMAT) {
            return Some(naive.and_utc().with_timezone(offset));
        }
        NaiveDateTime::parse_from_str(&self.0, LOCAL_FORMAT)
            .ok()
            .and_then(|naive| offset.from_local_datetime(&naive).single())
    }
}

impl fmt::Display for RecurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RecurrenceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecurrenceId {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for RecurrenceId {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}
