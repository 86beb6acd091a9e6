//! Canonical recurrence rule -- the typed form of an RRULE value.
//!
//! A [`RecurrenceRule`] covers the subset of RFC 5545 the calendar model
//! represents: `DAILY`, `WEEKLY`, `MONTHLY` and `YEARLY` frequencies, an
//! interval, one termination mode, and the `BYDAY` / `BYMONTHDAY` / `BYMONTH`
//! predicates. Its canonical text form is the RRULE value syntax:
//!
//! ```
//! use recurrence_engine::{Frequency, RecurrenceRule, Termination};
//!
//! let rule: RecurrenceRule = "FREQ=DAILY;COUNT=3".parse().unwrap();
//! assert_eq!(rule.frequency, Frequency::Daily);
//! assert_eq!(rule.termination, Termination::After(3));
//! assert_eq!(rule.to_string(), "FREQ=DAILY;COUNT=3");
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SubsecRound, Utc, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, RuleError};

const DATE_FORMAT: &str = "%Y%m%d";
const DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
const ISO_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Recurrence period unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            "SECONDLY" | "MINUTELY" | "HOURLY" => {
                Err(RuleError::UnsupportedFrequency(s.to_ascii_uppercase()))
            }
            other => Err(RuleError::malformed(format!("unknown FREQ '{}'", other))),
        }
    }
}

/// Upper bound of an `UNTIL` terminated rule. The bound is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Until {
    /// `UNTIL=20240401` -- every candidate on or before that local date.
    Date(NaiveDate),
    /// `UNTIL=20240401T000000` -- compared against the candidate's wall clock.
    Floating(NaiveDateTime),
    /// `UNTIL=20240401T000000Z` -- compared by instant.
    Utc(DateTime<Utc>),
}

impl Until {
    /// Whether `candidate` still lies within the bound.
    pub fn admits(&self, candidate: &DateTime<FixedOffset>) -> bool {
        match self {
            Until::Date(date) => candidate.naive_local().date() <= *date,
            Until::Floating(bound) => candidate.naive_local() <= *bound,
            Until::Utc(bound) => candidate.with_timezone(&Utc) <= *bound,
        }
    }

    fn parse(value: &str) -> Result<Self> {
        let bad = || RuleError::malformed(format!("invalid UNTIL '{}'", value));
        if value.len() == 8 {
            return NaiveDate::parse_from_str(value, DATE_FORMAT)
                .map(Until::Date)
                .map_err(|_| bad());
        }
        match value
            .strip_suffix('Z')
            .or_else(|| value.strip_suffix('z'))
        {
            Some(utc) => NaiveDateTime::parse_from_str(utc, DATE_TIME_FORMAT)
                .map(|naive| Until::Utc(naive.and_utc()))
                .map_err(|_| bad()),
            None => NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT)
                .map(Until::Floating)
                .map_err(|_| bad()),
        }
    }

    /// Parse the ISO 8601 form used in JSON.
    fn parse_iso(value: &str) -> Result<Self> {
        if let Ok(date) = NaiveDate::parse_from_str(value, ISO_DATE_FORMAT) {
            return Ok(Until::Date(date));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, ISO_DATE_TIME_FORMAT) {
            return Ok(Until::Floating(naive));
        }
        DateTime::parse_from_rfc3339(value)
            .map(|instant| Until::Utc(instant.with_timezone(&Utc).trunc_subsecs(0)))
            .map_err(|_| {
                RuleError::malformed(format!(
                    "invalid UNTIL '{}': expected YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS or an RFC 3339 instant",
                    value
                ))
            })
    }
}

/// `Until` in JSON uses ISO 8601: `2024-04-01`, `2024-04-01T00:00:00` or
/// `2024-04-01T00:00:00Z`. An explicit offset (`+02:00`) is accepted on input
/// and stored as the UTC instant.
impl Serialize for Until {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Until::Date(date) => serializer.collect_str(&date.format(ISO_DATE_FORMAT)),
            Until::Floating(bound) => serializer.collect_str(&bound.format(ISO_DATE_TIME_FORMAT)),
            Until::Utc(bound) => serializer.collect_str(&bound.format("%Y-%m-%dT%H:%M:%SZ")),
        }
    }
}

impl<'de> Deserialize<'de> for Until {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Until::parse_iso(text.trim()).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Until {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Until::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Until::Floating(bound) => write!(f, "{}", bound.format(DATE_TIME_FORMAT)),
            Until::Utc(bound) => write!(f, "{}Z", bound.format(DATE_TIME_FORMAT)),
        }
    }
}

/// How a rule stops producing occurrences. Exactly one mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Termination {
    #[default]
    Never,
    /// Stop after this many emitted occurrences.
    After(u32),
    Until(Until),
}

/// A validated recurrence rule.
///
/// Predicates that do not belong to `frequency` are kept (so the rule
/// round-trips) but the generator ignores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Number of frequency units between periods. Always at least 1.
    pub interval: u32,
    pub termination: Termination,
    /// `BYDAY`, only meaningful for weekly rules. Sorted Monday-first.
    pub by_day: Vec<Weekday>,
    /// `BYMONTHDAY`, only meaningful for monthly rules. Negative values count
    /// back from the end of the month (`-1` is the last day).
    pub by_month_day: BTreeSet<i8>,
    /// `BYMONTH`, only meaningful for yearly rules.
    pub by_month: BTreeSet<u8>,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            termination: Termination::Never,
            by_day: Vec::new(),
            by_month_day: BTreeSet::new(),
            by_month: BTreeSet::new(),
        }
    }

    /// Set the interval. Zero is treated as one.
    #[must_use]
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval.max(1);
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.termination = Termination::After(count);
        self
    }

    #[must_use]
    pub fn with_until(mut self, until: Until) -> Self {
        self.termination = Termination::Until(until);
        self
    }

    #[must_use]
    pub fn with_days(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.by_day = normalize_weekdays(days);
        self
    }

    #[must_use]
    pub fn with_month_days(mut self, days: impl IntoIterator<Item = i8>) -> Self {
        self.by_month_day = days.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_months(mut self, months: impl IntoIterator<Item = u8>) -> Self {
        self.by_month = months.into_iter().collect();
        self
    }
}

/// Validate a `BYMONTHDAY` entry: `1..=31` or `-31..=-1`.
pub(crate) fn check_month_day(day: i8) -> Result<i8> {
    if day == 0 || !(-31..=31).contains(&day) {
        return Err(RuleError::malformed(format!(
            "BYMONTHDAY out of range: {}",
            day
        )));
    }
    Ok(day)
}

/// Validate a `BYMONTH` entry: `1..=12`.
pub(crate) fn check_month(month: u8) -> Result<u8> {
    if !(1..=12).contains(&month) {
        return Err(RuleError::malformed(format!("BYMONTH out of range: {}", month)));
    }
    Ok(month)
}

/// Sort weekdays Monday-first and drop duplicates.
pub(crate) fn normalize_weekdays(days: impl IntoIterator<Item = Weekday>) -> Vec<Weekday> {
    let mut days: Vec<Weekday> = days.into_iter().collect();
    days.sort_by_key(|d| d.num_days_from_monday());
    days.dedup();
    days
}

pub(crate) fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn parse_weekday(code: &str) -> Result<Weekday> {
    match code.trim().to_ascii_uppercase().as_str() {
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        "SU" => Ok(Weekday::Sun),
        other => Err(RuleError::malformed(format!(
            "unsupported BYDAY entry '{}'",
            other
        ))),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RuleError::malformed(format!("invalid {} '{}'", key, value)))
}

fn parse_list<T>(value: &str, parse: impl Fn(&str) -> Result<T>) -> Result<Vec<T>> {
    value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(parse)
        .collect()
}

fn join<T>(items: impl IntoIterator<Item = T>, render: impl Fn(T) -> String) -> String {
    items.into_iter().map(render).collect::<Vec<_>>().join(",")
}

impl fmt::Display for RecurrenceRule {
    /// Writes the canonical text: fixed key order, `INTERVAL` omitted when 1,
    /// empty predicate sets omitted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency)?;
        if self.interval > 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if !self.by_month.is_empty() {
            write!(f, ";BYMONTH={}", join(&self.by_month, |m| m.to_string()))?;
        }
        if !self.by_month_day.is_empty() {
            write!(
                f,
                ";BYMONTHDAY={}",
                join(&self.by_month_day, |d| d.to_string())
            )?;
        }
        if !self.by_day.is_empty() {
            write!(
                f,
                ";BYDAY={}",
                join(&self.by_day, |d| weekday_code(*d).to_string())
            )?;
        }
        match &self.termination {
            Termination::Never => Ok(()),
            Termination::After(count) => write!(f, ";COUNT={}", count),
            Termination::Until(until) => write!(f, ";UNTIL={}", until),
        }
    }
}

impl FromStr for RecurrenceRule {
    type Err = RuleError;

    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let body = text
            .get(..6)
            .filter(|prefix| prefix.eq_ignore_ascii_case("RRULE:"))
            .map_or(text, |_| &text[6..]);

        let mut frequency = None;
        let mut interval = 1;
        let mut count = None;
        let mut until = None;
        let mut by_day = Vec::new();
        let mut by_month_day = BTreeSet::new();
        let mut by_month = BTreeSet::new();

        for part in body.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| RuleError::malformed(format!("expected KEY=VALUE, got '{}'", part)))?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();
            match key.as_str() {
                "FREQ" => frequency = Some(value.parse::<Frequency>()?),
                "INTERVAL" => {
                    interval = parse_number::<u32>("INTERVAL", value)?;
                    if interval == 0 {
                        return Err(RuleError::malformed("INTERVAL must be positive"));
                    }
                }
                "COUNT" => count = Some(parse_number::<u32>("COUNT", value)?),
                "UNTIL" => until = Some(Until::parse(value)?),
                "BYDAY" => by_day = parse_list(value, parse_weekday)?,
                "BYMONTHDAY" => {
                    for day in parse_list(value, |v| parse_number::<i8>("BYMONTHDAY", v))? {
                        by_month_day.insert(check_month_day(day)?);
                    }
                }
                "BYMONTH" => {
                    for month in parse_list(value, |v| parse_number::<u8>("BYMONTH", v))? {
                        by_month.insert(check_month(month)?);
                    }
                }
                other => {
                    tracing::debug!(key = other, rule = text, "ignoring unmodeled RRULE part");
                }
            }
        }

        let frequency = frequency.ok_or_else(|| RuleError::malformed("missing FREQ"))?;
        let termination = match (count, until) {
            (Some(_), Some(_)) => {
                return Err(RuleError::malformed("COUNT and UNTIL are mutually exclusive"))
            }
            (Some(count), None) => Termination::After(count),
            (None, Some(until)) => Termination::Until(until),
            (None, None) => Termination::Never,
        };

        Ok(Self {
            frequency,
            interval,
            termination,
            by_day: normalize_weekdays(by_day),
            by_month_day,
            by_month,
        })
    }
}

impl Serialize for RecurrenceRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecurrenceRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
