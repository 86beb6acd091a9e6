//! Translation between the user-facing recurrence pattern and the canonical
//! rule text.
//!
//! A [`RecurrencePattern`] is what a "repeat" form edits: a frequency that
//! may be `none`, an interval, how the series ends, and the one predicate list
//! that belongs to the chosen frequency. The canonical form is RRULE text, as
//! stored on master events.
//!
//! ```
//! use recurrence_engine::pattern::{from_canonical, to_canonical, PatternFrequency, RecurrencePattern};
//!
//! let pattern = RecurrencePattern {
//!     frequency: PatternFrequency::Monthly,
//!     month_days: vec![15],
//!     ..RecurrencePattern::none()
//! };
//! let canonical = to_canonical(&pattern).unwrap().unwrap();
//! assert_eq!(canonical, "FREQ=MONTHLY;BYMONTHDAY=15");
//! assert_eq!(from_canonical(&canonical).unwrap(), pattern);
//! ```

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleError};
use crate::rule::{
    check_month, check_month_day, normalize_weekdays, Frequency, RecurrenceRule, Termination,
    Until,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternFrequency {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl From<Frequency> for PatternFrequency {
    fn from(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Daily => PatternFrequency::Daily,
            Frequency::Weekly => PatternFrequency::Weekly,
            Frequency::Monthly => PatternFrequency::Monthly,
            Frequency::Yearly => PatternFrequency::Yearly,
        }
    }
}

impl PatternFrequency {
    fn to_frequency(self) -> Option<Frequency> {
        match self {
            PatternFrequency::None => None,
            PatternFrequency::Daily => Some(Frequency::Daily),
            PatternFrequency::Weekly => Some(Frequency::Weekly),
            PatternFrequency::Monthly => Some(Frequency::Monthly),
            PatternFrequency::Yearly => Some(Frequency::Yearly),
        }
    }
}

/// How a pattern's series ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternEnd {
    #[default]
    Never,
    After {
        count: u32,
    },
    Until {
        until: Until,
    },
}

/// A recurrence as a "repeat" form edits it.
///
/// Deserialized patterns are validated and normalized: predicate lists are
/// sorted and deduplicated, and out-of-range months or month days are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PatternFields")]
pub struct RecurrencePattern {
    pub frequency: PatternFrequency,
    pub interval: u32,
    pub ends: PatternEnd,
    /// Used by weekly patterns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub week_days: Vec<Weekday>,
    /// Used by monthly patterns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub month_days: Vec<i8>,
    /// Used by yearly patterns.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<u8>,
}

/// Wire shape of [`RecurrencePattern`] before validation.
#[derive(Deserialize)]
struct PatternFields {
    #[serde(default)]
    frequency: PatternFrequency,
    #[serde(default = "default_interval")]
    interval: u32,
    #[serde(default)]
    ends: PatternEnd,
    #[serde(default)]
    week_days: Vec<Weekday>,
    #[serde(default)]
    month_days: Vec<i8>,
    #[serde(default)]
    months: Vec<u8>,
}

impl TryFrom<PatternFields> for RecurrencePattern {
    type Error = RuleError;

    fn try_from(fields: PatternFields) -> Result<Self> {
        let month_days = fields
            .month_days
            .into_iter()
            .map(check_month_day)
            .collect::<Result<Vec<_>>>()?;
        let months = fields
            .months
            .into_iter()
            .map(check_month)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            frequency: fields.frequency,
            interval: fields.interval.max(1),
            ends: fields.ends,
            week_days: normalize_weekdays(fields.week_days),
            month_days: sorted_unique(month_days),
            months: sorted_unique(months),
        })
    }
}

fn default_interval() -> u32 {
    1
}

fn sorted_unique<T: Ord>(mut items: Vec<T>) -> Vec<T> {
    items.sort_unstable();
    items.dedup();
    items
}

impl Default for RecurrencePattern {
    fn default() -> Self {
        Self::none()
    }
}

impl RecurrencePattern {
    /// A pattern that does not repeat.
    pub fn none() -> Self {
        Self {
            frequency: PatternFrequency::None,
            interval: 1,
            ends: PatternEnd::Never,
            week_days: Vec::new(),
            month_days: Vec::new(),
            months: Vec::new(),
        }
    }

    /// The pattern as it comes back from a canonical round trip: interval at
    /// least 1, the frequency's own predicate list sorted and deduplicated,
    /// and the other lists cleared.
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut pattern = Self {
            frequency: self.frequency,
            interval: self.interval.max(1),
            ends: self.ends,
            ..Self::none()
        };
        match self.frequency {
            PatternFrequency::None | PatternFrequency::Daily => {}
            PatternFrequency::Weekly => pattern.week_days = normalize_weekdays(self.week_days),
            PatternFrequency::Monthly => pattern.month_days = sorted_unique(self.month_days),
            PatternFrequency::Yearly => pattern.months = sorted_unique(self.months),
        }
        pattern
    }

    /// The typed rule for this pattern, or `None` when it does not repeat.
    ///
    /// Fails with [`RuleError::MalformedRule`] when the frequency's predicate
    /// list holds a value the canonical text cannot carry (`BYMONTH=13`,
    /// `BYMONTHDAY=0`).
    pub fn to_rule(&self) -> Result<Option<RecurrenceRule>> {
        let Some(frequency) = self.frequency.to_frequency() else {
            return Ok(None);
        };
        let mut rule = RecurrenceRule::new(frequency).with_interval(self.interval);
        rule = match self.ends {
            PatternEnd::Never => rule,
            PatternEnd::After { count } => rule.with_count(count),
            PatternEnd::Until { until } => rule.with_until(until),
        };
        let rule = match frequency {
            Frequency::Daily => rule,
            Frequency::Weekly => rule.with_days(self.week_days.iter().copied()),
            Frequency::Monthly => rule.with_month_days(
                self.month_days
                    .iter()
                    .map(|day| check_month_day(*day))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Frequency::Yearly => rule.with_months(
                self.months
                    .iter()
                    .map(|month| check_month(*month))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(Some(rule))
    }
}

impl From<&RecurrenceRule> for RecurrencePattern {
    /// Only the predicate list matching the rule's frequency is carried over.
    fn from(rule: &RecurrenceRule) -> Self {
        let mut pattern = Self {
            frequency: rule.frequency.into(),
            interval: rule.interval.max(1),
            ends: match rule.termination {
                Termination::Never => PatternEnd::Never,
                Termination::After(count) => PatternEnd::After { count },
                Termination::Until(until) => PatternEnd::Until { until },
            },
            ..Self::none()
        };
        match rule.frequency {
            Frequency::Daily => {}
            Frequency::Weekly => pattern.week_days = normalize_weekdays(rule.by_day.iter().copied()),
            Frequency::Monthly => pattern.month_days = rule.by_month_day.iter().copied().collect(),
            Frequency::Yearly => pattern.months = rule.by_month.iter().copied().collect(),
        }
        pattern
    }
}

/// Canonical RRULE text for `pattern`, or `None` when it does not repeat.
///
/// `INTERVAL=1` is never written. Out-of-range predicates are rejected rather
/// than written as text the parser would refuse.
pub fn to_canonical(pattern: &RecurrencePattern) -> Result<Option<String>> {
    Ok(pattern.to_rule()?.map(|rule| rule.to_string()))
}

/// Parse canonical RRULE text into a pattern.
///
/// Sub-daily frequencies are valid on the wire but have no pattern; they are
/// rejected with [`RuleError::UnsupportedFrequency`].
pub fn from_canonical(rule: &str) -> Result<RecurrencePattern> {
    match rule.parse::<RecurrenceRule>() {
        Ok(parsed) => Ok(RecurrencePattern::from(&parsed)),
        Err(err) => {
            match &err {
                RuleError::UnsupportedFrequency(freq) => {
                    tracing::warn!(rule, frequency = %freq, "recurrence frequency has no pattern");
                }
                RuleError::MalformedRule(reason) => {
                    tracing::warn!(rule, reason = %reason, "malformed recurrence rule");
                }
            }
            Err(err)
        }
    }
}
