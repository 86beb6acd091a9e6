//! Occurrence generation -- step a [`RecurrenceRule`] forward from the series
//! start and emit every matching `{start, end}` span up to a window end.
//!
//! Stepping is wall-clock arithmetic on the start's local time. The start's
//! fixed UTC offset is re-attached to every candidate, so no timezone database
//! is involved. Month and year steps are measured from the series start
//! (`start + n * interval`), which keeps a 31st-of-the-month series from
//! drifting after a short month.
//!
//! The loop is bounded by [`GeneratorConfig::max_iterations`]. Reaching the
//! bound is not an error: [`Generated::truncated`] is set and the occurrences
//! produced so far are returned.

use chrono::{
    DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeDelta, TimeZone,
};
use serde::{Deserialize, Serialize};

use crate::rule::{Frequency, RecurrenceRule, Termination};

/// Iteration bound used by [`GeneratorConfig::default`].
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// One concrete time span produced by a rule, before overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Occurrence {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// How weekly rules with `BYDAY` pick candidates inside a stepping period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeeklyMatching {
    /// One candidate per period: the series start's weekday, stepped by whole
    /// weeks. It is emitted only if that weekday is listed, so additional
    /// `BYDAY` entries never surface.
    #[default]
    PeriodStart,
    /// Every listed weekday of the (Monday-based) week containing the period
    /// candidate, skipping days before the series start.
    EveryListedDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Upper bound on evaluated candidates per call.
    pub max_iterations: usize,
    pub weekly_matching: WeeklyMatching,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            weekly_matching: WeeklyMatching::default(),
        }
    }
}

impl GeneratorConfig {
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_weekly_matching(mut self, weekly_matching: WeeklyMatching) -> Self {
        self.weekly_matching = weekly_matching;
        self
    }
}

/// Generator output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Generated {
    /// Occurrences in generation order (strictly increasing starts).
    pub occurrences: Vec<Occurrence>,
    /// The iteration bound stopped generation before the rule or the window did.
    pub truncated: bool,
}

/// Generate the occurrences of `rule` starting at `start`, up to and including
/// `window_end`.
///
/// Occurrences before any later window start are still produced: `COUNT`
/// must be counted from the series start. Clipping to a window start is the
/// caller's job.
pub fn generate(
    rule: &RecurrenceRule,
    start: DateTime<FixedOffset>,
    window_end: DateTime<FixedOffset>,
    duration: TimeDelta,
    config: &GeneratorConfig,
) -> Generated {
    let mut generated = Generated::default();
    let origin = start.naive_local();
    let offset = *start.offset();
    let interval = rule.interval.max(1);
    let mut iterations = 0usize;

    let mut period: u32 = 0;
    'periods: loop {
        let Some(anchor) = period
            .checked_mul(interval)
            .and_then(|steps| advance(rule.frequency, origin, steps))
        else {
            break;
        };

        for local in period_candidates(rule, anchor, config.weekly_matching) {
            let Some(candidate) = offset.from_local_datetime(&local).single() else {
                break 'periods;
            };
            if candidate > window_end || is_terminated(rule, &candidate, &generated) {
                break 'periods;
            }
            if iterations >= config.max_iterations {
                tracing::debug!(
                    max_iterations = config.max_iterations,
                    rule = %rule,
                    "iteration cap reached, returning partial result"
                );
                generated.truncated = true;
                break 'periods;
            }
            iterations += 1;

            if candidate < start || !matches(rule, &local) {
                continue;
            }
            generated.occurrences.push(Occurrence {
                start: candidate,
                end: candidate.checked_add_signed(duration).unwrap_or(candidate),
            });
        }

        period = match period.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    generated
}

/// `origin` advanced by `steps` frequency units, or `None` when the result
/// leaves chrono's representable range.
fn advance(frequency: Frequency, origin: NaiveDateTime, steps: u32) -> Option<NaiveDateTime> {
    match frequency {
        Frequency::Daily => origin.checked_add_days(Days::new(u64::from(steps))),
        Frequency::Weekly => origin.checked_add_days(Days::new(u64::from(steps) * 7)),
        Frequency::Monthly => origin.checked_add_months(Months::new(steps)),
        Frequency::Yearly => origin.checked_add_months(Months::new(steps.checked_mul(12)?)),
    }
}

/// Local candidates to evaluate for one stepping period, in increasing order.
fn period_candidates(
    rule: &RecurrenceRule,
    anchor: NaiveDateTime,
    weekly_matching: WeeklyMatching,
) -> Vec<NaiveDateTime> {
    match (rule.frequency, weekly_matching) {
        (Frequency::Weekly, WeeklyMatching::EveryListedDay) if !rule.by_day.is_empty() => {
            let from_monday = u64::from(anchor.weekday().num_days_from_monday());
            let Some(monday) = anchor.checked_sub_days(Days::new(from_monday)) else {
                return Vec::new();
            };
            rule.by_day
                .iter()
                .filter_map(|day| {
                    monday.checked_add_days(Days::new(u64::from(day.num_days_from_monday())))
                })
                .collect()
        }
        _ => vec![anchor],
    }
}

fn is_terminated(
    rule: &RecurrenceRule,
    candidate: &DateTime<FixedOffset>,
    generated: &Generated,
) -> bool {
    match &rule.termination {
        Termination::Never => false,
        Termination::After(count) => generated.occurrences.len() >= *count as usize,
        Termination::Until(until) => !until.admits(candidate),
    }
}

/// Frequency-specific predicate. Predicates of other frequencies are ignored.
fn matches(rule: &RecurrenceRule, local: &NaiveDateTime) -> bool {
    match rule.frequency {
        Frequency::Daily => true,
        Frequency::Weekly => rule.by_day.is_empty() || rule.by_day.contains(&local.weekday()),
        Frequency::Monthly => {
            rule.by_month_day.is_empty()
                || rule
                    .by_month_day
                    .iter()
                    .any(|day| month_day_matches(*day, local.date()))
        }
        Frequency::Yearly => {
            rule.by_month.is_empty()
                || u8::try_from(local.month()).is_ok_and(|month| rule.by_month.contains(&month))
        }
    }
}

fn month_day_matches(day: i8, date: NaiveDate) -> bool {
    let actual = i64::from(date.day());
    if day > 0 {
        return actual == i64::from(day);
    }
    days_in_month(date).is_some_and(|len| len + i64::from(day) + 1 == actual)
}

fn days_in_month(date: NaiveDate) -> Option<i64> {
    let first = date.with_day(1)?;
    let next = first.checked_add_months(Months::new(1))?;
    Some((next - first).num_days())
}
