//! Per-occurrence overrides -- exclusions and field patches keyed by
//! [`RecurrenceId`].
//!
//! An override is authored when a user edits or deletes a single occurrence of
//! a series. Edits to the whole series replace the master event's own fields
//! and never produce an override.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::duration_serde;
use crate::generator::Occurrence;
use crate::recurrence_id::RecurrenceId;

/// Overrides of one master event, keyed by the occurrence's original start.
pub type Overrides = BTreeMap<RecurrenceId, Override>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Override {
    /// The occurrence was deleted.
    Excluded,
    /// The occurrence was edited.
    Patch(OverridePatch),
}

/// Field changes for a single occurrence. Unset fields keep the master's value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverridePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Replaces the occurrence's start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<FixedOffset>>,
    /// Replaces the occurrence's duration. Negative values are treated as zero.
    #[serde(
        default,
        rename = "duration_seconds",
        with = "duration_serde::option_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<TimeDelta>,
}

/// An occurrence after its override (if any) has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOccurrence<'a> {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Key derived from the occurrence's original start, even when a patch
    /// moved it.
    pub recurrence_id: RecurrenceId,
    pub patch: Option<&'a OverridePatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Excluded,
    Instance(ResolvedOccurrence<'a>),
}

/// Apply the override stored for `occurrence`, if any.
///
/// Lookup is an exact string match on the derived [`RecurrenceId`]. A key
/// produced with a different format is not found and the occurrence passes
/// through unmodified.
pub fn resolve<'a>(
    occurrence: &Occurrence,
    overrides: &'a Overrides,
    has_timezone: bool,
) -> Resolution<'a> {
    let recurrence_id = RecurrenceId::for_start(&occurrence.start, has_timezone);

    let patch = match overrides.get(&recurrence_id) {
        Some(Override::Excluded) => return Resolution::Excluded,
        Some(Override::Patch(patch)) => Some(patch),
        None => None,
    };

    let (start, end) = match patch {
        Some(patch) => {
            let start = patch.start.unwrap_or(occurrence.start);
            let duration = patch
                .duration
                .map_or_else(|| occurrence.duration(), |d| d.max(TimeDelta::zero()));
            (start, start.checked_add_signed(duration).unwrap_or(start))
        }
        None => (occurrence.start, occurrence.end),
    };

    Resolution::Instance(ResolvedOccurrence {
        start,
        end,
        recurrence_id,
        patch,
    })
}
