//! Master events (stored definitions) and event instances (expansion output).

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::duration_serde;
use crate::overrides::{Override, Overrides, ResolvedOccurrence};
use crate::recurrence_id::RecurrenceId;

/// A stored event definition, as supplied by the data-fetch layer.
///
/// `rule` is the raw RRULE text: the wire may carry rules the engine cannot
/// represent, and those must still render as a single event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterEvent {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: DateTime<FixedOffset>,
    /// IANA label. Its presence selects the local [`RecurrenceId`] format; it
    /// never changes the arithmetic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(rename = "duration_seconds", with = "duration_serde::seconds")]
    pub duration: TimeDelta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default, skip_serializing_if = "Overrides::is_empty")]
    pub overrides: Overrides,
}

impl MasterEvent {
    /// Create a non-recurring event. The duration is derived from `end` once;
    /// an `end` before `start` yields a zero duration.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            location: None,
            start,
            timezone: None,
            duration: (end - start).max(TimeDelta::zero()),
            rule: None,
            overrides: Overrides::new(),
        }
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_override(mut self, recurrence_id: impl Into<RecurrenceId>, value: Override) -> Self {
        self.overrides.insert(recurrence_id.into(), value);
        self
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.start
            .checked_add_signed(self.duration)
            .unwrap_or(self.start)
    }

    pub fn has_timezone(&self) -> bool {
        self.timezone.as_deref().is_some_and(|tz| !tz.trim().is_empty())
    }

    /// The rule text, if the event has a non-blank one.
    pub fn rule_text(&self) -> Option<&str> {
        self.rule.as_deref().filter(|rule| !rule.trim().is_empty())
    }

    /// The override key for an occurrence that originally starts at `start`.
    pub fn recurrence_id_for(&self, start: &DateTime<FixedOffset>) -> RecurrenceId {
        RecurrenceId::for_start(start, self.has_timezone())
    }
}

/// A materialized event ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInstance {
    /// `master_id#recurrence_id` for recurrence instances, the master's id
    /// otherwise.
    pub id: String,
    pub master_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub is_recurring_event_instance: bool,
    /// Key for a "this occurrence only" override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_id: Option<RecurrenceId>,
    /// The master's rule text, for "edit entire series".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl EventInstance {
    /// The master event itself, unchanged.
    pub fn passthrough(master: &MasterEvent) -> Self {
        Self {
            id: master.id.clone(),
            master_id: master.id.clone(),
            title: master.title.clone(),
            description: master.description.clone(),
            location: master.location.clone(),
            start: master.start,
            end: master.end(),
            timezone: master.timezone.clone(),
            is_recurring_event_instance: false,
            recurrence_id: None,
            rule: master.rule.clone(),
        }
    }

    /// One occurrence of `master`, with its patch (if any) applied.
    pub fn occurrence(master: &MasterEvent, resolved: ResolvedOccurrence<'_>) -> Self {
        let patch = resolved.patch;
        Self {
            id: Self::instance_id(&master.id, &resolved.recurrence_id),
            master_id: master.id.clone(),
            title: patch
                .and_then(|p| p.title.clone())
                .unwrap_or_else(|| master.title.clone()),
            description: patch
                .and_then(|p| p.description.clone())
                .or_else(|| master.description.clone()),
            location: patch
                .and_then(|p| p.location.clone())
                .or_else(|| master.location.clone()),
            start: resolved.start,
            end: resolved.end,
            timezone: master.timezone.clone(),
            is_recurring_event_instance: true,
            recurrence_id: Some(resolved.recurrence_id),
            rule: master.rule.clone(),
        }
    }

    pub fn instance_id(master_id: &str, recurrence_id: &RecurrenceId) -> String {
        format!("{}#{}", master_id, recurrence_id)
    }
}
