//! Expansion service -- turn master events into the instance list for a query
//! window.
//!
//! Each recurring master is run through [`generate`] and every occurrence
//! through [`resolve`]. Exclusions are dropped, and the survivors are clipped to
//! `[window_start, window_end]`. Non-recurring masters pass through unchanged.
//!
//! Expansion never fails. A master whose rule cannot be used is rendered as a
//! single non-recurring event, and the reason is recorded as a [`Diagnostic`].

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::event::{EventInstance, MasterEvent};
use crate::generator::{generate, GeneratorConfig, Occurrence};
use crate::overrides::{resolve, Resolution};
use crate::recurrence_id::RecurrenceId;
use crate::rule::RecurrenceRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionOptions {
    pub generator: GeneratorConfig,
    /// Report override keys that match no generated occurrence.
    pub report_orphaned_overrides: bool,
}

/// Why an expansion degraded for one master event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub event_id: String,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The rule uses a frequency the model does not represent; the event was
    /// rendered as non-recurring.
    UnsupportedFrequency { frequency: String },
    /// The rule could not be parsed; the event was rendered as non-recurring.
    MalformedRule { reason: String },
    /// Generation stopped at the iteration bound; the result may be partial.
    IterationCapReached { max_iterations: usize },
    /// An override key lies within the generated range but matched no
    /// occurrence, typically because it was written in another format.
    OrphanedOverride { recurrence_id: RecurrenceId },
}

impl From<RuleError> for DiagnosticKind {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::UnsupportedFrequency(frequency) => {
                DiagnosticKind::UnsupportedFrequency { frequency }
            }
            RuleError::MalformedRule(reason) => DiagnosticKind::MalformedRule { reason },
        }
    }
}

/// Expansion output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Expansion {
    /// Non-recurring events first (input order), then the instances of each
    /// recurring master (input order, each in generation order).
    pub instances: Vec<EventInstance>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Expansion {
    /// Whether every master expanded without degradation.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Expand `masters` into the instances that fall in `[window_start, window_end]`.
pub fn expand(
    masters: &[MasterEvent],
    window_start: DateTime<FixedOffset>,
    window_end: DateTime<FixedOffset>,
    options: &ExpansionOptions,
) -> Expansion {
    let mut single = Vec::new();
    let mut recurring = Vec::new();
    let mut diagnostics = Vec::new();

    for master in masters {
        let Some(text) = master.rule_text() else {
            single.push(EventInstance::passthrough(master));
            continue;
        };

        match text.parse::<RecurrenceRule>() {
            Ok(rule) => {
                let before = recurring.len();
                expand_series(
                    master,
                    &rule,
                    window_start,
                    window_end,
                    options,
                    &mut recurring,
                    &mut diagnostics,
                );
                tracing::trace!(
                    event_id = %master.id,
                    instances = recurring.len() - before,
                    "expanded recurring event"
                );
            }
            Err(err) => {
                tracing::warn!(
                    event_id = %master.id,
                    rule = text,
                    error = %err,
                    "unusable recurrence rule, treating event as non-recurring"
                );
                diagnostics.push(Diagnostic {
                    event_id: master.id.clone(),
                    kind: err.into(),
                });
                single.push(EventInstance::passthrough(master));
            }
        }
    }

    single.append(&mut recurring);
    Expansion {
        instances: single,
        diagnostics,
    }
}

fn expand_series(
    master: &MasterEvent,
    rule: &RecurrenceRule,
    window_start: DateTime<FixedOffset>,
    window_end: DateTime<FixedOffset>,
    options: &ExpansionOptions,
    instances: &mut Vec<EventInstance>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let generated = generate(
        rule,
        master.start,
        window_end,
        master.duration,
        &options.generator,
    );
    if generated.truncated {
        diagnostics.push(Diagnostic {
            event_id: master.id.clone(),
            kind: DiagnosticKind::IterationCapReached {
                max_iterations: options.generator.max_iterations,
            },
        });
    }

    let has_timezone = master.has_timezone();
    for occurrence in &generated.occurrences {
        let Resolution::Instance(resolved) = resolve(occurrence, &master.overrides, has_timezone)
        else {
            continue;
        };
        if resolved.start < window_start || resolved.start > window_end {
            continue;
        }
        instances.push(EventInstance::occurrence(master, resolved));
    }

    if options.report_orphaned_overrides {
        let range_end = if generated.truncated {
            generated
                .occurrences
                .last()
                .map_or(master.start, |last| last.start)
        } else {
            window_end
        };
        for recurrence_id in orphaned_overrides(master, &generated.occurrences, range_end) {
            tracing::warn!(
                event_id = %master.id,
                recurrence_id = %recurrence_id,
                "override matches no occurrence"
            );
            diagnostics.push(Diagnostic {
                event_id: master.id.clone(),
                kind: DiagnosticKind::OrphanedOverride { recurrence_id },
            });
        }
    }
}

/// Override keys inside `[master.start, range_end]` that no generated
/// occurrence produced, in key order.
fn orphaned_overrides(
    master: &MasterEvent,
    occurrences: &[Occurrence],
    range_end: DateTime<FixedOffset>,
) -> Vec<RecurrenceId> {
    let generated: BTreeSet<RecurrenceId> = occurrences
        .iter()
        .map(|occurrence| master.recurrence_id_for(&occurrence.start))
        .collect();
    let offset = master.start.offset();

    master
        .overrides
        .keys()
        .filter(|key| !generated.contains(*key))
        .filter(|key| {
            key.to_instant(offset)
                .is_some_and(|at| at >= master.start && at <= range_end)
        })
        .cloned()
        .collect()
}
