//! # recurrence-engine
//!
//! Expands recurring calendar events into the concrete instances of a query
//! window.
//!
//! A master event carries a start, a duration, an optional RRULE and a map of
//! per-occurrence overrides. [`expand`] steps the rule forward, drops excluded
//! occurrences, applies field patches and clips the result to the window. The
//! engine is stateless and does no I/O, so it can be called for every view
//! change.
//!
//! ```
//! use chrono::DateTime;
//! use recurrence_engine::{expand, ExpansionOptions, MasterEvent, Override};
//!
//! let start = DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z").unwrap();
//! let end = DateTime::parse_from_rfc3339("2024-01-01T09:30:00Z").unwrap();
//! let standup = MasterEvent::new("standup", "Standup", start, end)
//!     .with_rule("FREQ=WEEKLY;COUNT=3")
//!     .with_override("2024-01-08T09:00:00Z", Override::Excluded);
//!
//! let window_end = DateTime::parse_from_rfc3339("2024-01-31T00:00:00Z").unwrap();
//! let expansion = expand(&[standup], start, window_end, &ExpansionOptions::default());
//!
//! let ids: Vec<&str> = expansion.instances.iter().map(|i| i.id.as_str()).collect();
//! assert_eq!(ids, ["standup#2024-01-01T09:00:00Z", "standup#2024-01-15T09:00:00Z"]);
//! ```
//!
//! ## Modules
//!
//! - [`rule`] -- typed recurrence rule and its canonical RRULE text
//! - [`pattern`] -- user-facing recurrence pattern ⇄ canonical rule
//! - [`generator`] -- rule → ordered occurrence spans
//! - [`recurrence_id`] -- override join keys
//! - [`overrides`] -- exclusions and per-occurrence patches
//! - [`event`] -- master events and event instances
//! - [`expansion`] -- the expansion service and its diagnostics
//! - [`error`] -- error types

mod duration_serde;

pub mod error;
pub mod event;
pub mod expansion;
pub mod generator;
pub mod overrides;
pub mod pattern;
pub mod recurrence_id;
pub mod rule;

pub use error::RuleError;
pub use event::{EventInstance, MasterEvent};
pub use expansion::{expand, Diagnostic, DiagnosticKind, Expansion, ExpansionOptions};
pub use generator::{generate, Generated, GeneratorConfig, Occurrence, WeeklyMatching};
pub use overrides::{resolve, Override, OverridePatch, Overrides, Resolution};
pub use pattern::{from_canonical, to_canonical, PatternEnd, PatternFrequency, RecurrencePattern};
pub use recurrence_id::RecurrenceId;
pub use rule::{Frequency, RecurrenceRule, Termination, Until};
