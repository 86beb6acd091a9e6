//! WASM bindings for recurrence-engine.
//!
//! Exposes event expansion and rule translation to JavaScript via
//! `wasm-bindgen`. Complex values cross the boundary as JSON strings and use
//! the same shapes as the engine's serde types.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p recurrence-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir pkg/ \
//!   target/wasm32-unknown-unknown/release/recurrence_engine_wasm.wasm
//! ```

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use recurrence_engine::{
    expand, from_canonical, to_canonical, ExpansionOptions, MasterEvent, RecurrenceId,
    RecurrencePattern,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse an ISO 8601 datetime string.
///
/// Accepts RFC 3339 (with offset, e.g. "2026-02-17T14:00:00+01:00") and naive
/// local time (e.g. "2026-02-17T14:00:00"), which is interpreted as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc().fixed_offset())
        .map_err(|e| format!("Invalid datetime '{}': {}", s, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn expand_events_json(
    events_json: &str,
    window_start: &str,
    window_end: &str,
    options_json: Option<&str>,
) -> Result<String, String> {
    let events: Vec<MasterEvent> =
        serde_json::from_str(events_json).map_err(|e| format!("Invalid events JSON: {}", e))?;
    let options: ExpansionOptions = match options_json.filter(|s| !s.trim().is_empty()) {
        Some(json) => {
            serde_json::from_str(json).map_err(|e| format!("Invalid options JSON: {}", e))?
        }
        None => ExpansionOptions::default(),
    };
    let expansion = expand(
        &events,
        parse_datetime(window_start)?,
        parse_datetime(window_end)?,
        &options,
    );
    to_json(&expansion)
}

fn describe_rule_json(rrule: &str) -> Result<String, String> {
    let pattern = from_canonical(rrule).map_err(|e| e.to_string())?;
    to_json(&pattern)
}

fn canonical_rule_text(pattern_json: &str) -> Result<String, String> {
    let pattern: RecurrencePattern =
        serde_json::from_str(pattern_json).map_err(|e| format!("Invalid pattern JSON: {}", e))?;
    let canonical = to_canonical(&pattern).map_err(|e| e.to_string())?;
    Ok(canonical.unwrap_or_default())
}

fn recurrence_id_text(start: &str, has_timezone: bool) -> Result<String, String> {
    let start = parse_datetime(start)?;
    Ok(RecurrenceId::for_start(&start, has_timezone).to_string())
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Expand master events into the instances of a query window.
///
/// `events_json` is a JSON array of master events; `options_json` optionally
/// carries expansion options. Returns `{instances, diagnostics}` as JSON.
#[wasm_bindgen(js_name = "expandEvents")]
pub fn expand_events(
    events_json: &str,
    window_start: &str,
    window_end: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    expand_events_json(events_json, window_start, window_end, options_json.as_deref())
        .map_err(|e| JsValue::from_str(&e))
}

/// Translate canonical RRULE text into a recurrence pattern (JSON).
#[wasm_bindgen(js_name = "describeRule")]
pub fn describe_rule(rrule: &str) -> Result<String, JsValue> {
    describe_rule_json(rrule).map_err(|e| JsValue::from_str(&e))
}

/// Translate a recurrence pattern (JSON) into canonical RRULE text.
///
/// Returns an empty string when the pattern does not repeat.
#[wasm_bindgen(js_name = "canonicalRule")]
pub fn canonical_rule(pattern_json: &str) -> Result<String, JsValue> {
    canonical_rule_text(pattern_json).map_err(|e| JsValue::from_str(&e))
}

/// Override key for an occurrence starting at `start`.
#[wasm_bindgen(js_name = "recurrenceId")]
pub fn recurrence_id(start: &str, has_timezone: bool) -> Result<String, JsValue> {
    recurrence_id_text(start, has_timezone).map_err(|e| JsValue::from_str(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naive_datetime_is_utc() {
        let dt = parse_datetime("2026-02-17T14:00:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-02-17T14:00:00+00:00");
        assert!(parse_datetime("tomorrow").is_err());
    }

    #[test]
    fn expands_events_with_options() {
        let events = r#"[{
            "id": "daily",
            "title": "Daily",
            "start": "2024-01-01T09:00:00Z",
            "duration_seconds": 1800,
            "rule": "FREQ=DAILY;COUNT=3",
            "overrides": { "2024-01-05T09:00:00Z": { "kind": "excluded" } }
        }]"#;
        let json = expand_events_json(
            events,
            "2024-01-01T00:00:00",
            "2024-01-31T00:00:00",
            Some(r#"{"report_orphaned_overrides": true}"#),
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["instances"].as_array().unwrap().len(), 3);
        assert_eq!(value["diagnostics"][0]["kind"], "orphaned_override");
    }

    #[test]
    fn rejects_bad_events_json() {
        let err = expand_events_json("{", "2024-01-01T00:00:00", "2024-01-02T00:00:00", None)
            .unwrap_err();
        assert!(err.starts_with("Invalid events JSON"));
    }

    #[test]
    fn rule_translation_both_ways() {
        let pattern = describe_rule_json("FREQ=WEEKLY;BYDAY=TU,TH").unwrap();
        assert_eq!(canonical_rule_text(&pattern).unwrap(), "FREQ=WEEKLY;BYDAY=TU,TH");
        assert_eq!(canonical_rule_text(r#"{"frequency":"none"}"#).unwrap(), "");
        assert!(describe_rule_json("FREQ=SECONDLY").is_err());
        assert!(canonical_rule_text(r#"{"frequency":"yearly","months":[13]}"#).is_err());
    }

    #[test]
    fn recurrence_id_formats() {
        assert_eq!(
            recurrence_id_text("2024-01-08T09:00:00-05:00", true).unwrap(),
            "2024-01-08T09:00:00"
        );
        assert_eq!(
            recurrence_id_text("2024-01-08T09:00:00-05:00", false).unwrap(),
            "2024-01-08T14:00:00Z"
        );
    }
}
