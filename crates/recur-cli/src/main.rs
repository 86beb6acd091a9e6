//! `recur` CLI: expand recurring events and translate recurrence rules from
//! the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Expand a calendar for January (stdin → stdout)
//! cat calendar.json | recur expand --from 2024-01-01T00:00:00Z --to 2024-01-31T23:59:59Z
//!
//! # From file to file, reporting override keys that match nothing
//! recur expand -i calendar.json -o january.json --from 2024-01-01T00:00:00Z \
//!   --to 2024-01-31T23:59:59Z --report-orphans --pretty
//!
//! # Describe a rule as a recurrence pattern
//! recur describe "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE"
//!
//! # Canonical rule text for a pattern
//! echo '{"frequency":"monthly","month_days":[15]}' | recur canonical
//!
//! # Override key for an occurrence
//! recur recurrence-id --start 2024-01-08T09:00:00-05:00 --timezone America/New_York
//! ```
//!
//! Logs go to stderr. `-v` enables debug output, `-vv` trace; `RUST_LOG`
//! takes precedence when set.

use std::io::{self, Read};

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use clap::{Parser, Subcommand};
use recurrence_engine::{
    expand, from_canonical, to_canonical, ExpansionOptions, MasterEvent, RecurrenceId,
    RecurrencePattern, WeeklyMatching,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "recur",
    version,
    about = "Recurring-event expansion and recurrence rule tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand master events into the instances of a window
    Expand {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Window start (RFC 3339; a naive time is read as UTC)
        #[arg(long, value_parser = parse_datetime)]
        from: DateTime<FixedOffset>,
        /// Window end, inclusive
        #[arg(long, value_parser = parse_datetime)]
        to: DateTime<FixedOffset>,
        /// Upper bound on candidates examined per series
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Emit every listed BYDAY of a weekly period, not only the period start
        #[arg(long)]
        every_listed_day: bool,
        /// Report override keys that match no generated occurrence
        #[arg(long)]
        report_orphans: bool,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Translate canonical RRULE text into a recurrence pattern (JSON)
    Describe {
        /// RRULE value, e.g. "FREQ=DAILY;COUNT=3"
        rule: String,
    },
    /// Translate a recurrence pattern (JSON) into canonical RRULE text
    Canonical {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Print the override key for an occurrence start
    RecurrenceId {
        /// Occurrence start (RFC 3339)
        #[arg(long, value_parser = parse_datetime)]
        start: DateTime<FixedOffset>,
        /// Timezone label of the master event, if it has one
        #[arg(long)]
        timezone: Option<String>,
    },
}

/// `expand` input: a document with options, or a bare array of events.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpandInput {
    Document {
        events: Vec<MasterEvent>,
        #[serde(default)]
        options: ExpansionOptions,
    },
    Events(Vec<MasterEvent>),
}

impl ExpandInput {
    fn into_parts(self) -> (Vec<MasterEvent>, ExpansionOptions) {
        match self {
            ExpandInput::Document { events, options } => (events, options),
            ExpandInput::Events(events) => (events, ExpansionOptions::default()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Expand {
            input,
            output,
            from,
            to,
            max_iterations,
            every_listed_day,
            report_orphans,
            pretty,
        } => {
            let json = read_input(input.as_deref())?;
            let parsed: ExpandInput =
                serde_json::from_str(&json).context("Failed to parse events JSON")?;
            let (events, mut options) = parsed.into_parts();

            // Flags win over the document's options block.
            if let Some(max) = max_iterations {
                options.generator.max_iterations = max;
            }
            if every_listed_day {
                options.generator.weekly_matching = WeeklyMatching::EveryListedDay;
            }
            if report_orphans {
                options.report_orphaned_overrides = true;
            }

            let expansion = expand(&events, from, to, &options);
            tracing::debug!(
                events = events.len(),
                instances = expansion.instances.len(),
                diagnostics = expansion.diagnostics.len(),
                "expansion finished"
            );

            let rendered = if pretty {
                serde_json::to_string_pretty(&expansion)?
            } else {
                serde_json::to_string(&expansion)?
            };
            write_output(output.as_deref(), &rendered)?;
        }
        Commands::Describe { rule } => {
            let pattern = from_canonical(&rule)
                .with_context(|| format!("Failed to describe rule: {}", rule))?;
            println!("{}", serde_json::to_string_pretty(&pattern)?);
        }
        Commands::Canonical { input } => {
            let json = read_input(input.as_deref())?;
            let pattern: RecurrencePattern =
                serde_json::from_str(&json).context("Failed to parse pattern JSON")?;
            let canonical =
                to_canonical(&pattern).context("Failed to build canonical rule")?;
            println!("{}", canonical.unwrap_or_default());
        }
        Commands::RecurrenceId { start, timezone } => {
            let has_timezone = timezone.is_some_and(|tz| !tz.trim().is_empty());
            println!("{}", RecurrenceId::for_start(&start, has_timezone));
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Parse an RFC 3339 datetime, or a naive `YYYY-MM-DDTHH:MM:SS` read as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc().fixed_offset())
        .map_err(|e| format!("invalid datetime '{}': {}", s, e))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
