//! Summary command aggregating label durations across sessions.

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use irr_core::{DurationSummary, summarize};

use super::export::collect_rows;
use crate::input::Manifest;

#[derive(Debug, Args)]
pub struct SummaryArgs {
    /// Session manifest (JSON).
    pub manifest: PathBuf,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

// ========== Duration Formatting ==========

/// Formats seconds as `HHhMMm`, truncating leftover seconds.
/// Negative values are treated as 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_hours(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}h{:02}m", total / 3600, (total % 3600) / 60)
}

/// Formats seconds as `MMmSSs`; minutes are not capped at 60.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_minutes(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}m{:02}s", total / 60, total % 60)
}

/// Formats summaries grouped by construct class and condition.
pub fn format_summary(summaries: &[DurationSummary]) -> String {
    let mut output = String::new();
    if summaries.is_empty() {
        writeln!(output, "No annotated durations found.").unwrap();
        return output;
    }

    let mut current = None;
    for summary in summaries {
        let group = (summary.construct_class, summary.condition);
        if current != Some(group) {
            if current.is_some() {
                writeln!(output).unwrap();
            }
            writeln!(
                output,
                "{} ({}, {} sessions)",
                summary.construct_class, summary.condition, summary.sessions
            )
            .unwrap();
            current = Some(group);
        }

        let std = summary
            .std_seconds
            .map_or_else(|| "-".to_string(), format_minutes);
        writeln!(
            output,
            "  {:<14}total {}  mean {}  std {}",
            summary.label.as_str(),
            format_hours(summary.total_seconds),
            format_minutes(summary.mean_seconds),
            std
        )
        .unwrap();
    }
    output
}

/// Runs the summary command.
pub fn run<W: Write>(writer: &mut W, args: &SummaryArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let rows = collect_rows(&manifest);
    let summaries = summarize(&rows);

    if args.json {
        let output =
            serde_json::to_string_pretty(&summaries).context("failed to serialize summary")?;
        writeln!(writer, "{output}")?;
    } else {
        write!(writer, "{}", format_summary(&summaries))?;
    }
    Ok(())
}
