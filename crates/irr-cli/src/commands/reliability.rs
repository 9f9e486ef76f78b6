//! Reliability command comparing two coders' annotations of one session.
//!
//! Prints percentage agreement and Krippendorff's alpha for every construct
//! class. A class that cannot be computed is reported as skipped; the other
//! classes are still printed.

use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use irr_core::{
    Condition, ConstructClass, ReliabilityError, ReliabilityReport, compute_all,
};
use serde::Serialize;

use crate::Config;
use crate::input::load_annotations;

#[derive(Debug, Args)]
pub struct ReliabilityArgs {
    /// First coder's annotation file.
    pub coder1: PathBuf,

    /// Second coder's annotation file.
    pub coder2: PathBuf,

    /// Session condition: childchild or childrobot.
    #[arg(long)]
    pub condition: Option<Condition>,

    /// Sampling cadence in seconds.
    #[arg(long)]
    pub window: Option<f64>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

type ClassResult = (ConstructClass, Result<ReliabilityReport, ReliabilityError>);

/// Formats the human-readable summary, one block per construct class.
pub fn format_text(results: &[ClassResult]) -> String {
    let mut output = String::new();
    for (class, result) in results {
        match result {
            Ok(report) => {
                writeln!(output, "{}", report.agreement_line()).unwrap();
                writeln!(output, "Krippendorff's alpha: {:.6} on {class}", report.alpha).unwrap();
            }
            Err(e) => {
                writeln!(output, "Skipped {class}: {e}").unwrap();
            }
        }
    }
    output
}

// ========== JSON Output ==========

/// JSON reliability structure.
#[derive(Debug, Serialize)]
pub struct JsonReliability {
    pub generated_at: String,
    pub condition: Condition,
    pub window_seconds: f64,
    pub classes: Vec<JsonClassEntry>,
}

#[derive(Debug, Serialize)]
pub struct JsonClassEntry {
    pub construct_class: ConstructClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReliabilityReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Formats results as pretty-printed JSON.
pub fn format_json(
    results: &[ClassResult],
    condition: Condition,
    window_seconds: f64,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let classes = results
        .iter()
        .map(|(class, result)| JsonClassEntry {
            construct_class: *class,
            report: result.as_ref().ok().copied(),
            error: result.as_ref().err().map(ToString::to_string),
        })
        .collect();

    let document = JsonReliability {
        generated_at: generated_at.to_rfc3339(),
        condition,
        window_seconds,
        classes,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Runs the reliability command.
pub fn run<W: Write>(writer: &mut W, args: &ReliabilityArgs, config: &Config) -> Result<()> {
    let first = load_annotations(&args.coder1)?;
    let second = load_annotations(&args.coder2)?;
    let condition = args.condition.unwrap_or(config.condition);
    let window = args.window.unwrap_or(config.window_seconds);
    tracing::debug!(%condition, window, "computing reliability");

    let results = compute_all(&first, &second, condition, window);

    if args.json {
        let output = format_json(&results, condition, window, Utc::now())?;
        writeln!(writer, "{output}")?;
    } else {
        write!(writer, "{}", format_text(&results))?;
    }
    Ok(())
}
