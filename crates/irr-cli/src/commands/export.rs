//! Export command writing per-interval durations for every session in a
//! manifest, as CSV (default) or JSON.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use irr_core::{DurationRow, export_all, write_csv};

use crate::input::{Manifest, load_annotations};

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Session manifest (JSON).
    pub manifest: PathBuf,

    /// Output as JSON instead of CSV.
    #[arg(long)]
    pub json: bool,
}

/// Collects duration rows for every session in the manifest.
///
/// Sessions whose annotations cannot be loaded or exported are skipped with
/// a warning; the remaining sessions are still exported.
pub fn collect_rows(manifest: &Manifest) -> Vec<DurationRow> {
    let mut rows = Vec::new();
    for session in &manifest.sessions {
        let result = load_annotations(&session.annotations).and_then(|annotations| {
            export_all(&session.id, session.condition, &annotations)
                .with_context(|| format!("failed to export session {}", session.id))
        });
        match result {
            Ok(session_rows) => {
                tracing::debug!(session = %session.id, rows = session_rows.len(), "exported session");
                rows.extend(session_rows);
            }
            Err(e) => {
                tracing::warn!(session = %session.id, error = %format!("{e:#}"), "skipping session");
                eprintln!("Skipped session {}: {e:#}", session.id);
            }
        }
    }
    rows
}

/// Runs the export command.
pub fn run<W: Write>(writer: &mut W, args: &ExportArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let rows = collect_rows(&manifest);

    if args.json {
        let output = serde_json::to_string_pretty(&rows).context("failed to serialize rows")?;
        writeln!(writer, "{output}")?;
    } else {
        write_csv(writer, &rows).context("failed to write CSV")?;
    }
    Ok(())
}
