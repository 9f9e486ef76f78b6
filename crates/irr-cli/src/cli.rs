//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::export::ExportArgs;
use crate::commands::reliability::ReliabilityArgs;
use crate::commands::summary::SummaryArgs;

/// Inter-rater reliability for coded child-behavior sessions.
///
/// Compares two coders' interval annotations and exports labelled durations
/// for downstream analysis.
#[derive(Debug, Parser)]
#[command(name = "irr", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare two coders' annotations of one session.
    Reliability(ReliabilityArgs),

    /// Export per-interval durations of the sessions in a manifest.
    Export(ExportArgs),

    /// Summarize label durations across the sessions in a manifest.
    Summary(SummaryArgs),
}
