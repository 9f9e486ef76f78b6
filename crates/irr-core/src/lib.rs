//! Core domain logic for annotation reliability.
//!
//! This crate contains the fundamental types and logic for:
//! - Labels: the three construct classes and their label sets
//! - Timelines: per-coder interval indexes with point-in-time queries
//! - Reliability: windowed percentage agreement between two coders
//! - Alpha: nominal Krippendorff's alpha over sampled label sequences
//! - Export and summary: duration rows and their per-label statistics

pub mod alpha;
pub mod annotation;
pub mod export;
pub mod label;
pub mod reliability;
pub mod summary;
pub mod timeline;

pub use alpha::{AlphaError, Coincidences, compute_alpha};
pub use annotation::{AnnotationError, AnnotationEvent, CoderAnnotations, InvalidEvent};
pub use export::{CSV_HEADER, DurationRow, ExportError, export_all, export_rows, write_csv};
pub use label::{Condition, ConstructClass, Label, StreamRole, UnknownName};
pub use reliability::{
    AgreementCounters, DEFAULT_WINDOW_SECONDS, ReliabilityError, ReliabilityReport,
    ReliabilityWindow, Stage, StreamPair, compute_all, compute_reliability, pair_streams,
};
pub use summary::{DurationSummary, summarize};
pub use timeline::{Interval, Timeline, TimelineError};
