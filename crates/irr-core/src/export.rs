//! Duration rows for downstream aggregation.
//!
//! One row per timeline interval: primary stream first, then the secondary
//! stream for two-stream sessions.

use std::io::{self, Write};

use serde::Serialize;
use thiserror::Error;

use crate::annotation::CoderAnnotations;
use crate::label::{Condition, ConstructClass, Label, StreamRole};
use crate::timeline::{Timeline, TimelineError};

/// Column names of the CSV export, in field order.
pub const CSV_HEADER: [&str; 6] = [
    "id",
    "condition",
    "child",
    "construct_class",
    "construct",
    "duration",
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExportError {
    #[error("session {session_id} has no {role} stream")]
    MissingStream {
        session_id: String,
        role: StreamRole,
    },

    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

/// Time spent in one labelled interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationRow {
    pub session_id: String,
    pub condition: Condition,
    pub stream_role: StreamRole,
    pub construct_class: ConstructClass,
    pub label: Label,
    pub duration_seconds: f64,
}

impl DurationRow {
    /// Field values in [`CSV_HEADER`] order.
    pub fn fields(&self) -> [String; 6] {
        [
            self.session_id.clone(),
            self.condition.to_string(),
            self.stream_role.to_string(),
            self.construct_class.to_string(),
            self.label.to_string(),
            self.duration_seconds.to_string(),
        ]
    }
}

/// Duration rows of one coder's session for one construct class.
pub fn export_rows(
    session_id: &str,
    condition: Condition,
    annotations: &CoderAnnotations,
    class: ConstructClass,
) -> Result<Vec<DurationRow>, ExportError> {
    let mut rows = Vec::new();

    for &role in condition.roles() {
        let events = annotations
            .stream(role)
            .ok_or_else(|| ExportError::MissingStream {
                session_id: session_id.to_string(),
                role,
            })?;
        let timeline = Timeline::build(events, class)?;

        rows.extend(timeline.intervals().iter().map(|interval| DurationRow {
            session_id: session_id.to_string(),
            condition,
            stream_role: role,
            construct_class: class,
            label: interval.label,
            duration_seconds: interval.duration(),
        }));
    }

    Ok(rows)
}

/// Duration rows for every construct class, in canonical class order.
pub fn export_all(
    session_id: &str,
    condition: Condition,
    annotations: &CoderAnnotations,
) -> Result<Vec<DurationRow>, ExportError> {
    let mut rows = Vec::new();
    for class in ConstructClass::ALL {
        rows.extend(export_rows(session_id, condition, annotations, class)?);
    }
    Ok(rows)
}

/// Quotes a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Writes the header followed by one line per row.
pub fn write_csv<W: Write>(writer: &mut W, rows: &[DurationRow]) -> io::Result<()> {
    writeln!(writer, "{}", CSV_HEADER.join(","))?;
    for row in rows {
        let line: Vec<String> = row.fields().iter().map(|f| csv_field(f)).collect();
        writeln!(writer, "{}", line.join(","))?;
    }
    Ok(())
}
