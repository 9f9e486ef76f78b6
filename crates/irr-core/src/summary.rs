//! Per-label duration statistics over exported rows.
//!
//! Sessions are compared within one (construct class, condition) group: a
//! session that never used a label contributes a zero duration for it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::export::DurationRow;
use crate::label::{Condition, ConstructClass, Label};

/// Aggregated time spent in one label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationSummary {
    pub construct_class: ConstructClass,
    pub condition: Condition,
    pub label: Label,
    /// Sum over all sessions and streams.
    pub total_seconds: f64,
    /// Sessions in the (class, condition) group.
    pub sessions: usize,
    pub mean_seconds: f64,
    /// Sample standard deviation; `None` with fewer than two sessions.
    pub std_seconds: Option<f64>,
}

type GroupKey = (ConstructClass, Condition);

/// Aggregates rows into one summary per (class, condition, label) seen.
///
/// Output is ordered by class, condition, then label.
#[allow(clippy::cast_precision_loss)]
pub fn summarize(rows: &[DurationRow]) -> Vec<DurationSummary> {
    let mut sessions: BTreeMap<GroupKey, BTreeSet<&str>> = BTreeMap::new();
    let mut per_session: BTreeMap<(GroupKey, Label), BTreeMap<&str, f64>> = BTreeMap::new();

    for row in rows {
        let group = (row.construct_class, row.condition);
        sessions
            .entry(group)
            .or_default()
            .insert(row.session_id.as_str());
        *per_session
            .entry((group, row.label))
            .or_default()
            .entry(row.session_id.as_str())
            .or_default() += row.duration_seconds;
    }

    per_session
        .into_iter()
        .map(|((group, label), durations)| {
            let ids = &sessions[&group];
            let values: Vec<f64> = ids
                .iter()
                .map(|id| durations.get(id).copied().unwrap_or(0.0))
                .collect();

            let count = values.len() as f64;
            let total: f64 = values.iter().sum();
            let mean = total / count;
            let std = (values.len() > 1).then(|| {
                let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
                (squares / (count - 1.0)).sqrt()
            });

            DurationSummary {
                construct_class: group.0,
                condition: group.1,
                label,
                total_seconds: total,
                sessions: values.len(),
                mean_seconds: mean,
                std_seconds: std,
            }
        })
        .collect()
}
