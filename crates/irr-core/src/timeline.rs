//! Interval timelines for one coder, one stream and one construct class.
//!
//! # Merge Rules
//!
//! - Two supplied events with an identical start share one slot: the later
//!   event replaces the earlier one entirely (label and end) but keeps the
//!   earlier event's priority.
//! - Where events with different starts overlap, the earlier-supplied slot
//!   owns the shared time. A later event keeps only the parts no earlier
//!   slot covers, so it may be clipped, split or dropped.

use std::cmp::Ordering;

use serde::Serialize;
use thiserror::Error;

use crate::annotation::{AnnotationEvent, InvalidEvent};
use crate::label::{ConstructClass, Label};

/// Timeline construction and access errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimelineError {
    #[error(transparent)]
    InvalidEvent(#[from] InvalidEvent),

    #[error("timeline for {0} has no intervals")]
    EmptyTimeline(ConstructClass),
}

/// A half-open `[start, end)` interval carrying one label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
    pub label: Label,
}

impl Interval {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Orders validated (finite) bounds; `-0.0` and `0.0` compare equal.
fn cmp_bound(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl From<&AnnotationEvent> for Interval {
    fn from(event: &AnnotationEvent) -> Self {
        Self {
            start: event.start,
            end: event.end,
            label: event.label,
        }
    }
}

/// Sorted, non-overlapping label intervals with point-in-time lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    class: ConstructClass,
    intervals: Vec<Interval>,
}

impl Timeline {
    /// Builds a timeline from one stream of events.
    ///
    /// Events whose label is outside `class` are skipped. Every event is
    /// validated, including the skipped ones. Overlaps are resolved by the
    /// merge rules above, never rejected.
    pub fn build(events: &[AnnotationEvent], class: ConstructClass) -> Result<Self, TimelineError> {
        // One interval per distinct start, in first-supplied order.
        let mut slots: Vec<Interval> = Vec::new();
        // (start, slot index), sorted by start.
        let mut by_start: Vec<(f64, usize)> = Vec::new();

        for event in events {
            event.validate()?;
            if !class.contains(event.label) {
                continue;
            }
            let interval = Interval::from(event);
            match by_start.binary_search_by(|&(start, _)| cmp_bound(start, interval.start)) {
                Ok(position) => slots[by_start[position].1] = interval,
                Err(position) => {
                    by_start.insert(position, (interval.start, slots.len()));
                    slots.push(interval);
                }
            }
        }

        let mut timeline = Self {
            class,
            intervals: Vec::with_capacity(slots.len()),
        };
        for interval in slots {
            timeline.fill(interval);
        }

        tracing::trace!(
            class = %class,
            events = events.len(),
            intervals = timeline.intervals.len(),
            "built timeline"
        );
        Ok(timeline)
    }

    /// Adds the parts of `interval` not yet covered by any interval.
    fn fill(&mut self, interval: Interval) {
        let mut pieces = Vec::new();
        let mut cursor = interval.start;
        // First interval ending after the cursor; ends ascend like starts.
        let mut index = self.intervals.partition_point(|iv| iv.end <= cursor);

        while cursor < interval.end {
            match self.intervals.get(index) {
                Some(existing) if existing.start < interval.end => {
                    if cursor < existing.start {
                        pieces.push(Interval {
                            start: cursor,
                            end: existing.start,
                            label: interval.label,
                        });
                    }
                    cursor = cursor.max(existing.end);
                    index += 1;
                }
                _ => {
                    pieces.push(Interval {
                        start: cursor,
                        end: interval.end,
                        label: interval.label,
                    });
                    break;
                }
            }
        }

        if pieces != [interval] {
            tracing::trace!(
                label = %interval.label,
                start = interval.start,
                end = interval.end,
                pieces = pieces.len(),
                "interval clipped by earlier events"
            );
        }

        for piece in pieces {
            let at = self.intervals.partition_point(|iv| iv.start < piece.start);
            self.intervals.insert(at, piece);
        }
    }

    /// Label active at `t`, or [`Label::MissingData`] when no interval
    /// satisfies `start <= t < end`.
    pub fn query(&self, t: f64) -> Label {
        // Intervals starting at or before `t`; NaN compares false and yields 0.
        let upper = self.intervals.partition_point(|iv| iv.start <= t);

        match upper.checked_sub(1).map(|i| &self.intervals[i]) {
            Some(interval) if t < interval.end => interval.label,
            _ => Label::MissingData,
        }
    }

    /// Start of the first interval.
    pub fn coverage_start(&self) -> Result<f64, TimelineError> {
        self.intervals
            .first()
            .map(|iv| iv.start)
            .ok_or(TimelineError::EmptyTimeline(self.class))
    }

    /// End of the last interval.
    pub fn coverage_end(&self) -> Result<f64, TimelineError> {
        self.intervals
            .last()
            .map(|iv| iv.end)
            .ok_or(TimelineError::EmptyTimeline(self.class))
    }

    pub const fn construct_class(&self) -> ConstructClass {
        self.class
    }

    /// Intervals in ascending start order.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}
