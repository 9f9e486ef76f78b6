//! Annotation events and the coder file format.
//!
//! Coder files are loosely shaped (`{"purple": [{"aimless": [0.0, 4.5]}]}`),
//! so they are converted eagerly into [`AnnotationEvent`]s here. Malformed
//! entries are rejected with their position instead of surfacing later
//! during timeline construction.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::label::{ConstructClass, Label, StreamRole};

/// A single coded interval: `label` was observed from `start` to `end`,
/// in seconds since session start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnnotationEvent {
    pub label: Label,
    pub start: f64,
    pub end: f64,
}

/// An event whose bounds do not describe a non-empty interval.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("invalid {label} event: start {start} must be before end {end}")]
pub struct InvalidEvent {
    pub label: Label,
    pub start: f64,
    pub end: f64,
}

impl AnnotationEvent {
    /// Creates an event after checking that `start < end` and both are finite.
    pub fn new(label: Label, start: f64, end: f64) -> Result<Self, InvalidEvent> {
        let event = Self { label, start, end };
        event.validate()?;
        Ok(event)
    }

    /// Checks the interval bounds.
    pub fn validate(&self) -> Result<(), InvalidEvent> {
        if !self.start.is_finite() || !self.end.is_finite() || self.start >= self.end {
            return Err(InvalidEvent {
                label: self.label,
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Errors raised while loading a coder file.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("invalid annotation JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown stream role: {0}")]
    UnknownRole(String),

    #[error("stream {role} is given more than once")]
    DuplicateRole { role: StreamRole },

    #[error("{role} entry {index}: unknown label {key}")]
    UnknownLabel {
        role: StreamRole,
        index: usize,
        key: String,
    },

    #[error("{role} entry {index}: {label} is not an annotation label")]
    NotAnnotatable {
        role: StreamRole,
        index: usize,
        label: Label,
    },

    #[error("{role} entry {index}: {label} needs [start, end], got {len} values")]
    MalformedBounds {
        role: StreamRole,
        index: usize,
        label: Label,
        len: usize,
    },

    #[error("{role} entry {index}: {first} and {second} are both {class} labels")]
    SharedClass {
        role: StreamRole,
        index: usize,
        class: ConstructClass,
        first: Label,
        second: Label,
    },

    #[error("{role} entry {index}: {source}")]
    InvalidEvent {
        role: StreamRole,
        index: usize,
        #[source]
        source: InvalidEvent,
    },
}

/// The file shape as written by the annotation tool.
type RawCoderFile = BTreeMap<String, Vec<BTreeMap<String, Vec<f64>>>>;

/// One coder's annotations for a session, keyed by stream role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoderAnnotations {
    streams: BTreeMap<StreamRole, Vec<AnnotationEvent>>,
}

impl CoderAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a stream.
    #[must_use]
    pub fn with_stream(mut self, role: StreamRole, events: Vec<AnnotationEvent>) -> Self {
        self.streams.insert(role, events);
        self
    }

    /// Replaces the events of `role`, returning the previous ones.
    pub fn insert(
        &mut self,
        role: StreamRole,
        events: Vec<AnnotationEvent>,
    ) -> Option<Vec<AnnotationEvent>> {
        self.streams.insert(role, events)
    }

    /// Events of one stream, in the order they were supplied.
    pub fn stream(&self, role: StreamRole) -> Option<&[AnnotationEvent]> {
        self.streams.get(&role).map(Vec::as_slice)
    }

    pub fn roles(&self) -> impl Iterator<Item = StreamRole> + '_ {
        self.streams.keys().copied()
    }

    /// Parses a coder file.
    ///
    /// Every list entry maps one or more label keys to `[start, end]`. Keys
    /// inside one entry expand in canonical label order and must belong to
    /// different construct classes, since JSON object key order is not
    /// kept. Entries keep file order, which the timeline merge rules use.
    pub fn from_json_str(json: &str) -> Result<Self, AnnotationError> {
        let raw: RawCoderFile = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCoderFile) -> Result<Self, AnnotationError> {
        let mut annotations = Self::new();

        for (role_name, entries) in raw {
            let role: StreamRole = role_name
                .parse()
                .map_err(|_| AnnotationError::UnknownRole(role_name.clone()))?;

            let mut events = Vec::with_capacity(entries.len());
            for (index, entry) in entries.into_iter().enumerate() {
                let mut expanded = Vec::with_capacity(entry.len());
                for (key, bounds) in entry {
                    let label: Label =
                        key.parse().map_err(|_| AnnotationError::UnknownLabel {
                            role,
                            index,
                            key: key.clone(),
                        })?;
                    if label.construct_class().is_none() {
                        return Err(AnnotationError::NotAnnotatable { role, index, label });
                    }
                    let [start, end] = bounds[..] else {
                        return Err(AnnotationError::MalformedBounds {
                            role,
                            index,
                            label,
                            len: bounds.len(),
                        });
                    };
                    let event = AnnotationEvent::new(label, start, end)
                        .map_err(|source| AnnotationError::InvalidEvent { role, index, source })?;
                    expanded.push(event);
                }
                expanded.sort_by_key(|e| e.label);
                // Labels sort grouped by class, so a shared class is adjacent.
                let shared = expanded.windows(2).find_map(|pair| {
                    let class = pair[0].label.construct_class()?;
                    (pair[1].label.construct_class() == Some(class))
                        .then_some((class, pair[0].label, pair[1].label))
                });
                if let Some((class, first, second)) = shared {
                    return Err(AnnotationError::SharedClass {
                        role,
                        index,
                        class,
                        first,
                        second,
                    });
                }
                events.extend(expanded);
            }

            if annotations.insert(role, events).is_some() {
                return Err(AnnotationError::DuplicateRole { role });
            }
        }

        tracing::debug!(
            roles = annotations.streams.len(),
            events = annotations.streams.values().map(Vec::len).sum::<usize>(),
            "loaded coder annotations"
        );
        Ok(annotations)
    }
}
