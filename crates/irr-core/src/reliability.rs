//! Inter-rater reliability between two coders.
//!
//! # Algorithm Summary
//!
//! 1. Build one timeline per (coder, stream role, construct class) required
//!    by the session condition
//! 2. For each role, intersect the two coders' coverage into a reliability
//!    window; an empty intersection aborts the computation
//! 3. Sample every role's window at a fixed cadence, pooling agreement
//!    counts across roles
//! 4. Sample the primary role once more into two label sequences and compute
//!    Krippendorff's alpha from them
//!
//! Percentage agreement pools both children in two-stream sessions, while
//! alpha only ever looks at the primary stream.

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::alpha::{AlphaError, compute_alpha};
use crate::annotation::CoderAnnotations;
use crate::label::{Condition, ConstructClass, Label, StreamRole};
use crate::timeline::{Timeline, TimelineError};

/// Default sampling cadence in seconds.
pub const DEFAULT_WINDOW_SECONDS: f64 = 1.0;

/// Stages of one reliability computation, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Initialized,
    TimelinesBuilt,
    WindowComputed,
    Sampled,
    Reported,
}

/// Reasons a reliability computation produces no report.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReliabilityError {
    #[error("sampling window must be a positive number of seconds, got {0}")]
    InvalidWindow(f64),

    #[error("coder {coder} has no {role} stream")]
    MissingStream { coder: u8, role: StreamRole },

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error("coders share no coverage on the {role} stream: window [{start}, {end}) is empty")]
    NoOverlap {
        role: StreamRole,
        start: f64,
        end: f64,
    },

    #[error("percentage agreement is undefined: all {total_units} sampled units are missing")]
    UndefinedAgreement { total_units: u64 },

    #[error(transparent)]
    Alpha(#[from] AlphaError),
}

impl ReliabilityError {
    /// The last stage the computation reached before failing.
    pub const fn stage(&self) -> Stage {
        match self {
            Self::InvalidWindow(_)
            | Self::MissingStream { .. }
            | Self::Timeline(TimelineError::InvalidEvent(_)) => Stage::Initialized,
            Self::Timeline(TimelineError::EmptyTimeline(_)) | Self::NoOverlap { .. } => {
                Stage::TimelinesBuilt
            }
            Self::UndefinedAgreement { .. } | Self::Alpha(_) => Stage::Sampled,
        }
    }
}

/// Time range `[start, end)` covered by every compared timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReliabilityWindow {
    pub start: f64,
    pub end: f64,
}

impl ReliabilityWindow {
    /// Intersects the coverage of `timelines`: latest start, earliest end.
    ///
    /// The result may be empty; see [`ReliabilityWindow::is_empty`].
    pub fn shared<'a>(
        timelines: impl IntoIterator<Item = &'a Timeline>,
    ) -> Result<Self, TimelineError> {
        let mut window = Self {
            start: f64::NEG_INFINITY,
            end: f64::INFINITY,
        };
        for timeline in timelines {
            window.start = window.start.max(timeline.coverage_start()?);
            window.end = window.end.min(timeline.coverage_end()?);
        }
        Ok(window)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Sample instants `start + i * step` that fall before `end`.
    ///
    /// Instants are computed from the index rather than accumulated, so
    /// fractional steps do not drift.
    #[allow(clippy::cast_precision_loss)]
    pub fn instants(&self, step: f64) -> impl Iterator<Item = f64> + '_ {
        (0_u64..)
            .map(move |i| self.start + i as f64 * step)
            .take_while(move |&t| t < self.end)
    }
}

/// Unit tallies accumulated while sampling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgreementCounters {
    pub total_units: u64,
    pub missing_units: u64,
    pub agreement_units: u64,
}

impl AgreementCounters {
    /// Records one sampled unit.
    pub fn record(&mut self, first: Label, second: Label) {
        self.total_units += 1;
        if first.is_missing() || second.is_missing() {
            self.missing_units += 1;
        } else if first == second {
            self.agreement_units += 1;
        }
    }

    /// Units where both coders had a label.
    pub const fn comparable_units(&self) -> u64 {
        self.total_units.saturating_sub(self.missing_units)
    }

    /// `100 * agreement / comparable`.
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage_agreement(&self) -> Result<f64, ReliabilityError> {
        let comparable = self.comparable_units();
        if comparable == 0 {
            return Err(ReliabilityError::UndefinedAgreement {
                total_units: self.total_units,
            });
        }
        Ok(100.0 * self.agreement_units as f64 / comparable as f64)
    }
}

/// Both coders' timelines for one stream role and their shared window.
#[derive(Debug, Clone)]
pub struct StreamPair {
    pub role: StreamRole,
    pub first: Timeline,
    pub second: Timeline,
    pub window: ReliabilityWindow,
}

impl StreamPair {
    /// Pairs two timelines, failing when their coverage does not intersect.
    pub fn new(
        role: StreamRole,
        first: Timeline,
        second: Timeline,
    ) -> Result<Self, ReliabilityError> {
        let window = ReliabilityWindow::shared([&first, &second])?;
        if window.is_empty() {
            return Err(ReliabilityError::NoOverlap {
                role,
                start: window.start,
                end: window.end,
            });
        }
        Ok(Self {
            role,
            first,
            second,
            window,
        })
    }

    /// Samples both timelines at every instant of the window.
    pub fn sample_into(&self, step: f64, counters: &mut AgreementCounters) {
        for t in self.window.instants(step) {
            counters.record(self.first.query(t), self.second.query(t));
        }
    }

    /// Aligned label sequences of both coders over the window.
    pub fn sequences(&self, step: f64) -> (Vec<Label>, Vec<Label>) {
        self.window
            .instants(step)
            .map(|t| (self.first.query(t), self.second.query(t)))
            .unzip()
    }
}

/// Outcome of one reliability computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReliabilityReport {
    pub construct_class: ConstructClass,
    pub percentage_agreement: f64,
    pub alpha: f64,
    pub total_units: u64,
    pub missing_units: u64,
    pub agreement_units: u64,
}

impl ReliabilityReport {
    /// One-line summary, e.g. `Percentage agreement: 90.000000% on task_engagement`.
    pub fn agreement_line(&self) -> String {
        format!(
            "Percentage agreement: {:.6}% on {}",
            self.percentage_agreement, self.construct_class
        )
    }
}

fn check_window(window: f64) -> Result<(), ReliabilityError> {
    if window.is_finite() && window > 0.0 {
        Ok(())
    } else {
        Err(ReliabilityError::InvalidWindow(window))
    }
}

fn build_timeline(
    annotations: &CoderAnnotations,
    coder: u8,
    role: StreamRole,
    class: ConstructClass,
) -> Result<Timeline, ReliabilityError> {
    let events = annotations
        .stream(role)
        .ok_or(ReliabilityError::MissingStream { coder, role })?;
    Ok(Timeline::build(events, class)?)
}

/// Builds timelines and windows for every role required by `condition`,
/// primary first.
pub fn pair_streams(
    first: &CoderAnnotations,
    second: &CoderAnnotations,
    class: ConstructClass,
    condition: Condition,
) -> Result<Vec<StreamPair>, ReliabilityError> {
    let roles = condition.roles();

    let mut timelines = Vec::with_capacity(roles.len());
    for &role in roles {
        let a = build_timeline(first, 1, role, class)?;
        let b = build_timeline(second, 2, role, class)?;
        timelines.push((role, a, b));
    }
    tracing::trace!(class = %class, stage = ?Stage::TimelinesBuilt, "reliability");

    let pairs = timelines
        .into_iter()
        .map(|(role, a, b)| StreamPair::new(role, a, b))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::trace!(class = %class, stage = ?Stage::WindowComputed, "reliability");
    Ok(pairs)
}

/// Computes percentage agreement and alpha between two coders for one
/// construct class.
pub fn compute_reliability(
    first: &CoderAnnotations,
    second: &CoderAnnotations,
    class: ConstructClass,
    condition: Condition,
    window: f64,
) -> Result<ReliabilityReport, ReliabilityError> {
    check_window(window)?;
    let pairs = pair_streams(first, second, class, condition)?;

    let mut counters = AgreementCounters::default();
    for pair in &pairs {
        pair.sample_into(window, &mut counters);
    }
    tracing::trace!(class = %class, stage = ?Stage::Sampled, ?counters, "reliability");

    let percentage_agreement = counters.percentage_agreement()?;

    let primary = pairs
        .iter()
        .find(|pair| pair.role == StreamRole::Primary)
        .ok_or(ReliabilityError::MissingStream {
            coder: 1,
            role: StreamRole::Primary,
        })?;
    let (a, b) = primary.sequences(window);
    let alpha = compute_alpha(&a, &b)?;

    let report = ReliabilityReport {
        construct_class: class,
        percentage_agreement,
        alpha,
        total_units: counters.total_units,
        missing_units: counters.missing_units,
        agreement_units: counters.agreement_units,
    };
    tracing::debug!(
        class = %class,
        condition = %condition,
        stage = ?Stage::Reported,
        percentage_agreement,
        alpha,
        "reliability computed"
    );
    Ok(report)
}

/// Runs [`compute_reliability`] for every construct class in parallel.
///
/// Results come back in canonical class order; one class failing does not
/// affect the others.
pub fn compute_all(
    first: &CoderAnnotations,
    second: &CoderAnnotations,
    condition: Condition,
    window: f64,
) -> Vec<(ConstructClass, Result<ReliabilityReport, ReliabilityError>)> {
    ConstructClass::ALL
        .par_iter()
        .map(|&class| {
            let result = compute_reliability(first, second, class, condition, window);
            if let Err(e) = &result {
                tracing::warn!(class = %class, stage = ?e.stage(), error = %e, "reliability failed");
            }
            (class, result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationEvent;

    fn ev(label: Label, start: f64, end: f64) -> AnnotationEvent {
        AnnotationEvent { label, start, end }
    }

    fn primary_only(events: Vec<AnnotationEvent>) -> CoderAnnotations {
        CoderAnnotations::new().with_stream(StreamRole::Primary, events)
    }

    fn both(primary: Vec<AnnotationEvent>, secondary: Vec<AnnotationEvent>) -> CoderAnnotations {
        primary_only(primary).with_stream(StreamRole::Secondary, secondary)
    }

    #[test]
    fn end_to_end_primary_stream() {
        let coder1 = primary_only(vec![
            ev(Label::GoalOriented, 0.0, 10.0),
            ev(Label::Aimless, 10.0, 20.0),
        ]);
        let coder2 = primary_only(vec![
            ev(Label::GoalOriented, 0.0, 8.0),
            ev(Label::Aimless, 8.0, 20.0),
        ]);

        let report = compute_reliability(
            &coder1,
            &coder2,
            ConstructClass::TaskEngagement,
            Condition::OneStream,
            1.0,
        )
        .unwrap();

        assert_eq!(report.total_units, 20);
        assert_eq!(report.missing_units, 0);
        assert_eq!(report.agreement_units, 18);
        assert!((report.percentage_agreement - 90.0).abs() < 1e-12);
        // Do = 2/20; pairable values: 18 goaloriented, 22 aimless.
        let expected_alpha = 1.0 - 0.1 / (1.0 - (18.0 * 17.0 + 22.0 * 21.0) / (40.0 * 39.0));
        assert!((report.alpha - expected_alpha).abs() < 1e-12);
        assert_eq!(
            report.agreement_line(),
            "Percentage agreement: 90.000000% on task_engagement"
        );
    }

    #[test]
    fn identical_timelines_agree_fully() {
        let events = vec![
            ev(Label::Solitary, 0.0, 7.0),
            ev(Label::Parallel, 7.0, 15.0),
            ev(Label::Cooperative, 15.0, 30.0),
        ];
        let coder = both(events.clone(), events);
        let report = compute_reliability(
            &coder,
            &coder,
            ConstructClass::SocialEngagement,
            Condition::TwoStream,
            DEFAULT_WINDOW_SECONDS,
        )
        .unwrap();
        assert!((report.percentage_agreement - 100.0).abs() < f64::EPSILON);
        assert!((report.alpha - 1.0).abs() < 1e-12);
        assert_eq!(report.total_units, 60);
    }

    #[test]
    fn complete_disagreement_is_zero_percent() {
        let coder1 = primary_only(vec![
            ev(Label::Prosocial, 0.0, 5.0),
            ev(Label::Passive, 5.0, 10.0),
        ]);
        let coder2 = primary_only(vec![
            ev(Label::Assertive, 0.0, 5.0),
            ev(Label::Frustrated, 5.0, 10.0),
        ]);
        let report = compute_reliability(
            &coder1,
            &coder2,
            ConstructClass::SocialAttitude,
            Condition::OneStream,
            1.0,
        )
        .unwrap();
        assert_eq!(report.missing_units, 0);
        assert_eq!(report.agreement_units, 0);
        assert!(report.percentage_agreement.abs() < f64::EPSILON);
        assert!(report.alpha < 0.0);
    }

    #[test]
    fn disjoint_coverage_is_no_overlap() {
        let coder1 = primary_only(vec![ev(Label::Aimless, 0.0, 10.0)]);
        let coder2 = primary_only(vec![ev(Label::Aimless, 20.0, 30.0)]);
        let err = compute_reliability(
            &coder1,
            &coder2,
            ConstructClass::TaskEngagement,
            Condition::OneStream,
            1.0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReliabilityError::NoOverlap {
                role: StreamRole::Primary,
                start: 20.0,
                end: 10.0,
            }
        );
        assert_eq!(err.stage(), Stage::TimelinesBuilt);
    }

    #[test]
    fn gaps_count_as_missing_units() {
        let coder1 = primary_only(vec![
            ev(Label::NoPlay, 0.0, 4.0),
            ev(Label::Aimless, 6.0, 10.0),
        ]);
        let coder2 = primary_only(vec![
            ev(Label::NoPlay, 0.0, 5.0),
            ev(Label::GoalOriented, 5.0, 10.0),
        ]);
        let report = compute_reliability(
            &coder1,
            &coder2,
            ConstructClass::TaskEngagement,
            Condition::OneStream,
            1.0,
        )
        .unwrap();
        assert_eq!(report.total_units, 10);
        assert_eq!(report.missing_units, 2);
        assert_eq!(report.agreement_units, 4);
        assert!((report.percentage_agreement - 50.0).abs() < 1e-12);
    }

    #[test]
    fn two_stream_pools_both_children() {
        let coder1 = both(
            vec![ev(Label::Aimless, 0.0, 10.0)],
            vec![ev(Label::NoPlay, 0.0, 10.0)],
        );
        let coder2 = both(
            vec![ev(Label::Aimless, 0.0, 10.0)],
            vec![ev(Label::GoalOriented, 0.0, 10.0)],
        );

        let pooled = compute_reliability(
            &coder1,
            &coder2,
            ConstructClass::TaskEngagement,
            Condition::TwoStream,
            1.0,
        );
        // Alpha only sees the constant primary stream and is undefined.
        assert_eq!(
            pooled,
            Err(ReliabilityError::Alpha(AlphaError::NoVariability))
        );

        let pairs = pair_streams(
            &coder1,
            &coder2,
            ConstructClass::TaskEngagement,
            Condition::TwoStream,
        )
        .unwrap();
        let mut counters = AgreementCounters::default();
        for pair in &pairs {
            pair.sample_into(1.0, &mut counters);
        }
        assert_eq!(counters.total_units, 20);
        assert_eq!(counters.agreement_units, 10);
        assert!((counters.percentage_agreement().unwrap() - 50.0).abs() < 1e-12);
    }

    #[test]
    fn inconsistent_counters_do_not_underflow() {
        let counters = AgreementCounters {
            total_units: 2,
            missing_units: 5,
            agreement_units: 0,
        };
        assert_eq!(counters.comparable_units(), 0);
        assert_eq!(
            counters.percentage_agreement(),
            Err(ReliabilityError::UndefinedAgreement { total_units: 2 })
        );
    }

    #[test]
    fn overlapping_coder_events_still_report() {
        let coder1 = primary_only(vec![
            ev(Label::Aimless, 0.0, 10.2),
            ev(Label::NoPlay, 10.0, 20.0),
        ]);
        let coder2 = primary_only(vec![
            ev(Label::Aimless, 0.0, 10.0),
            ev(Label::NoPlay, 10.0, 20.0),
        ]);
        let report = compute_reliability(
            &coder1,
            &coder2,
            ConstructClass::TaskEngagement,
            Condition::OneStream,
            1.0,
        )
        .unwrap();
        assert_eq!(report.total_units, 20);
        assert_eq!(report.agreement_units, 19);
    }

    #[test]
    fn windows_are_computed_per_role() {
        let coder1 = both(
            vec![ev(Label::Aimless, 0.0, 4.0), ev(Label::NoPlay, 4.0, 8.0)],
            vec![ev(Label::Aimless, 10.0, 14.0)],
        );
        let coder2 = both(
            vec![ev(Label::Aimless, 2.0, 4.0), ev(Label::NoPlay, 4.0, 6.0)],
            vec![ev(Label::Aimless, 12.0, 20.0)],
        );
        let pairs = pair_streams(
            &coder1,
            &coder2,
            ConstructClass::TaskEngagement,
            Condition::TwoStream,
        )
        .unwrap();
        assert_eq!(pairs[0].window, ReliabilityWindow { start: 2.0, end: 6.0 });
        assert_eq!(pairs[1].window, ReliabilityWindow { start: 12.0, end: 14.0 });

        let report = compute_reliability(
            &coder1,
            &coder2,
            ConstructClass::TaskEngagement,
            Condition::TwoStream,
            1.0,
        )
        .unwrap();
        assert_eq!(report.total_units, 6);
        assert_eq!(report.agreement_units, 6);
    }

    #[test]
    fn one_stream_ignores_secondary() {
        let coder1 = both(
            vec![ev(Label::Aimless, 0.0, 5.0), ev(Label::NoPlay, 5.0, 10.0)],
            vec![ev(Label::Aimless, 100.0, 110.0)],
        );
        let coder2 = primary_only(vec![
            ev(Label::Aimless, 0.0, 5.0),
            ev(Label::NoPlay, 5.0, 10.0),
        ]);
        let report = compute_reliability(
            &coder1,
            &coder2,
            ConstructClass::TaskEngagement,
            Condition::OneStream,
            1.0,
        )
        .unwrap();
        assert_eq!(report.total_units, 10);
    }

    #[test]
    fn two_stream_requires_secondary() {
        let coder = primary_only(vec![ev(Label::Aimless, 0.0, 5.0)]);
        let err = compute_reliability(
            &coder,
            &coder,
            ConstructClass::TaskEngagement,
            Condition::TwoStream,
            1.0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReliabilityError::MissingStream {
                coder: 1,
                role: StreamRole::Secondary
            }
        );
        assert_eq!(err.stage(), Stage::Initialized);
    }

    #[test]
    fn empty_class_timeline_fails_at_window() {
        let coder = primary_only(vec![ev(Label::Aimless, 0.0, 5.0)]);
        let err = compute_reliability(
            &coder,
            &coder,
            ConstructClass::SocialAttitude,
            Condition::OneStream,
            1.0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ReliabilityError::Timeline(TimelineError::EmptyTimeline(
                ConstructClass::SocialAttitude
            ))
        );
    }

    #[test]
    fn rejects_bad_windows() {
        let coder = primary_only(vec![ev(Label::Aimless, 0.0, 5.0)]);
        for window in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = compute_reliability(
                &coder,
                &coder,
                ConstructClass::TaskEngagement,
                Condition::OneStream,
                window,
            )
            .unwrap_err();
            assert!(matches!(err, ReliabilityError::InvalidWindow(_)));
        }
    }

    #[test]
    fn undefined_agreement_when_everything_is_missing() {
        let counters = AgreementCounters {
            total_units: 4,
            missing_units: 4,
            agreement_units: 0,
        };
        assert_eq!(
            counters.percentage_agreement(),
            Err(ReliabilityError::UndefinedAgreement { total_units: 4 })
        );
    }

    #[test]
    fn fractional_window_does_not_drift() {
        let window = ReliabilityWindow {
            start: 0.0,
            end: 1.0,
        };
        let instants: Vec<f64> = window.instants(0.1).collect();
        assert_eq!(instants.len(), 10);
        assert!((instants[9] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn compute_all_keeps_class_order_and_isolates_failures() {
        let coder1 = primary_only(vec![
            ev(Label::Aimless, 0.0, 5.0),
            ev(Label::NoPlay, 5.0, 10.0),
            ev(Label::Solitary, 0.0, 10.0),
        ]);
        let coder2 = primary_only(vec![
            ev(Label::Aimless, 0.0, 6.0),
            ev(Label::NoPlay, 6.0, 10.0),
            ev(Label::Solitary, 20.0, 30.0),
        ]);

        let results = compute_all(&coder1, &coder2, Condition::OneStream, 1.0);
        let classes: Vec<_> = results.iter().map(|(class, _)| *class).collect();
        assert_eq!(classes, ConstructClass::ALL.to_vec());

        let task = results[0].1.as_ref().unwrap();
        assert_eq!(task.agreement_units, 9);
        assert!(matches!(
            results[1].1,
            Err(ReliabilityError::NoOverlap { .. })
        ));
        assert!(matches!(
            results[2].1,
            Err(ReliabilityError::Timeline(TimelineError::EmptyTimeline(_)))
        ));
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let coder1 = primary_only(vec![
            ev(Label::Aimless, 0.0, 3.3),
            ev(Label::NoPlay, 3.3, 9.1),
            ev(Label::GoalOriented, 9.1, 17.0),
        ]);
        let coder2 = primary_only(vec![
            ev(Label::Aimless, 0.4, 4.0),
            ev(Label::GoalOriented, 4.0, 12.2),
            ev(Label::NoPlay, 12.2, 16.5),
        ]);
        let run = || {
            compute_reliability(
                &coder1,
                &coder2,
                ConstructClass::TaskEngagement,
                Condition::OneStream,
                0.25,
            )
            .unwrap()
        };
        let first = run();
        for _ in 0..5 {
            let next = run();
            assert_eq!(next.total_units, first.total_units);
            assert_eq!(
                next.percentage_agreement.to_bits(),
                first.percentage_agreement.to_bits()
            );
            assert_eq!(next.alpha.to_bits(), first.alpha.to_bits());
        }
    }
}
