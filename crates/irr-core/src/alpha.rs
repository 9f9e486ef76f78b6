//! Krippendorff's alpha for two coders at the nominal level.
//!
//! Each sampled unit where both coders have a label is *pairable* and
//! contributes one unordered pair of values. With `N` pairable units,
//! `n = 2N` pairable values and `n_c` values of category `c`:
//!
//! ```text
//! Do    = (pairable units with differing labels) / N
//! De    = 1 - Σ n_c (n_c - 1) / (n (n - 1))
//! alpha = 1 - Do / De
//! ```
//!
//! Units with [`Label::MissingData`] on either side are not pairable.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::label::Label;

/// Alpha is undefined or the input is unusable.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AlphaError {
    #[error("sequences differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("alpha is undefined with {found} pairable units (need at least 2)")]
    TooFewPairableUnits { found: usize },

    #[error("alpha is undefined: all pairable values share one category")]
    NoVariability,
}

/// Coincidence tally of two aligned label sequences.
///
/// Keys of `pairs` are unordered category pairs stored as `(min, max)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coincidences {
    pairs: BTreeMap<(Label, Label), usize>,
    marginals: BTreeMap<Label, usize>,
    units: usize,
}

impl Coincidences {
    /// Tallies the pairable units of `a` and `b`.
    pub fn tally(a: &[Label], b: &[Label]) -> Result<Self, AlphaError> {
        if a.len() != b.len() {
            return Err(AlphaError::LengthMismatch {
                left: a.len(),
                right: b.len(),
            });
        }

        let mut tally = Self::default();
        for (&x, &y) in a.iter().zip(b) {
            if x.is_missing() || y.is_missing() {
                continue;
            }
            *tally.pairs.entry((x.min(y), x.max(y))).or_default() += 1;
            *tally.marginals.entry(x).or_default() += 1;
            *tally.marginals.entry(y).or_default() += 1;
            tally.units += 1;
        }
        Ok(tally)
    }

    /// Number of pairable units.
    pub const fn units(&self) -> usize {
        self.units
    }

    /// Number of units coded with the unordered pair `(x, y)`.
    pub fn pair_count(&self, x: Label, y: Label) -> usize {
        self.pairs.get(&(x.min(y), x.max(y))).copied().unwrap_or(0)
    }

    /// Number of pairable values of `label` across both sequences.
    pub fn marginal(&self, label: Label) -> usize {
        self.marginals.get(&label).copied().unwrap_or(0)
    }

    /// Observed disagreement under the 0/1 nominal metric.
    #[allow(clippy::cast_precision_loss)]
    pub fn observed_disagreement(&self) -> f64 {
        let disagreeing: usize = self
            .pairs
            .iter()
            .filter(|((x, y), _)| x != y)
            .map(|(_, count)| count)
            .sum();
        disagreeing as f64 / self.units as f64
    }

    /// Disagreement expected by chance from the pooled marginals.
    #[allow(clippy::cast_precision_loss)]
    pub fn expected_disagreement(&self) -> f64 {
        let n = (2 * self.units) as f64;
        let same: f64 = self
            .marginals
            .values()
            .map(|&n_c| {
                let n_c = n_c as f64;
                n_c * (n_c - 1.0)
            })
            .sum();
        1.0 - same / (n * (n - 1.0))
    }

    /// Krippendorff's alpha of the tallied units.
    pub fn alpha(&self) -> Result<f64, AlphaError> {
        if self.units < 2 {
            return Err(AlphaError::TooFewPairableUnits { found: self.units });
        }
        // One category means every value matches and De is exactly zero.
        if self.marginals.len() < 2 {
            return Err(AlphaError::NoVariability);
        }
        let expected = self.expected_disagreement();
        if expected <= 0.0 {
            return Err(AlphaError::NoVariability);
        }
        Ok(1.0 - self.observed_disagreement() / expected)
    }
}

/// Computes nominal Krippendorff's alpha for two aligned label sequences.
pub fn compute_alpha(a: &[Label], b: &[Label]) -> Result<f64, AlphaError> {
    Coincidences::tally(a, b)?.alpha()
}
