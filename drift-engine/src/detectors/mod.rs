//! Change-point accumulators.
//!
//! Each channel carries two independent detectors, a CUSUM pair and a
//! Page-Hinkley pair. Both track positive and negative drift pressure in
//! one-sided sums floored at zero, so a small persistent bias keeps building
//! up even when no single tick is an outlier.

pub mod cusum;
pub mod page_hinkley;

use serde::{Deserialize, Serialize};

/// Trait for streaming change-point detectors.
pub trait ChangeDetector {
    /// Folds one deviation from the baseline mean into the accumulators and
    /// returns the standardized score.
    ///
    /// `sensitivity` is the per-tick allowance in units of `baseline_std`.
    fn update(&mut self, delta: f64, baseline_std: f64, sensitivity: f64) -> f64;

    /// Returns the larger of the two one-sided accumulators.
    fn pressure(&self) -> f64;

    /// Resets both accumulators to zero.
    fn reset(&mut self);
}

/// A pair of one-sided accumulators, one per drift direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorPair {
    pos: f64,
    neg: f64,
}

impl AccumulatorPair {
    /// Advances both sides by `delta` less the allowance and returns
    /// `max(pos, neg) / baseline_std`.
    #[inline]
    pub fn step(&mut self, delta: f64, baseline_std: f64, sensitivity: f64) -> f64 {
        let allowance = sensitivity * baseline_std;
        self.pos = (self.pos + delta - allowance).max(0.0);
        self.neg = (self.neg - delta - allowance).max(0.0);
        self.pressure() / baseline_std
    }

    #[inline]
    pub fn pos(&self) -> f64 {
        self.pos
    }

    #[inline]
    pub fn neg(&self) -> f64 {
        self.neg
    }

    #[inline]
    pub fn pressure(&self) -> f64 {
        self.pos.max(self.neg)
    }

    #[inline]
    pub fn reset(&mut self) {
        self.pos = 0.0;
        self.neg = 0.0;
    }
}
