//! CUSUM Detector
//!
//! Two-sided cumulative sum of deviations from the baseline mean, with a
//! reference allowance of `k_sigma` baseline standard deviations per tick.

use serde::{Deserialize, Serialize};

use super::{AccumulatorPair, ChangeDetector};

/// Two-sided CUSUM accumulator.
///
/// # Formula
///
/// ```text
/// pos' = max(pos + delta - k_sigma * std, 0)
/// neg' = max(neg - delta - k_sigma * std, 0)
/// score = max(pos', neg') / std
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CusumPair {
    sums: AccumulatorPair,
}

impl CusumPair {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the positive-drift accumulator.
    #[inline]
    pub fn pos(&self) -> f64 {
        self.sums.pos()
    }

    /// Returns the negative-drift accumulator.
    #[inline]
    pub fn neg(&self) -> f64 {
        self.sums.neg()
    }
}

impl ChangeDetector for CusumPair {
    #[inline]
    fn update(&mut self, delta: f64, baseline_std: f64, k_sigma: f64) -> f64 {
        self.sums.step(delta, baseline_std, k_sigma)
    }

    #[inline]
    fn pressure(&self) -> f64 {
        self.sums.pressure()
    }

    #[inline]
    fn reset(&mut self) {
        self.sums.reset();
    }
}
