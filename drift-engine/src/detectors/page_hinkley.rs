//! Page-Hinkley Detector
//!
//! Same one-sided shape as CUSUM with its own tolerance `ph_delta_sigma`
//! and its own accumulators, so the two detectors can be tuned apart.

use serde::{Deserialize, Serialize};

use super::{AccumulatorPair, ChangeDetector};

/// Two-sided Page-Hinkley accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageHinkleyPair {
    sums: AccumulatorPair,
}

impl PageHinkleyPair {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn pos(&self) -> f64 {
        self.sums.pos()
    }

    #[inline]
    pub fn neg(&self) -> f64 {
        self.sums.neg()
    }
}

impl ChangeDetector for PageHinkleyPair {
    #[inline]
    fn update(&mut self, delta: f64, baseline_std: f64, delta_sigma: f64) -> f64 {
        self.sums.step(delta, baseline_std, delta_sigma)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::cusum::CusumPair;

    #[test]
    fn test_page_hinkley_independent_of_cusum() {
        let mut ph = PageHinkleyPair::new();
        let mut cusum = CusumPair::new();

        for _ in 0..4 {
            ph.update(0.4, 1.0, 0.25);
            cusum.update(0.4, 1.0, 0.5);
        }

        // Tighter tolerance keeps accumulating where CUSUM stays at zero.
        assert!((ph.pos() - 0.6).abs() < 1e-12);
        assert_eq!(cusum.pressure(), 0.0);
    }

    #[test]
    fn test_page_hinkley_negative_drift() {
        let mut ph = PageHinkleyPair::new();
        let score = ph.update(-1.25, 1.0, 0.25);
        assert!((score - 1.0).abs() < 1e-12);
        assert_eq!(ph.pos(), 0.0);
    }
}
