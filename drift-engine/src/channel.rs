//! Channel Evaluator
//!
//! One `ChannelState` per (instrument, channel) pair. Each available tick the
//! channel compares its new smoothed value against the baseline of its past
//! smoothed values, feeds the deviation to both change-point detectors and
//! classifies the result as soft and/or hard triggered.

use serde::{Deserialize, Serialize};

use crate::config::DetectionThresholds;
use crate::detectors::cusum::CusumPair;
use crate::detectors::page_hinkley::PageHinkleyPair;
use crate::detectors::ChangeDetector;
use crate::primitives::{Baseline, EMA, RingBuffer};

/// Warmup phase of a channel.
///
/// Phases only move forward; an unavailable tick leaves the phase as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelPhase {
    /// No finite observation yet
    Cold,
    /// Smoothing, but the history is shorter than `min_samples`
    Warming,
    /// Scored on every available tick
    Ready,
}

/// Per-tick diagnostic record for one channel.
///
/// Optional fields are `None` when the input was unavailable, and the
/// baseline and score fields are also `None` while the channel is warming.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelDiagnostic {
    pub available: bool,
    pub value: Option<f64>,
    pub smoothed: Option<f64>,
    pub baseline_mean: Option<f64>,
    pub baseline_std: Option<f64>,
    pub z_score: Option<f64>,
    pub cusum_score: Option<f64>,
    pub page_hinkley_score: Option<f64>,
    pub soft: bool,
    pub hard: bool,
}

impl ChannelDiagnostic {
    /// Record for a missing or non-finite input.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Returns true if the baseline was ready and scores were computed.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.z_score.is_some()
    }
}

/// Smoother, baseline history and change-point accumulators of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    ema: EMA,
    history: RingBuffer,
    cusum: CusumPair,
    page_hinkley: PageHinkleyPair,
}

impl ChannelState {
    /// Creates a cold channel.
    ///
    /// `window` and `alpha` are expected to be clamped already by the engine.
    pub fn new(window: usize, alpha: f64) -> Self {
        Self {
            ema: EMA::with_alpha(alpha),
            history: RingBuffer::new(window),
            cusum: CusumPair::new(),
            page_hinkley: PageHinkleyPair::new(),
        }
    }

    /// Processes one tick.
    ///
    /// A missing or non-finite `value` leaves the state untouched and yields
    /// an unavailable diagnostic.
    pub fn observe(
        &mut self,
        value: Option<f64>,
        thresholds: &DetectionThresholds,
    ) -> ChannelDiagnostic {
        let Some(value) = value.filter(|v| v.is_finite()) else {
            return ChannelDiagnostic::unavailable();
        };

        // The baseline covers past ticks only.
        let baseline =
            Baseline::from_history(&self.history, thresholds.min_samples, thresholds.eps);
        let smoothed = self.ema.update(value);

        let mut diag = ChannelDiagnostic {
            available: true,
            value: Some(value),
            smoothed: Some(smoothed),
            ..ChannelDiagnostic::default()
        };

        match baseline {
            Some(baseline) => {
                let delta = smoothed - baseline.mean;
                let z_score = delta.abs() / baseline.std;
                let cusum_score = self.cusum.update(delta, baseline.std, thresholds.cusum_k_sigma);
                let ph_score =
                    self.page_hinkley.update(delta, baseline.std, thresholds.ph_delta_sigma);

                diag.baseline_mean = Some(baseline.mean);
                diag.baseline_std = Some(baseline.std);
                diag.z_score = Some(z_score);
                diag.cusum_score = Some(cusum_score);
                diag.page_hinkley_score = Some(ph_score);
                diag.soft = z_score >= thresholds.z_soft
                    || cusum_score >= thresholds.cusum_soft
                    || ph_score >= thresholds.ph_soft;
                diag.hard = z_score >= thresholds.z_hard
                    || cusum_score >= thresholds.cusum_hard
                    || ph_score >= thresholds.ph_hard;
            }
            None => {
                // Accumulation starts only once the baseline is ready.
                self.cusum.reset();
                self.page_hinkley.reset();
            }
        }

        self.history.push(smoothed);
        diag
    }

    /// Returns the warmup phase for the given `min_samples`.
    pub fn phase(&self, min_samples: usize) -> ChannelPhase {
        if self.ema.value().is_none() {
            ChannelPhase::Cold
        } else if self.history.len() < min_samples.max(1) {
            ChannelPhase::Warming
        } else {
            ChannelPhase::Ready
        }
    }

    /// Returns the current smoothed value.
    #[inline]
    pub fn ema(&self) -> Option<f64> {
        self.ema.value()
    }

    /// Returns the history of past smoothed values.
    #[inline]
    pub fn history(&self) -> &RingBuffer {
        &self.history
    }

    #[inline]
    pub fn cusum(&self) -> &CusumPair {
        &self.cusum
    }

    #[inline]
    pub fn page_hinkley(&self) -> &PageHinkleyPair {
        &self.page_hinkley
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(min_samples: usize) -> DetectionThresholds {
        DetectionThresholds {
            min_samples,
            ..DetectionThresholds::default()
        }
    }

    #[test]
    fn test_phase_transitions() {
        let th = thresholds(3);
        let mut ch = ChannelState::new(8, 0.5);
        assert_eq!(ch.phase(th.min_samples), ChannelPhase::Cold);

        ch.observe(Some(1.0), &th);
        assert_eq!(ch.phase(th.min_samples), ChannelPhase::Warming);

        ch.observe(None, &th);
        assert_eq!(ch.phase(th.min_samples), ChannelPhase::Warming);

        ch.observe(Some(1.0), &th);
        ch.observe(Some(1.0), &th);
        assert_eq!(ch.phase(th.min_samples), ChannelPhase::Ready);
    }

    #[test]
    fn test_warming_reports_no_scores() {
        let th = thresholds(4);
        let mut ch = ChannelState::new(8, 0.5);

        let diag = ch.observe(Some(2.0), &th);
        assert!(diag.available);
        assert_eq!(diag.value, Some(2.0));
        assert_eq!(diag.smoothed, Some(2.0));
        assert_eq!(diag.baseline_mean, None);
        assert_eq!(diag.z_score, None);
        assert!(!diag.soft && !diag.hard);
    }

    #[test]
    fn test_non_finite_is_unavailable_and_inert() {
        let th = thresholds(2);
        let mut ch = ChannelState::new(8, 0.5);
        for v in [1.0, 2.0, 3.0] {
            ch.observe(Some(v), &th);
        }
        let before = ch.clone();

        for bad in [None, Some(f64::NAN), Some(f64::INFINITY), Some(f64::NEG_INFINITY)] {
            let diag = ch.observe(bad, &th);
            assert_eq!(diag, ChannelDiagnostic::unavailable());
        }
        assert_eq!(ch, before);
    }

    #[test]
    fn test_smoothing_feeds_history() {
        let th = thresholds(100);
        let mut ch = ChannelState::new(8, 0.5);
        ch.observe(Some(10.0), &th);
        let diag = ch.observe(Some(20.0), &th);

        assert_eq!(diag.smoothed, Some(15.0));
        assert_eq!(ch.history().iter().collect::<Vec<_>>(), vec![10.0, 15.0]);
    }

    #[test]
    fn test_history_bounded_by_window() {
        let th = thresholds(4);
        let mut ch = ChannelState::new(8, 1.0);
        for i in 0..20 {
            ch.observe(Some(i as f64), &th);
        }
        assert_eq!(ch.history().len(), 8);
        assert_eq!(ch.history().get(0), Some(12.0));
    }

    #[test]
    fn test_ready_but_quiet_channel() {
        let th = thresholds(4);
        let mut ch = ChannelState::new(8, 1.0);
        for v in [9.0, 11.0, 9.0, 11.0] {
            ch.observe(Some(v), &th);
        }

        // Baseline mean 10, sample std sqrt(4/3).
        let diag = ch.observe(Some(10.5), &th);
        assert!(diag.is_ready());
        assert_eq!(diag.baseline_mean, Some(10.0));
        let std = (4.0f64 / 3.0).sqrt();
        assert!((diag.baseline_std.unwrap() - std).abs() < 1e-12);
        assert!((diag.z_score.unwrap() - 0.5 / std).abs() < 1e-12);
        assert_eq!(diag.cusum_score, Some(0.0));
        // 0.5 - 0.25 * std > 0, so Page-Hinkley registers pressure.
        assert!(diag.page_hinkley_score.unwrap() > 0.0);
        assert!(!diag.soft && !diag.hard);
    }

    #[test]
    fn test_accumulators_reset_while_not_ready() {
        let mut ch = ChannelState::new(8, 1.0);
        let th = thresholds(4);
        for _ in 0..4 {
            ch.observe(Some(10.0), &th);
        }
        let diag = ch.observe(Some(12.0), &th);
        assert!(diag.cusum_score.unwrap() > 0.0);
        assert!(ch.cusum().pressure() > 0.0);

        // Raising min_samples above the history length un-readies the baseline.
        let diag = ch.observe(Some(12.0), &thresholds(100));
        assert!(!diag.is_ready());
        assert_eq!(ch.cusum().pressure(), 0.0);
        assert_eq!(ch.page_hinkley().pressure(), 0.0);
    }

    #[test]
    fn test_triggers_follow_thresholds() {
        let th = DetectionThresholds {
            min_samples: 4,
            z_soft: 1.0,
            z_hard: 100.0,
            cusum_soft: f64::INFINITY,
            cusum_hard: f64::INFINITY,
            ph_soft: f64::INFINITY,
            ph_hard: f64::INFINITY,
            ..DetectionThresholds::default()
        };
        let mut ch = ChannelState::new(8, 1.0);
        for v in [9.0, 11.0, 9.0, 11.0] {
            ch.observe(Some(v), &th);
        }
        let diag = ch.observe(Some(13.0), &th);
        assert!(diag.soft);
        assert!(!diag.hard);
    }
}
