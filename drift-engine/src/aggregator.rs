//! Severity Aggregator
//!
//! Combines the per-channel classifications of one instrument tick into a
//! single verdict.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::ChannelDiagnostic;
use crate::config::DetectionThresholds;

/// Per-instrument drift verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Soft,
    Hard,
}

impl Severity {
    /// Decides the verdict from trigger counts.
    ///
    /// Hard wins over soft; both minimums are raised to at least one channel.
    #[inline]
    pub fn classify(
        soft_count: usize,
        hard_count: usize,
        soft_min_channels: usize,
        hard_min_channels: usize,
    ) -> Self {
        if hard_count >= hard_min_channels.max(1) {
            Severity::Hard
        } else if soft_count >= soft_min_channels.max(1) {
            Severity::Soft
        } else {
            Severity::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Soft => "soft",
            Severity::Hard => "hard",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one `observe` call for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub bars_seen: u64,
    pub min_samples: usize,
    /// Channels whose baseline was ready this tick, in input order
    pub ready_channels: Vec<String>,
    pub channels: BTreeMap<String, ChannelDiagnostic>,
    pub soft_channels: Vec<String>,
    pub hard_channels: Vec<String>,
    pub soft_count: usize,
    pub hard_count: usize,
    pub severity: Severity,
    pub drift_detected: bool,
    /// Hard channels for a hard verdict, soft channels for a soft one
    pub drift_channels: Vec<String>,
}

/// Collects channel diagnostics for one tick and builds the `DetectionResult`.
#[derive(Debug, Default)]
pub struct SeverityAggregator {
    ready: Vec<String>,
    soft: Vec<String>,
    hard: Vec<String>,
    channels: BTreeMap<String, ChannelDiagnostic>,
}

impl SeverityAggregator {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one channel's diagnostic.
    ///
    /// Names are de-duplicated by first occurrence; a repeated name replaces
    /// the earlier diagnostic in the channel map.
    pub fn push(&mut self, name: &str, diag: ChannelDiagnostic) {
        if diag.is_ready() {
            push_unique(&mut self.ready, name);
        }
        if diag.soft {
            push_unique(&mut self.soft, name);
        }
        if diag.hard {
            push_unique(&mut self.hard, name);
        }
        self.channels.insert(name.to_owned(), diag);
    }

    /// Applies the minimum-channel thresholds and produces the result.
    pub fn finish(self, bars_seen: u64, thresholds: &DetectionThresholds) -> DetectionResult {
        let soft_count = self.soft.len();
        let hard_count = self.hard.len();
        let severity = Severity::classify(
            soft_count,
            hard_count,
            thresholds.soft_min_channels,
            thresholds.hard_min_channels,
        );
        let drift_channels = match severity {
            Severity::Hard => self.hard.clone(),
            Severity::Soft => self.soft.clone(),
            Severity::None => Vec::new(),
        };

        DetectionResult {
            bars_seen,
            min_samples: thresholds.min_samples,
            ready_channels: self.ready,
            channels: self.channels,
            soft_channels: self.soft,
            hard_channels: self.hard,
            soft_count,
            hard_count,
            severity,
            drift_detected: severity != Severity::None,
            drift_channels,
        }
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_owned());
    }
}
