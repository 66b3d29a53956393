//! Drift Engine
//!
//! Owns the per-instrument state store and runs one tick of the channel
//! evaluator and severity aggregator per `observe` call.
//!
//! The engine performs no internal synchronization. Calls for one instrument
//! must be ordered by the caller; to process instruments in parallel, give
//! each worker its own engine and route instruments with [`shard_for`].

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::aggregator::{DetectionResult, SeverityAggregator};
use crate::channel::{ChannelDiagnostic, ChannelPhase, ChannelState};
use crate::config::{DetectionThresholds, EngineConfig, EvictionPolicy};

/// State of one monitored instrument.
#[derive(Debug, Clone, Default)]
pub struct InstrumentState {
    bars_seen: u64,
    channels: HashMap<String, ChannelState>,
    /// Engine sequence number of the last observation (LRU bookkeeping)
    last_touched: u64,
}

impl InstrumentState {
    #[inline]
    pub fn bars_seen(&self) -> u64 {
        self.bars_seen
    }

    #[inline]
    pub fn channel(&self, name: &str) -> Option<&ChannelState> {
        self.channels.get(name)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Online multi-channel drift detector keyed by instrument id.
#[derive(Debug, Clone)]
pub struct DriftEngine {
    config: EngineConfig,
    instruments: HashMap<String, InstrumentState>,
    sequence: u64,
}

impl DriftEngine {
    /// Creates an engine, clamping `window` and `smoothing_alpha` into range.
    pub fn new(config: EngineConfig) -> Self {
        let clamped = config.clamped();
        if clamped != config {
            warn!(
                requested_window = config.window,
                window = clamped.window,
                requested_alpha = config.smoothing_alpha,
                alpha = clamped.smoothing_alpha,
                eviction = ?clamped.eviction,
                "engine config clamped into valid range"
            );
        }
        Self {
            config: clamped,
            instruments: HashMap::new(),
            sequence: 0,
        }
    }

    /// Returns the effective (clamped) configuration.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Feeds one tick of channel values for `instrument`.
    ///
    /// `None` or non-finite values mark a channel unavailable for this tick
    /// without touching its state. The instrument is created on first use.
    pub fn observe<I, K>(
        &mut self,
        instrument: &str,
        channel_values: I,
        thresholds: &DetectionThresholds,
    ) -> DetectionResult
    where
        I: IntoIterator<Item = (K, Option<f64>)>,
        K: AsRef<str>,
    {
        self.sequence += 1;
        if !self.instruments.contains_key(instrument) {
            self.evict_for_insert();
        }

        let window = self.config.window;
        let alpha = self.config.smoothing_alpha;
        let state = self.instruments.entry(instrument.to_owned()).or_default();
        state.bars_seen += 1;
        state.last_touched = self.sequence;

        let mut aggregator = SeverityAggregator::new();
        for (name, value) in channel_values {
            let name = name.as_ref();
            if value.is_some_and(f64::is_finite) && !state.channels.contains_key(name) {
                state
                    .channels
                    .insert(name.to_owned(), ChannelState::new(window, alpha));
            }
            let diag = match state.channels.get_mut(name) {
                Some(channel) => {
                    let before = channel.phase(thresholds.min_samples);
                    let diag = channel.observe(value, thresholds);
                    if before != ChannelPhase::Ready
                        && channel.phase(thresholds.min_samples) == ChannelPhase::Ready
                    {
                        debug!(
                            instrument,
                            channel = name,
                            bars_seen = state.bars_seen,
                            "channel baseline ready"
                        );
                    }
                    diag
                }
                None => ChannelDiagnostic::unavailable(),
            };
            trace!(
                instrument,
                channel = name,
                available = diag.available,
                z_score = ?diag.z_score,
                cusum = ?diag.cusum_score,
                page_hinkley = ?diag.page_hinkley_score,
                soft = diag.soft,
                hard = diag.hard,
                "channel evaluated"
            );
            aggregator.push(name, diag);
        }

        let result = aggregator.finish(state.bars_seen, thresholds);
        if result.drift_detected {
            debug!(
                instrument,
                severity = %result.severity,
                channels = ?result.drift_channels,
                bars_seen = result.bars_seen,
                "drift detected"
            );
        }
        result
    }

    /// Drops all state for `instrument`. Unknown instruments are ignored.
    ///
    /// Returns true if state existed.
    pub fn reset_pair(&mut self, instrument: &str) -> bool {
        let existed = self.instruments.remove(instrument).is_some();
        if existed {
            debug!(instrument, "instrument state reset");
        }
        existed
    }

    /// Drops the state of every instrument.
    pub fn reset_all(&mut self) {
        debug!(instruments = self.instruments.len(), "all instrument state reset");
        self.instruments.clear();
    }

    /// Returns the number of instruments currently tracked.
    #[inline]
    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    #[inline]
    pub fn instrument(&self, instrument: &str) -> Option<&InstrumentState> {
        self.instruments.get(instrument)
    }

    /// Returns how many ticks `instrument` has seen, `None` if untracked.
    #[inline]
    pub fn bars_seen(&self, instrument: &str) -> Option<u64> {
        self.instruments.get(instrument).map(InstrumentState::bars_seen)
    }

    #[inline]
    pub fn channel_state(&self, instrument: &str, channel: &str) -> Option<&ChannelState> {
        self.instruments.get(instrument)?.channel(channel)
    }

    /// Returns the warmup phase of a channel; untracked channels are cold.
    pub fn channel_phase(
        &self,
        instrument: &str,
        channel: &str,
        min_samples: usize,
    ) -> ChannelPhase {
        self.channel_state(instrument, channel)
            .map_or(ChannelPhase::Cold, |ch| ch.phase(min_samples))
    }

    fn evict_for_insert(&mut self) {
        let EvictionPolicy::Lru { max_instruments } = self.config.eviction else {
            return;
        };
        while self.instruments.len() >= max_instruments {
            let Some(oldest) = self
                .instruments
                .iter()
                .min_by_key(|(_, state)| state.last_touched)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            self.instruments.remove(&oldest);
            debug!(
                instrument = %oldest,
                max_instruments,
                "evicted least recently observed instrument"
            );
        }
    }
}

impl Default for DriftEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Maps an instrument id to one of `shards` workers.
///
/// Uses FNV-1a so the assignment is stable across processes and runs.
pub fn shard_for(instrument: &str, shards: usize) -> usize {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    if shards <= 1 {
        return 0;
    }
    let hash = instrument
        .bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME));
    (hash % shards as u64) as usize
}
