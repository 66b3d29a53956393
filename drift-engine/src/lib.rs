//! # Drift Engine
//!
//! An online multi-channel drift detector for per-instrument feature streams.
//!
//! Each instrument carries a set of named numeric channels (volatility proxy,
//! directional-flip rate, ...). Every tick the engine smooths each channel,
//! compares it with the baseline of its own recent smoothed values, updates a
//! CUSUM and a Page-Hinkley accumulator, and folds the per-channel triggers
//! into one `none` / `soft` / `hard` verdict.
//!
//! ## Core Components
//!
//! - **Primitives**: `RingBuffer`, `EMA`, `Baseline`
//! - **Detectors**: `CusumPair`, `PageHinkleyPair`
//! - **Channel**: `ChannelState` evaluator and `ChannelDiagnostic`
//! - **Aggregator**: `SeverityAggregator` producing `DetectionResult`
//! - **Engine**: `DriftEngine`, the per-instrument state store
//!
//! ## Example
//!
//! ```rust
//! use drift_engine::{DetectionThresholds, DriftEngine, EngineConfig};
//!
//! let mut engine = DriftEngine::new(EngineConfig::new(32, 0.2));
//! let thresholds = DetectionThresholds::default();
//!
//! // In your bar loop:
//! let result = engine.observe(
//!     "BTCUSDT",
//!     [("volatility", Some(0.012)), ("flip_rate", None)],
//!     &thresholds,
//! );
//! if result.drift_detected {
//!     // pause the strategy mode
//! }
//! ```

pub mod aggregator;
pub mod channel;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod primitives;

// Re-exports
pub use aggregator::{DetectionResult, Severity, SeverityAggregator};
pub use channel::{ChannelDiagnostic, ChannelPhase, ChannelState};
pub use config::{DetectionThresholds, DriftConfig, EngineConfig, EvictionPolicy};
pub use detectors::{
    cusum::CusumPair,
    page_hinkley::PageHinkleyPair,
    ChangeDetector,
};
pub use engine::{shard_for, DriftEngine, InstrumentState};
pub use error::ConfigError;
pub use primitives::{Baseline, EMA, RingBuffer};
