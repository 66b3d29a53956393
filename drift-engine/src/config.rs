//! Engine configuration structures.
//!
//! `EngineConfig` is fixed when the engine is built; `DetectionThresholds`
//! travel with every `observe` call so callers can retune them per tick.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Smallest baseline window the engine will run with.
pub const MIN_WINDOW: usize = 8;
/// Bounds for the EMA smoothing factor.
pub const MIN_ALPHA: f64 = 0.01;
pub const MAX_ALPHA: f64 = 1.0;

/// What to do with per-instrument state as the instrument set grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Keep every instrument until `reset_pair` drops it.
    #[default]
    Unbounded,
    /// Drop the least recently observed instrument once `max_instruments`
    /// would be exceeded.
    Lru { max_instruments: usize },
}

/// Construction-time engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of each channel's smoothed-value history
    pub window: usize,
    /// EMA weight of the newest observation
    pub smoothing_alpha: f64,
    /// Per-instrument state retention
    pub eviction: EvictionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: 48,
            smoothing_alpha: 0.2,
            eviction: EvictionPolicy::Unbounded,
        }
    }
}

impl EngineConfig {
    pub fn new(window: usize, smoothing_alpha: f64) -> Self {
        Self {
            window,
            smoothing_alpha,
            ..Self::default()
        }
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Returns a copy with every parameter clamped into its valid range.
    ///
    /// A non-finite alpha falls back to the default alpha.
    pub fn clamped(&self) -> Self {
        let smoothing_alpha = if self.smoothing_alpha.is_finite() {
            self.smoothing_alpha.clamp(MIN_ALPHA, MAX_ALPHA)
        } else {
            Self::default().smoothing_alpha
        };
        let eviction = match self.eviction {
            EvictionPolicy::Lru { max_instruments } => EvictionPolicy::Lru {
                max_instruments: max_instruments.max(1),
            },
            other => other,
        };
        Self {
            window: self.window.max(MIN_WINDOW),
            smoothing_alpha,
            eviction,
        }
    }
}

/// Per-call detection thresholds.
///
/// Values are not validated: negative or inverted thresholds produce
/// always- or never-triggering channels, deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionThresholds {
    /// History length required before a channel is scored
    pub min_samples: usize,
    /// Floor for the baseline standard deviation (itself floored at 1e-12)
    pub eps: f64,
    pub z_soft: f64,
    pub z_hard: f64,
    /// CUSUM allowance in baseline standard deviations
    pub cusum_k_sigma: f64,
    pub cusum_soft: f64,
    pub cusum_hard: f64,
    /// Page-Hinkley tolerance in baseline standard deviations
    pub ph_delta_sigma: f64,
    pub ph_soft: f64,
    pub ph_hard: f64,
    /// Soft-triggered channels needed for a soft verdict (at least 1)
    pub soft_min_channels: usize,
    /// Hard-triggered channels needed for a hard verdict (at least 1)
    pub hard_min_channels: usize,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            min_samples: 24,
            eps: 1e-9,
            z_soft: 2.5,
            z_hard: 4.0,
            cusum_k_sigma: 0.5,
            cusum_soft: 4.0,
            cusum_hard: 8.0,
            ph_delta_sigma: 0.25,
            ph_soft: 5.0,
            ph_hard: 10.0,
            soft_min_channels: 1,
            hard_min_channels: 1,
        }
    }
}

/// Complete drift configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DriftConfig {
    pub engine: EngineConfig,
    pub thresholds: DetectionThresholds,
}

impl DriftConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text; omitted keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Saves configuration to a TOML file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_window_and_alpha() {
        let cfg = EngineConfig::new(3, 5.0).clamped();
        assert_eq!(cfg.window, MIN_WINDOW);
        assert_eq!(cfg.smoothing_alpha, MAX_ALPHA);

        let cfg = EngineConfig::new(64, 0.0).clamped();
        assert_eq!(cfg.window, 64);
        assert_eq!(cfg.smoothing_alpha, MIN_ALPHA);

        let cfg = EngineConfig::new(64, f64::NAN).clamped();
        assert_eq!(cfg.smoothing_alpha, EngineConfig::default().smoothing_alpha);
    }

    #[test]
    fn test_clamp_lru_capacity() {
        let cfg = EngineConfig::default()
            .with_eviction(EvictionPolicy::Lru { max_instruments: 0 })
            .clamped();
        assert_eq!(cfg.eviction, EvictionPolicy::Lru { max_instruments: 1 });
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg = DriftConfig::from_toml_str(
            r#"
            [engine]
            window = 16

            [engine.eviction]
            policy = "lru"
            max_instruments = 200

            [thresholds]
            z_hard = 3.0
            soft_min_channels = 2
            "#,
        )
        .unwrap();

        assert_eq!(cfg.engine.window, 16);
        assert_eq!(cfg.engine.smoothing_alpha, 0.2);
        assert_eq!(cfg.engine.eviction, EvictionPolicy::Lru { max_instruments: 200 });
        assert_eq!(cfg.thresholds.z_hard, 3.0);
        assert_eq!(cfg.thresholds.soft_min_channels, 2);
        assert_eq!(cfg.thresholds.min_samples, 24);
    }

    #[test]
    fn test_toml_round_trip() {
        let cfg = DriftConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(DriftConfig::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let err = DriftConfig::from_toml_str("[engine]\nwindow = \"wide\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
