//! Streaming computation primitives for the channel smoother and baseline tracker.
//!
//! This module provides the building blocks every channel is made of:
//!
//! - `RingBuffer`: Fixed-size circular buffer holding past smoothed values
//! - `EMA`: Exponential moving average seeded by its first observation
//! - `Baseline`: Mean and floored sample standard deviation of a ring buffer

use serde::{Deserialize, Serialize};

/// Lower bound applied to every baseline standard deviation.
pub const STD_FLOOR: f64 = 1e-12;

/// Fixed-size ring buffer for O(1) sliding window operations.
///
/// Storage is allocated once at construction; pushing into a full buffer
/// overwrites the oldest value in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingBuffer {
    buffer: Vec<f64>,
    capacity: usize,
    head: usize,
    count: usize,
}

impl RingBuffer {
    /// Creates a new ring buffer with the specified capacity (at least one slot).
    #[inline]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![0.0; capacity],
            capacity,
            head: 0,
            count: 0,
        }
    }

    /// Pushes a value and returns the evicted value (if buffer was full).
    #[inline]
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.count == self.capacity {
            Some(self.buffer[self.head])
        } else {
            self.count += 1;
            None
        };

        self.buffer[self.head] = value;
        self.head = (self.head + 1) % self.capacity;
        evicted
    }

    /// Returns the number of elements in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Gets the value at the given index (0 = oldest).
    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        if index >= self.count {
            return None;
        }
        let actual_index = if self.count == self.capacity {
            (self.head + index) % self.capacity
        } else {
            index
        };
        Some(self.buffer[actual_index])
    }

    /// Iterates over the stored values from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.count).filter_map(move |i| self.get(i))
    }

    /// Returns the arithmetic mean, or `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.iter().sum::<f64>() / self.count as f64)
    }

    /// Returns the sample standard deviation (ddof = 1).
    ///
    /// Fewer than two samples carry no dispersion information and yield `0.0`.
    pub fn sample_std(&self) -> f64 {
        let n = self.count;
        let Some(mean) = self.mean() else {
            return 0.0;
        };
        if n < 2 {
            return 0.0;
        }
        let ss: f64 = self.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n - 1) as f64).sqrt()
    }
}

// Slots beyond `count` hold stale data, so equality is over logical contents.
impl PartialEq for RingBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity && self.count == other.count && self.iter().eq(other.iter())
    }
}

/// Exponential Moving Average with O(1) updates.
///
/// The first observation seeds the average; later ones blend in with weight `alpha`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EMA {
    alpha: f64,
    value: Option<f64>,
}

impl EMA {
    /// Creates a new EMA with a specific alpha (decay factor).
    #[inline]
    pub fn with_alpha(alpha: f64) -> Self {
        Self { alpha, value: None }
    }

    /// Updates the EMA with a new value and returns the current EMA.
    #[inline]
    pub fn update(&mut self, new_value: f64) -> f64 {
        let next = match self.value {
            None => new_value,
            Some(prev) => self.alpha * new_value + (1.0 - self.alpha) * prev,
        };
        self.value = Some(next);
        next
    }

    /// Returns the current EMA value, `None` before the first update.
    #[inline]
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Reference distribution of a channel's recent smoothed values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub mean: f64,
    /// Sample standard deviation, floored at `max(eps, STD_FLOOR)`.
    pub std: f64,
}

impl Baseline {
    /// Reads the baseline out of `history`.
    ///
    /// Returns `None` until the history holds at least `max(min_samples, 1)` values.
    pub fn from_history(history: &RingBuffer, min_samples: usize, eps: f64) -> Option<Self> {
        if history.len() < min_samples.max(1) {
            return None;
        }
        let mean = history.mean()?;
        let std = history.sample_std().max(eps.max(STD_FLOOR));
        Some(Self { mean, std })
    }
}
