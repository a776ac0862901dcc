use std::collections::VecDeque;
use super::config::{validate_history_capacity, ConfigError};
use super::sample::TelemetrySample;

/// Bounded, insertion-ordered sample history. Oldest samples are evicted first.
///
/// Invariant: `len() <= capacity()` after every operation.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<TelemetrySample>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        let capacity = validate_history_capacity(capacity)?;
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    pub fn append(&mut self, sample: TelemetrySample) {
        self.samples.push_back(sample);
        self.evict_overflow();
    }

    /// Rejects out-of-range values without touching the buffer.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), ConfigError> {
        self.capacity = validate_history_capacity(capacity)?;
        self.evict_overflow();
        Ok(())
    }

    /// The most recent `n` samples, oldest first.
    pub fn snapshot(&self, n: usize) -> Vec<TelemetrySample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).cloned().collect()
    }

    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelemetrySample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    fn evict_overflow(&mut self) {
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }
}
