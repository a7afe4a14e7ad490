//! Dwell-time estimation for auto-advancing slides

use std::time::Duration;
use serde::{Serialize, Deserialize};

/// Base dwell time before any words are counted
pub const DEFAULT_BASE_MS: u64 = 1300;

/// Additional dwell time per word
pub const DEFAULT_PER_WORD_MS: u64 = 130;

/// Parameters of the dwell-time estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellConfig {
    pub base_ms: u64,
    pub per_word_ms: u64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            base_ms: DEFAULT_BASE_MS,
            per_word_ms: DEFAULT_PER_WORD_MS,
        }
    }
}

impl DwellConfig {
    /// Estimate how long `text` should stay on screen
    ///
    /// `base + (words + 1) * per_word`, where words are the
    /// whitespace-delimited tokens of the trimmed text.
    pub fn estimate(&self, text: &str) -> Duration {
        let words = word_count(text) as u64;
        let millis = self
            .base_ms
            .saturating_add(words.saturating_add(1).saturating_mul(self.per_word_ms));
        Duration::from_millis(millis)
    }
}

/// Estimate dwell time with the default parameters
pub fn estimate_dwell(text: &str) -> Duration {
    DwellConfig::default().estimate(text)
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
