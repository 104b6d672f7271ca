//! Request cadence control
//!
//! Delays are sampled uniformly from configured millisecond ranges to keep
//! the request cadence inside a human-plausible envelope. This is a
//! block-likelihood reducer, not a rate limiter: there is no hard bound and
//! no shared state beyond the thread-local RNG.

use crate::config::PacingConfig;
use rand::Rng;
use std::time::Duration;

/// Samples inter-record, inter-page, and long-break delays
#[derive(Debug, Clone)]
pub struct Pacer {
    config: PacingConfig,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Delay between two records on the same page
    pub fn record_delay(&self) -> Duration {
        sample_ms(self.config.record_delay_ms)
    }

    /// Delay between two listing pages
    pub fn page_delay(&self) -> Duration {
        sample_ms(self.config.page_delay_ms)
    }

    /// Longer pause after every Nth page, `None` otherwise
    pub fn long_break(&self, page: u32) -> Option<Duration> {
        if page > 0 && page % self.config.long_break_every == 0 {
            Some(sample_ms(self.config.long_break_ms))
        } else {
            None
        }
    }
}

/// Samples a duration uniformly from a `[lo, hi]` millisecond range
pub fn sample_ms(range: [u64; 2]) -> Duration {
    let ms = rand::thread_rng().gen_range(range[0]..=range[1]);
    Duration::from_millis(ms)
}
