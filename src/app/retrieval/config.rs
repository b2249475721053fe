//! Record retrieval configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::retrieval;
use crate::errors::{ConfigError, ConfigResult};

/// Batch sizes and deadlines for ContentAPI retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub batch_size: usize,
    /// Size used for the single retry after a failed batch
    pub reduced_batch_size: usize,
    /// Failed batches at or below this size are not retried
    pub min_retry_batch_size: usize,
    /// Soft deadline for a retrieval loop, also the per-request timeout
    #[serde(with = "humantime_serde")]
    pub time_budget: Duration,
    #[serde(with = "humantime_serde")]
    pub batch_pause: Duration,
    /// Pause after every this many batches, never when 0
    pub pause_every_batches: usize,
    /// `$top` of the single-shot request for all records
    pub all_records_top: usize,
    pub page_sample_size: usize,
    pub extended_sample_size: usize,
    /// Floor for totals reported past the first page
    pub min_approximate_total: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            batch_size: retrieval::BATCH_SIZE,
            reduced_batch_size: retrieval::REDUCED_BATCH_SIZE,
            min_retry_batch_size: retrieval::MIN_RETRY_BATCH_SIZE,
            time_budget: retrieval::TIME_BUDGET,
            batch_pause: retrieval::BATCH_PAUSE,
            pause_every_batches: retrieval::PAUSE_EVERY_BATCHES,
            all_records_top: retrieval::ALL_RECORDS_TOP,
            page_sample_size: retrieval::PAGE_SAMPLE_SIZE,
            extended_sample_size: retrieval::EXTENDED_SAMPLE_SIZE,
            min_approximate_total: retrieval::MIN_APPROXIMATE_TOTAL,
        }
    }
}

impl RetrievalConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration, every: usize) -> Self {
        self.batch_pause = pause;
        self.pause_every_batches = every;
        self
    }

    pub fn with_page_samples(mut self, sample: usize, extended: usize) -> Self {
        self.page_sample_size = sample;
        self.extended_sample_size = extended;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for zero sizes or a zero budget
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("retrieval.batch_size", self.batch_size),
            ("retrieval.reduced_batch_size", self.reduced_batch_size),
            ("retrieval.all_records_top", self.all_records_top),
            ("retrieval.page_sample_size", self.page_sample_size),
            ("retrieval.extended_sample_size", self.extended_sample_size),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "0".to_string(),
                    reason: "Must be at least 1".to_string(),
                });
            }
        }

        if self.extended_sample_size < self.page_sample_size {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.extended_sample_size".to_string(),
                value: self.extended_sample_size.to_string(),
                reason: "Must not be smaller than page_sample_size".to_string(),
            });
        }

        if self.time_budget.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.time_budget".to_string(),
                value: "0s".to_string(),
                reason: "Budget must be positive".to_string(),
            });
        }

        Ok(())
    }
}
