//! ContentAPI record retrieval
//!
//! [`RecordRetriever`] reads one application's records from its ContentAPI
//! endpoint. Large reads are split into `$top`/`$skip` batches under a soft
//! time budget; a timed-out batch ends the read and a failed batch is retried
//! once at a reduced size. Whatever was gathered before a failure is
//! returned rather than discarded.
//!
//! - `config`: batch sizes, budget, and pause cadence
//! - `page`: pages, totals, and retrieval outcomes

use std::sync::Arc;

use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::app::client::{ArcherClient, ArcherRequest};
use crate::app::envelope::ArcherEnvelope;
use crate::app::models::Record;
use crate::errors::{RetrievalError, RetrievalResult};

pub mod config;
pub mod page;

pub use config::RetrievalConfig;
pub use page::{synthetic_record, RecordPage, RetrievalOutcome, StopReason, TotalCount};

/// Reads records from one ContentAPI endpoint
#[derive(Debug, Clone)]
pub struct RecordRetriever {
    client: Arc<ArcherClient>,
    endpoint: String,
    config: RetrievalConfig,
}

impl RecordRetriever {
    pub fn new(client: Arc<ArcherClient>, endpoint: impl Into<String>, config: RetrievalConfig) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            config,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch one batch of up to `top` records starting at `skip`
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::BatchTimeout` if the request exceeds the time
    /// budget, `RetrievalError::BatchNetworkError` for transport failures and
    /// non-success statuses, or `RetrievalError::InvalidResponse` for bodies
    /// that are not record lists
    pub async fn fetch_batch(&self, skip: usize, top: usize) -> RetrievalResult<Vec<Record>> {
        let deadline = self.config.time_budget;
        let mut request = ArcherRequest::get(&self.endpoint)
            .with_query("$top", top)
            .with_timeout(deadline);
        if skip > 0 {
            request = request.with_query("$skip", skip);
        }

        debug!("Fetching {} $top={} $skip={}", self.endpoint, top, skip);
        let response = match timeout(deadline, self.client.execute(request)).await {
            Err(_) => {
                return Err(RetrievalError::BatchTimeout {
                    skip,
                    seconds: deadline.as_secs(),
                })
            }
            Ok(Err(e)) if e.is_timeout() => {
                return Err(RetrievalError::BatchTimeout {
                    skip,
                    seconds: deadline.as_secs(),
                })
            }
            Ok(Err(e)) => {
                return Err(RetrievalError::BatchNetworkError {
                    skip,
                    reason: e.to_string(),
                })
            }
            Ok(Ok(response)) => response,
        };

        if response.status == 401 {
            self.client.invalidate_session().await;
        }
        if !response.is_success() {
            return Err(RetrievalError::BatchNetworkError {
                skip,
                reason: format!("HTTP {}", response.status),
            });
        }

        let envelope = ArcherEnvelope::decode(&self.endpoint, response.body).map_err(|e| {
            RetrievalError::InvalidResponse {
                reason: e.to_string(),
            }
        })?;
        Ok(envelope.into_objects())
    }

    /// Every record, in one request if possible
    ///
    /// A single `$top` request is tried first; if it fails for any reason
    /// the read falls back to [`fetch_paginated`](Self::fetch_paginated).
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::InvalidResponse` if the paginated fallback
    /// cannot decode a batch
    pub async fn fetch_all(&self) -> RetrievalResult<RetrievalOutcome> {
        let top = self.config.all_records_top;
        match self.fetch_batch(0, top).await {
            Ok(records) => {
                let stop_reason = if records.len() >= top {
                    warn!(
                        "{} returned the full {} records; more may exist",
                        self.endpoint, top
                    );
                    StopReason::MaxRecords
                } else {
                    StopReason::Exhausted
                };
                info!("Fetched {} records from {} in one request", records.len(), self.endpoint);
                Ok(RetrievalOutcome {
                    records,
                    batches: 1,
                    stop_reason,
                })
            }
            Err(e) => {
                warn!("Single-request read of {} failed, paginating: {}", self.endpoint, e);
                self.fetch_paginated(None).await
            }
        }
    }

    /// Records in batches until exhausted, out of time, or at `max_records`
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::InvalidResponse` if a batch cannot be
    /// decoded; timeouts and network failures end the read with the records
    /// gathered so far
    pub async fn fetch_paginated(&self, max_records: Option<usize>) -> RetrievalResult<RetrievalOutcome> {
        let started = Instant::now();
        let mut records: Vec<Record> = Vec::new();
        let mut batch_size = self.config.batch_size;
        let mut skip = 0;
        let mut batches = 0;

        let stop_reason = loop {
            if max_records.is_some_and(|max| records.len() >= max) {
                break StopReason::MaxRecords;
            }
            if started.elapsed() >= self.config.time_budget {
                warn!(
                    "Time budget of {:?} spent after {} records from {}",
                    self.config.time_budget,
                    records.len(),
                    self.endpoint
                );
                break StopReason::TimeBudget;
            }

            batches += 1;
            let batch = match self.fetch_batch(skip, batch_size).await {
                Ok(batch) => batch,
                Err(e @ RetrievalError::InvalidResponse { .. }) => return Err(e),
                Err(e @ RetrievalError::BatchTimeout { .. }) => {
                    warn!("{}; returning {} records", e, records.len());
                    break StopReason::Timeout;
                }
                Err(e) if batch_size > self.config.min_retry_batch_size => {
                    let reduced = self.config.reduced_batch_size.min(batch_size);
                    warn!("{}; retrying with batch size {}", e, reduced);
                    batches += 1;
                    match self.fetch_batch(skip, reduced).await {
                        Ok(batch) => {
                            batch_size = reduced;
                            batch
                        }
                        Err(e) => {
                            warn!("Retry failed: {}; returning {} records", e, records.len());
                            break StopReason::NetworkError;
                        }
                    }
                }
                Err(e) => {
                    warn!("{}; returning {} records", e, records.len());
                    break StopReason::NetworkError;
                }
            };

            let received = batch.len();
            records.extend(batch);
            skip += received;

            if received < batch_size {
                break StopReason::Exhausted;
            }
            // zero disables pausing
            let every = self.config.pause_every_batches;
            if every > 0 && batches % every == 0 {
                tokio::time::sleep(self.config.batch_pause).await;
            }
        };

        if let Some(max) = max_records {
            records.truncate(max);
        }

        info!(
            "Fetched {} records from {} in {} batch(es) ({:?})",
            records.len(),
            self.endpoint,
            batches,
            stop_reason
        );
        Ok(RetrievalOutcome {
            records,
            batches,
            stop_reason,
        })
    }

    /// One page of records
    ///
    /// Page 1 is served from a sample whose size is reported as the total.
    /// Later pages are fetched directly and report a lower-bound total.
    /// Page 0 is treated as page 1.
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::PageOutOfRange` without any request if the
    /// page's offset overflows, otherwise the error of the request that
    /// fetched the page
    pub async fn fetch_page(&self, page_size: usize, page_number: usize) -> RetrievalResult<RecordPage> {
        let page_number = page_number.max(1);

        if page_number == 1 {
            let sample_size = self.config.page_sample_size;
            let mut sample = self.fetch_batch(0, sample_size).await?;

            if sample.len() == sample_size {
                match self.fetch_batch(0, self.config.extended_sample_size).await {
                    Ok(extended) => sample = extended,
                    Err(e) => warn!("Extended sample of {} failed: {}", self.endpoint, e),
                }
            }

            let total = sample.len();
            sample.truncate(page_size);
            return Ok(RecordPage {
                records: sample,
                page_number,
                page_size,
                total_count: TotalCount::Sampled(total),
            });
        }

        let skip = (page_number - 1)
            .checked_mul(page_size)
            .ok_or(RetrievalError::PageOutOfRange {
                page: page_number,
                page_size,
            })?;
        let records = self.fetch_batch(skip, page_size).await?;
        let estimate = skip
            .saturating_add(records.len())
            .max(self.config.min_approximate_total);

        Ok(RecordPage {
            records,
            page_number,
            page_size,
            total_count: TotalCount::Approximate(estimate),
        })
    }
}
