//! One provider query inside an orchestrated search.

use std::sync::Arc;
use std::time::Duration;

use streamscout_core::config::RetryPolicy;
use streamscout_core::{ProviderDescriptor, RateLimitConfig, RateLimiter, RawResult, SearchQuery};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::events::{ProgressStage, SearchEvent, SearchId};
use crate::errors::ProviderFailure;
use crate::providers::ProviderClient;

/// Sending half of a search's event channel.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    sender: mpsc::Sender<SearchEvent>,
    token: CancellationToken,
}

impl EventSink {
    pub(crate) fn new(sender: mpsc::Sender<SearchEvent>, token: CancellationToken) -> Self {
        Self { sender, token }
    }

    /// Waits for channel capacity unless the search gets cancelled.
    ///
    /// Returns `false` when the event was not delivered.
    pub(crate) async fn emit(&self, event: SearchEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            sent = self.sender.send(event) => sent.is_ok(),
        }
    }

    /// Delivers only if the channel has room right now.
    pub(crate) fn emit_now(&self, event: SearchEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

/// Everything one provider task needs, moved into the task.
pub(crate) struct ProviderTask {
    pub(crate) search_id: SearchId,
    pub(crate) provider: ProviderDescriptor,
    pub(crate) query: Arc<SearchQuery>,
    pub(crate) client: Arc<dyn ProviderClient>,
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) rate_limit: RateLimitConfig,
    pub(crate) timeout: Duration,
    pub(crate) retry: RetryPolicy,
    pub(crate) events: EventSink,
}

impl ProviderTask {
    /// Queries the provider under a rate limit permit and the deadline,
    /// retrying transient failures while the policy allows.
    ///
    /// The permit is a guard: aborting the task releases it.
    pub(crate) async fn run(self) -> Result<Vec<RawResult>, ProviderFailure> {
        let mut attempt = 0;
        loop {
            self.progress(ProgressStage::Starting).await;
            let permit = self
                .limiter
                .acquire_permit(&self.provider.id, &self.rate_limit)
                .await?;

            self.progress(ProgressStage::Fetching).await;
            let outcome = self.query_once().await;
            self.limiter.release_permit(permit);

            match outcome {
                Ok(results) => {
                    self.progress(ProgressStage::Processing).await;
                    let received = results.len();
                    let accepted: Vec<RawResult> = results
                        .into_iter()
                        .filter(|result| self.query.filters.accepts(result))
                        .collect();
                    debug!(
                        provider = %self.provider.id,
                        received,
                        accepted = accepted.len(),
                        "Provider answered"
                    );
                    return Ok(accepted);
                }
                Err(failure) if failure.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        provider = %self.provider.id,
                        attempt,
                        error = %failure,
                        "Transient provider failure, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(self.retry.backoff_ms)).await;
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    async fn query_once(&self) -> Result<Vec<RawResult>, ProviderFailure> {
        match tokio::time::timeout(self.timeout, self.client.search(&self.provider, &self.query)).await {
            Ok(answer) => answer.map_err(ProviderFailure::from),
            Err(_) => Err(ProviderFailure::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    async fn progress(&self, stage: ProgressStage) {
        self.events
            .emit(SearchEvent::Progress {
                search_id: self.search_id,
                provider_id: self.provider.id.clone(),
                stage,
            })
            .await;
    }
}
