//! Drives one search: provider selection, fan-out, collection, completion.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use streamscout_core::config::SearchConfig;
use streamscout_core::{ProviderDescriptor, RawResult, SearchQuery};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{SearchEvent, SearchId, SearchSummary};
use super::task::{EventSink, ProviderTask};
use super::{ActiveSearches, OrchestratorContext};
use crate::aggregation::ResultAggregator;
use crate::errors::{ProviderFailure, SearchError};

/// State owned by the supervisor task of one search.
pub(crate) struct SearchRun {
    pub(crate) search_id: SearchId,
    pub(crate) query: SearchQuery,
    pub(crate) config: SearchConfig,
    pub(crate) context: Arc<OrchestratorContext>,
    pub(crate) events: EventSink,
    pub(crate) token: CancellationToken,
    pub(crate) active: ActiveSearches,
}

#[derive(Default)]
struct Collected {
    results: Vec<RawResult>,
    completed: usize,
    success: usize,
    cancelled: usize,
    errors: BTreeMap<String, ProviderFailure>,
    early_completed: bool,
    user_cancelled: bool,
}

impl SearchRun {
    /// Runs the search and emits its terminal event.
    pub(crate) async fn execute(self) {
        let started = Instant::now();
        match self.drive(started).await {
            Ok(summary) => {
                info!(
                    succeeded = summary.success_count,
                    failed = summary.failure_count,
                    cancelled = summary.cancelled_count,
                    results = summary.results.len(),
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "Search completed"
                );
                if !self.events.emit(SearchEvent::Completed(summary)).await {
                    self.emit_cancelled();
                }
            }
            Err(SearchError::Cancelled) => {
                info!("Search cancelled");
                self.emit_cancelled();
            }
            Err(error) => {
                warn!(error = %error, "Search failed");
                let event = SearchEvent::Error {
                    search_id: self.search_id,
                    error,
                };
                if !self.events.emit(event).await {
                    self.emit_cancelled();
                }
            }
        }
        self.active.remove(self.search_id);
    }

    fn emit_cancelled(&self) {
        // Never blocks: the consumer may have stopped reading.
        self.events.emit_now(SearchEvent::Error {
            search_id: self.search_id,
            error: SearchError::Cancelled,
        });
    }

    async fn drive(&self, started: Instant) -> Result<SearchSummary, SearchError> {
        if !self
            .events
            .emit(SearchEvent::Started {
                search_id: self.search_id,
                query: self.query.clone(),
            })
            .await
        {
            return Err(SearchError::Cancelled);
        }
        self.config.validate()?;

        let selected = self.select_providers().await?;
        let provider_ids: Vec<String> = selected.iter().map(|provider| provider.id.clone()).collect();
        info!(query = %self.query.text, providers = ?provider_ids, "Providers selected");
        let total = selected.len();
        if !self
            .events
            .emit(SearchEvent::ScrapersSelected {
                search_id: self.search_id,
                count: total,
                provider_ids,
            })
            .await
        {
            return Err(SearchError::Cancelled);
        }

        let collected = self.fan_out(selected).await;
        if collected.user_cancelled {
            return Err(SearchError::Cancelled);
        }

        let Collected {
            results,
            success,
            cancelled,
            errors,
            early_completed,
            ..
        } = collected;
        let mut aggregation = self.context.aggregation.clone();
        aggregation.max_results = self.config.max_results;
        let aggregated = ResultAggregator::new(aggregation).aggregate_results(&results);

        Ok(SearchSummary {
            search_id: self.search_id,
            results: aggregated.items,
            raw_result_count: results.len(),
            duplicates_removed: aggregated.duplicates_removed,
            success_count: success,
            failure_count: errors.len(),
            cancelled_count: cancelled,
            errors_by_provider: errors,
            early_completed,
            elapsed: started.elapsed(),
        })
    }

    /// Enabled providers serving the requested content types, by priority.
    async fn select_providers(&self) -> Result<Vec<ProviderDescriptor>, SearchError> {
        let listed = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(SearchError::Cancelled),
            listed = self.context.registry.enabled_providers() => listed,
        };
        let providers = listed.map_err(|error| SearchError::RegistryUnavailable {
            reason: error.to_string(),
        })?;
        if providers.is_empty() {
            return Err(SearchError::NoProvidersConfigured);
        }

        let requested = &self.query.filters.content_types;
        let mut selected: Vec<ProviderDescriptor> = providers
            .into_iter()
            .filter(|provider| provider.enabled && provider.supports_any(requested))
            .collect();
        if selected.is_empty() {
            let requested = requested
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SearchError::NoEligibleProviders { requested });
        }
        selected.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        // One task per provider id; the highest priority descriptor wins.
        let mut seen = HashSet::with_capacity(selected.len());
        selected.retain(|provider| seen.insert(provider.id.clone()));
        Ok(selected)
    }

    /// One task per provider; outcomes are collected as they settle.
    async fn fan_out(&self, providers: Vec<ProviderDescriptor>) -> Collected {
        let total = providers.len();
        let query = Arc::new(self.query.clone());
        let mut tasks = JoinSet::new();
        let mut task_providers = HashMap::with_capacity(total);

        for provider in providers {
            let provider_id = provider.id.clone();
            let task = ProviderTask {
                search_id: self.search_id,
                rate_limit: self.context.rate_limits.config_for(&provider),
                provider,
                query: Arc::clone(&query),
                client: Arc::clone(&self.context.client),
                limiter: Arc::clone(&self.context.limiter),
                timeout: self.config.provider_timeout(),
                retry: self.config.retry,
                events: self.events.clone(),
            };
            let handle = tasks.spawn(task.run());
            task_providers.insert(handle.id(), provider_id);
        }

        let mut collected = Collected::default();
        loop {
            let joined = tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    collected.user_cancelled = true;
                    break;
                }
                joined = tasks.join_next_with_id() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            let (provider_id, outcome) = match joined {
                Ok((id, outcome)) => (task_providers.remove(&id).unwrap_or_default(), outcome),
                Err(join_error) => {
                    let provider_id = task_providers.remove(&join_error.id()).unwrap_or_default();
                    if join_error.is_cancelled() {
                        collected.cancelled += 1;
                        continue;
                    }
                    let failure = ProviderFailure::TaskFailed {
                        reason: join_error.to_string(),
                    };
                    (provider_id, Err(failure))
                }
            };
            collected.completed += 1;

            match outcome {
                Ok(results) => {
                    collected.success += 1;
                    debug!(provider = %provider_id, count = results.len(), "Provider results collected");
                    collected.results.extend(results);
                    self.events
                        .emit(SearchEvent::PartialResults {
                            search_id: self.search_id,
                            results: collected.results.clone(),
                            completed_scrapers: collected.completed,
                            total_scrapers: total,
                        })
                        .await;

                    if self.config.early_completion && collected.results.len() >= self.config.max_results {
                        info!(
                            results = collected.results.len(),
                            pending = tasks.len(),
                            "Enough results, stopping remaining providers"
                        );
                        collected.early_completed = true;
                        break;
                    }
                }
                Err(failure) => {
                    warn!(provider = %provider_id, error = %failure, "Provider failed");
                    self.events
                        .emit(SearchEvent::ScraperError {
                            search_id: self.search_id,
                            provider_id: provider_id.clone(),
                            error: failure.clone(),
                        })
                        .await;
                    collected.errors.insert(provider_id, failure);
                }
            }
        }

        // Anything still running is stopped; outcomes that race the stop are discarded.
        tasks.abort_all();
        while tasks.join_next().await.is_some() {
            collected.cancelled += 1;
        }

        collected
    }
}
