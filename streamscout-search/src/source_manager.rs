//! Caller facing façade: content lookups in, ranked sources out.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use streamscout_core::config::{RateLimitSettings, SearchConfig};
use streamscout_core::{
    ProviderCapability, ProviderDescriptor, RateLimitConfig, RateLimiter, SearchFilters, SearchQuery,
    SourceMetadata, StreamscoutConfig, YearRange,
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::{ProviderFailure, SearchError};
use crate::orchestrator::{SearchOrchestrator, SearchSummary};
use crate::providers::{ContentRequest, ProviderClient, ProviderRegistry, ProviderRequest};
use crate::ranking::{SourceRanker, UserSortingPreferences};

/// Ranked sources for one piece of content.
#[derive(Debug, Clone, Default)]
pub struct SourceLookup {
    /// Best source first
    pub sources: Vec<SourceMetadata>,
    pub providers_queried: usize,
    pub errors_by_provider: BTreeMap<String, ProviderFailure>,
    /// Providers that only answered through the title fallback
    pub fallback_providers: Vec<String>,
}

/// Turns content identifiers into searches and source lookups.
#[derive(Debug, Clone)]
pub struct ContentSourceManager {
    orchestrator: SearchOrchestrator,
    ranker: SourceRanker,
    source_timeout: Duration,
    max_sources: Option<usize>,
}

impl ContentSourceManager {
    pub fn new(orchestrator: SearchOrchestrator) -> Self {
        Self {
            orchestrator,
            ranker: SourceRanker::default(),
            source_timeout: SearchConfig::default().provider_timeout(),
            max_sources: None,
        }
    }

    /// Wires registry and client with a limiter, orchestrator and ranker
    /// built from `config`.
    pub fn from_config(
        registry: Arc<dyn ProviderRegistry>,
        client: Arc<dyn ProviderClient>,
        config: &StreamscoutConfig,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::from_settings(&config.rate_limit));
        let orchestrator = SearchOrchestrator::from_config(registry, client, limiter, config);
        Self {
            orchestrator,
            ranker: SourceRanker::new(config.ranking.clone()),
            source_timeout: config.search.provider_timeout(),
            max_sources: None,
        }
    }

    pub fn with_ranker(mut self, ranker: SourceRanker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Caps lookups to the best `max_sources` entries.
    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = Some(max_sources);
        self
    }

    pub fn orchestrator(&self) -> &SearchOrchestrator {
        &self.orchestrator
    }

    /// Runs one orchestrated search to its end.
    ///
    /// # Errors
    /// - `SearchError::AllProvidersFailed` - No provider answered
    /// - Any fatal `SearchError` the search ended with
    pub async fn search_content(&self, query: SearchQuery, config: SearchConfig) -> Result<SearchSummary, SearchError> {
        let summary = self.orchestrator.perform_search(query, config).into_summary().await?;
        if summary.success_count == 0 {
            return Err(SearchError::AllProvidersFailed {
                attempted: summary.selected_count(),
            });
        }
        Ok(summary)
    }

    /// Searches for the title of `content`, restricted to its type and to
    /// releases within a year of its own.
    ///
    /// # Errors
    /// Same as [`ContentSourceManager::search_content`].
    pub async fn search_for_content(
        &self,
        content: &ContentRequest,
        config: SearchConfig,
    ) -> Result<SearchSummary, SearchError> {
        let filters = SearchFilters {
            content_types: BTreeSet::from([content.content_type]),
            year_range: content.year.map(|year| YearRange {
                from: Some(year.saturating_sub(1)),
                to: Some(year.saturating_add(1)),
            }),
            ..SearchFilters::default()
        };
        let query = SearchQuery::new(content.title.clone()).with_filters(filters);
        self.search_content(query, config).await
    }

    /// Ranked sources from every enabled streaming provider serving the
    /// content type.
    ///
    /// # Errors
    /// - `SearchError::RegistryUnavailable` - Registry could not be read
    /// - `SearchError::NoEligibleProviders` - No streaming provider serves the type
    /// - `SearchError::AllProvidersFailed` - Every provider failed
    pub async fn find_sources(
        &self,
        content: &ContentRequest,
        preferences: &UserSortingPreferences,
    ) -> Result<SourceLookup, SearchError> {
        let listed = self
            .orchestrator
            .registry()
            .providers_by_capability(ProviderCapability::Streaming)
            .await
            .map_err(|error| SearchError::RegistryUnavailable {
                reason: error.to_string(),
            })?;

        let mut providers: Vec<ProviderDescriptor> = listed
            .into_iter()
            .filter(|provider| provider.enabled && provider.content_types.contains(&content.content_type))
            .collect();
        if providers.is_empty() {
            return Err(SearchError::NoEligibleProviders {
                requested: content.content_type.to_string(),
            });
        }
        providers.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

        self.find_sources_from(&providers, content, preferences).await
    }

    /// Ranked sources from already selected providers, queried concurrently.
    ///
    /// # Errors
    /// - `SearchError::NoProvidersConfigured` - `providers` is empty
    /// - `SearchError::AllProvidersFailed` - Every provider failed
    pub async fn find_sources_from(
        &self,
        providers: &[ProviderDescriptor],
        content: &ContentRequest,
        preferences: &UserSortingPreferences,
    ) -> Result<SourceLookup, SearchError> {
        if providers.is_empty() {
            return Err(SearchError::NoProvidersConfigured);
        }
        let content = Arc::new(content.clone());
        let rate_limits: &RateLimitSettings = self.orchestrator.rate_limits();

        let mut tasks = JoinSet::new();
        let mut task_providers = std::collections::HashMap::with_capacity(providers.len());
        for provider in providers {
            let task = SourceFetch {
                rate_limit: rate_limits.config_for(provider),
                provider: provider.clone(),
                content: Arc::clone(&content),
                client: Arc::clone(self.orchestrator.client()),
                limiter: Arc::clone(self.orchestrator.limiter()),
                timeout: self.source_timeout,
            };
            let handle = tasks.spawn(task.run());
            task_providers.insert(handle.id(), provider.id.clone());
        }

        let mut lookup = SourceLookup {
            providers_queried: providers.len(),
            ..SourceLookup::default()
        };
        let mut merged = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (provider_id, outcome) = match joined {
                Ok((id, outcome)) => (task_providers.remove(&id).unwrap_or_default(), outcome),
                Err(join_error) => (
                    task_providers.remove(&join_error.id()).unwrap_or_default(),
                    Err(ProviderFailure::TaskFailed {
                        reason: join_error.to_string(),
                    }),
                ),
            };
            match outcome {
                Ok(fetched) => {
                    debug!(provider = %provider_id, count = fetched.sources.len(), "Sources received");
                    if fetched.used_fallback {
                        lookup.fallback_providers.push(provider_id);
                    }
                    merged.extend(fetched.sources);
                }
                Err(failure) => {
                    warn!(provider = %provider_id, error = %failure, "Source lookup failed");
                    lookup.errors_by_provider.insert(provider_id, failure);
                }
            }
        }

        if lookup.errors_by_provider.len() == providers.len() {
            return Err(SearchError::AllProvidersFailed {
                attempted: providers.len(),
            });
        }
        lookup.fallback_providers.sort();

        let found = merged.len();
        lookup.sources = match self.max_sources {
            Some(limit) => self.ranker.top_sources(merged, preferences, limit),
            None => self.ranker.sort_sources(merged, preferences),
        };
        info!(
            content = %content.lookup_key(),
            found,
            returned = lookup.sources.len(),
            failed = lookup.errors_by_provider.len(),
            "Sources ranked"
        );
        Ok(lookup)
    }
}

struct FetchedSources {
    sources: Vec<SourceMetadata>,
    used_fallback: bool,
}

/// One provider's source lookup, moved into its task.
struct SourceFetch {
    provider: ProviderDescriptor,
    content: Arc<ContentRequest>,
    client: Arc<dyn ProviderClient>,
    limiter: Arc<RateLimiter>,
    rate_limit: RateLimitConfig,
    timeout: Duration,
}

impl SourceFetch {
    /// Identifier request first; a transient failure gets one title based
    /// retry.
    async fn run(self) -> Result<FetchedSources, ProviderFailure> {
        let primary = ProviderRequest::for_content(&self.provider, &self.content);
        match self.fetch(&primary).await {
            Ok(sources) => Ok(FetchedSources {
                sources,
                used_fallback: false,
            }),
            Err(failure) if failure.is_transient() => {
                warn!(provider = %self.provider.id, error = %failure, "Retrying with title fallback");
                let fallback = ProviderRequest::title_fallback(&self.provider, &self.content);
                self.fetch(&fallback).await.map(|sources| FetchedSources {
                    sources,
                    used_fallback: true,
                })
            }
            Err(failure) => Err(failure),
        }
    }

    async fn fetch(&self, request: &ProviderRequest) -> Result<Vec<SourceMetadata>, ProviderFailure> {
        let permit = self
            .limiter
            .acquire_permit(&self.provider.id, &self.rate_limit)
            .await?;
        let outcome = match tokio::time::timeout(self.timeout, self.client.fetch_sources(&self.provider, request)).await {
            Ok(answer) => answer.map_err(ProviderFailure::from),
            Err(_) => Err(ProviderFailure::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };
        self.limiter.release_permit(permit);
        outcome
    }
}
