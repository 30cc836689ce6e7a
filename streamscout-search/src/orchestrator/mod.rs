//! Concurrent fan-out of one query to every eligible provider.
//!
//! Each search runs in its own supervisor task which spawns one task per
//! provider, gates every provider call through the shared
//! [`RateLimiter`], enforces the per-provider deadline and reports progress
//! as a stream of [`SearchEvent`]s. Provider failures never abort the
//! search; they are recorded and the search completes with what arrived.

pub mod events;
mod stream;
mod supervisor;
mod task;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use streamscout_core::config::{AggregationConfig, RateLimitSettings, SearchConfig};
use streamscout_core::{RateLimiter, SearchQuery, StreamscoutConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use events::{ProgressStage, SearchEvent, SearchId, SearchSummary};
pub use stream::SearchEventStream;

use crate::providers::{ProviderClient, ProviderRegistry};
use supervisor::SearchRun;
use task::EventSink;

/// Cancellation tokens of searches that have not finished.
#[derive(Debug, Clone, Default)]
pub(crate) struct ActiveSearches(Arc<Mutex<HashMap<SearchId, CancellationToken>>>);

impl ActiveSearches {
    fn insert(&self, search_id: SearchId, token: CancellationToken) {
        self.0.lock().insert(search_id, token);
    }

    pub(crate) fn remove(&self, search_id: SearchId) {
        self.0.lock().remove(&search_id);
    }

    fn cancel(&self, search_id: SearchId) -> bool {
        match self.0.lock().remove(&search_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn cancel_all(&self) -> usize {
        let drained: Vec<CancellationToken> = self.0.lock().drain().map(|(_, token)| token).collect();
        for token in &drained {
            token.cancel();
        }
        drained.len()
    }

    fn ids(&self) -> Vec<SearchId> {
        let mut ids: Vec<SearchId> = self.0.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Shared collaborators of every search.
#[derive(Debug)]
pub(crate) struct OrchestratorContext {
    pub(crate) registry: Arc<dyn ProviderRegistry>,
    pub(crate) client: Arc<dyn ProviderClient>,
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) rate_limits: RateLimitSettings,
    pub(crate) aggregation: AggregationConfig,
}

/// Runs searches across providers.
///
/// Cheap to clone; clones share the rate limiter and the set of active
/// searches.
#[derive(Debug, Clone)]
pub struct SearchOrchestrator {
    context: Arc<OrchestratorContext>,
    active: ActiveSearches,
}

impl SearchOrchestrator {
    /// Creates an orchestrator with default rate limit and aggregation
    /// settings.
    pub fn new(
        registry: Arc<dyn ProviderRegistry>,
        client: Arc<dyn ProviderClient>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self::with_settings(
            registry,
            client,
            limiter,
            RateLimitSettings::default(),
            AggregationConfig::default(),
        )
    }

    /// Creates an orchestrator using the rate limit and aggregation sections
    /// of `config`.
    pub fn from_config(
        registry: Arc<dyn ProviderRegistry>,
        client: Arc<dyn ProviderClient>,
        limiter: Arc<RateLimiter>,
        config: &StreamscoutConfig,
    ) -> Self {
        Self::with_settings(
            registry,
            client,
            limiter,
            config.rate_limit.clone(),
            config.aggregation.clone(),
        )
    }

    fn with_settings(
        registry: Arc<dyn ProviderRegistry>,
        client: Arc<dyn ProviderClient>,
        limiter: Arc<RateLimiter>,
        rate_limits: RateLimitSettings,
        aggregation: AggregationConfig,
    ) -> Self {
        Self {
            context: Arc::new(OrchestratorContext {
                registry,
                client,
                limiter,
                rate_limits,
                aggregation,
            }),
            active: ActiveSearches::default(),
        }
    }

    /// Starts a search and returns its event stream.
    ///
    /// Nothing runs until the stream is first polled. The stream yields
    /// `Started`, `ScrapersSelected`, per-provider events and finally one
    /// `Completed` or `Error`.
    pub fn perform_search(&self, query: SearchQuery, config: SearchConfig) -> SearchEventStream {
        let search_id = SearchId::new();
        let token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel(config.event_buffer.max(1));
        self.active.insert(search_id, token.clone());
        info!(search_id = %search_id, query = %query.text, "Search requested");

        let run = SearchRun {
            search_id,
            query,
            config,
            context: Arc::clone(&self.context),
            events: EventSink::new(sender, token.clone()),
            token: token.clone(),
            active: self.active.clone(),
        };
        SearchEventStream::new(run, receiver, token, self.active.clone())
    }

    /// Cancels one search; returns `false` when it is unknown or finished.
    pub fn cancel_search(&self, search_id: SearchId) -> bool {
        let cancelled = self.active.cancel(search_id);
        if cancelled {
            info!(search_id = %search_id, "Search cancellation requested");
        }
        cancelled
    }

    /// Cancels every running search and returns how many there were.
    pub fn cancel_all_searches(&self) -> usize {
        let count = self.active.cancel_all();
        if count > 0 {
            info!(count, "Cancelled all searches");
        }
        count
    }

    /// Ids of searches that have not finished.
    pub fn active_searches(&self) -> Vec<SearchId> {
        self.active.ids()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.context.limiter
    }

    pub fn registry(&self) -> &Arc<dyn ProviderRegistry> {
        &self.context.registry
    }

    pub fn client(&self) -> &Arc<dyn ProviderClient> {
        &self.context.client
    }

    pub(crate) fn rate_limits(&self) -> &RateLimitSettings {
        &self.context.rate_limits
    }
}
