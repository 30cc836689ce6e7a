//! Scripted provider doubles for tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use streamscout_core::{ProviderCapability, ProviderDescriptor, RawResult, SearchQuery, SourceMetadata};

use super::{ProviderClient, ProviderRegistry, ProviderRequest};
use crate::errors::ApiError;

const DISTINCT_TITLES: &[&str] = &[
    "Alien", "Heat", "Vertigo", "Psycho", "Jaws", "Rocky", "Amadeus", "Fargo", "Casablanca",
    "Goodfellas", "Memento", "Parasite", "Whiplash", "Oldboy", "Metropolis", "Rashomon",
];

/// Scripted answer of one mock provider.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Sleep before answering
    pub delay: Duration,
    pub results: Vec<RawResult>,
    pub sources: Vec<SourceMetadata>,
    /// Returned on every call instead of data
    pub failure: Option<ApiError>,
    /// Calls answered with `failure` before data is returned
    pub failures_before_success: u32,
}

impl MockBehavior {
    pub fn results(results: Vec<RawResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn sources(sources: Vec<SourceMetadata>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    pub fn failing(error: ApiError) -> Self {
        Self {
            failure: Some(error),
            failures_before_success: u32::MAX,
            ..Self::default()
        }
    }

    /// Fails `count` times with `error`, then answers normally.
    pub fn flaky(mut self, count: u32, error: ApiError) -> Self {
        self.failure = Some(error);
        self.failures_before_success = count;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// `count` results with pairwise dissimilar titles and no year.
pub fn distinct_results(provider: &str, count: usize) -> Vec<RawResult> {
    (0..count)
        .map(|index| {
            let word = DISTINCT_TITLES[index % DISTINCT_TITLES.len()];
            let title = if index < DISTINCT_TITLES.len() {
                word.to_string()
            } else {
                format!("{word} {}", index / DISTINCT_TITLES.len())
            };
            RawResult::new(format!("{provider}-{index}"), title, provider)
        })
        .collect()
}

/// Provider descriptors `p1..=pN` in priority order.
pub fn numbered_providers(count: usize) -> Vec<ProviderDescriptor> {
    (1..=count)
        .map(|index| {
            ProviderDescriptor::new(format!("p{index}"), format!("Provider {index}"))
                .with_priority(index as u32)
        })
        .collect()
}

/// Provider client answering from per-provider scripts.
///
/// Unknown providers answer with an empty list.
#[derive(Debug, Default)]
pub struct MockProviderClient {
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    calls: Mutex<HashMap<String, u32>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProviderClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, provider_id: impl Into<String>, behavior: MockBehavior) -> Self {
        self.behaviors.lock().insert(provider_id.into(), behavior);
        self
    }

    /// Calls made to `provider_id` so far.
    pub fn calls(&self, provider_id: &str) -> u32 {
        self.calls.lock().get(provider_id).copied().unwrap_or(0)
    }

    /// Every source request received, in arrival order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().clone()
    }

    async fn answer(&self, provider_id: &str) -> Result<MockBehavior, ApiError> {
        let call = {
            let mut calls = self.calls.lock();
            let count = calls.entry(provider_id.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let behavior = self.behaviors.lock().get(provider_id).cloned().unwrap_or_default();

        if !behavior.delay.is_zero() {
            tokio::time::sleep(behavior.delay).await;
        }
        match &behavior.failure {
            Some(error) if call <= behavior.failures_before_success => Err(error.clone()),
            _ => Ok(behavior),
        }
    }
}

#[async_trait]
impl ProviderClient for MockProviderClient {
    async fn search(
        &self,
        provider: &ProviderDescriptor,
        _query: &SearchQuery,
    ) -> Result<Vec<RawResult>, ApiError> {
        self.answer(&provider.id).await.map(|behavior| behavior.results)
    }

    async fn fetch_sources(
        &self,
        provider: &ProviderDescriptor,
        request: &ProviderRequest,
    ) -> Result<Vec<SourceMetadata>, ApiError> {
        self.requests.lock().push(request.clone());
        self.answer(&provider.id).await.map(|behavior| behavior.sources)
    }
}

/// Registry that always fails.
#[derive(Debug, Default)]
pub struct UnavailableRegistry;

#[async_trait]
impl ProviderRegistry for UnavailableRegistry {
    async fn enabled_providers(&self) -> Result<Vec<ProviderDescriptor>, ApiError> {
        Err(ApiError::network("registry offline"))
    }

    async fn providers_by_capability(
        &self,
        _capability: ProviderCapability,
    ) -> Result<Vec<ProviderDescriptor>, ApiError> {
        Err(ApiError::network("registry offline"))
    }
}
