//! Source lookups through the content façade.

use std::sync::Arc;

use proptest::prelude::*;
use streamscout_core::config::SearchConfig;
use streamscout_core::source::{ProviderKind, ReliabilityTier, SourceProvider};
use streamscout_core::{ProviderDescriptor, RateLimiter, Resolution, SourceMetadata, StreamscoutConfig};
use streamscout_search::errors::{ApiError, SearchError};
use streamscout_search::providers::{MockBehavior, MockProviderClient, StaticProviderRegistry};
use streamscout_search::ranking::FileSizePreference;
use streamscout_search::{
    ContentRequest, ContentSourceManager, DemoProviderClient, SearchOrchestrator, SourceRanker,
    UserSortingPreferences,
};
use tokio_test::{assert_err, assert_ok};

fn demo_manager() -> ContentSourceManager {
    ContentSourceManager::from_config(
        Arc::new(StaticProviderRegistry::new(DemoProviderClient::demo_providers())),
        Arc::new(DemoProviderClient::new()),
        &StreamscoutConfig::for_testing(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_demo_sources_are_cached_first_and_dead_last() {
    let manager = demo_manager();
    let content = ContentRequest::movie("matrix", "The Matrix").with_imdb_id("tt0133093");
    let preferences = UserSortingPreferences::default().with_resolution(Resolution::P1080);

    let lookup = assert_ok!(manager.find_sources(&content, &preferences).await);

    // Metadata-only providers are never asked for streams.
    assert_eq!(lookup.providers_queried, 3);
    assert!(lookup.errors_by_provider.is_empty());
    assert!(lookup.sources.first().unwrap().is_cached());
    assert!(lookup.sources.last().unwrap().is_dead());
    let first_dead = lookup.sources.iter().position(SourceMetadata::is_dead).unwrap();
    assert!(lookup.sources[first_dead..].iter().all(SourceMetadata::is_dead));
}

#[tokio::test(start_paused = true)]
async fn test_episode_requests_carry_identifiers_and_headers() {
    let provider = ProviderDescriptor::new("addon", "Addon").with_base_url("https://addon.example.org/");
    let client = Arc::new(MockProviderClient::new());
    let orchestrator = SearchOrchestrator::new(
        Arc::new(StaticProviderRegistry::new([provider.clone()])),
        client.clone(),
        Arc::new(RateLimiter::new(4)),
    );
    let manager = ContentSourceManager::new(orchestrator);
    let content = ContentRequest::episode("show-1", "Some Show", 2, 5).with_imdb_id("tt0903747");

    manager
        .find_sources_from(&[provider], &content, &UserSortingPreferences::default())
        .await
        .unwrap();

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.url.as_ref().map(|url| url.as_str()),
        Some("https://addon.example.org/stream/series/tt0903747:2:5.json")
    );
    assert_eq!((request.season, request.episode), (Some(2), Some(5)));
    assert_eq!(request.headers["Accept"], "application/json");
    assert!(!request.is_fallback);
}

#[tokio::test(start_paused = true)]
async fn test_search_content_reports_total_failure() {
    let provider = ProviderDescriptor::new("down", "Down");
    let client = MockProviderClient::new().with("down", MockBehavior::failing(ApiError::new(503, "maintenance")));
    let orchestrator = SearchOrchestrator::new(
        Arc::new(StaticProviderRegistry::new([provider])),
        Arc::new(client),
        Arc::new(RateLimiter::new(4)),
    );
    let manager = ContentSourceManager::new(orchestrator);

    let outcome = manager
        .search_for_content(&ContentRequest::movie("x", "Anything"), SearchConfig::default())
        .await;

    let error = assert_err!(outcome);
    assert_eq!(error, SearchError::AllProvidersFailed { attempted: 1 });
}

fn trusted_source(index: usize, resolution: Resolution, seeders: u32, size_gb: u64) -> SourceMetadata {
    SourceMetadata::new(
        format!("s{index:04}"),
        SourceProvider {
            id: format!("p{}", index % 4),
            name: format!("P{}", index % 4),
            kind: ProviderKind::PeerToPeer,
            reliability: ReliabilityTier::High,
        },
    )
    .with_resolution(resolution)
    .with_swarm(seeders, 10)
    .with_size(size_gb * 1_000_000_000)
}

fn arbitrary_trusted_source() -> impl Strategy<Value = (Resolution, u32, u64)> {
    (
        prop_oneof![Just(Resolution::P720), Just(Resolution::P1080), Just(Resolution::P2160)],
        1u32..2_000,
        1u64..60,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn top_sources_matches_the_full_order_prefix(
        specs in prop::collection::vec(arbitrary_trusted_source(), 201..320),
        limit in 1usize..25,
    ) {
        let sources: Vec<SourceMetadata> = specs
            .iter()
            .enumerate()
            .map(|(index, (resolution, seeders, size))| trusted_source(index, *resolution, *seeders, *size))
            .collect();
        let preferences = UserSortingPreferences::default()
            .with_resolution(Resolution::P1080)
            .with_file_size(FileSizePreference::gigabytes(8.0));
        let ranker = SourceRanker::default();

        let full: Vec<String> = ranker
            .sort_sources(sources.clone(), &preferences)
            .into_iter()
            .take(limit)
            .map(|source| source.id)
            .collect();
        let top: Vec<String> = ranker
            .top_sources(sources, &preferences, limit)
            .into_iter()
            .map(|source| source.id)
            .collect();

        prop_assert_eq!(top, full);
    }
}
