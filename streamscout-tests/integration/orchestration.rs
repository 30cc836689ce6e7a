//! End-to-end behaviour of orchestrated searches.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use streamscout_core::config::SearchConfig;
use streamscout_core::{RateLimiter, SearchQuery};
use streamscout_search::errors::{ApiError, SearchError};
use streamscout_search::providers::{
    MockBehavior, MockProviderClient, StaticProviderRegistry, distinct_results, numbered_providers,
};
use streamscout_search::{ProgressStage, SearchEvent, SearchOrchestrator};

fn orchestrator(providers: usize, client: MockProviderClient, capacity: usize) -> SearchOrchestrator {
    SearchOrchestrator::new(
        Arc::new(StaticProviderRegistry::new(numbered_providers(providers))),
        Arc::new(client),
        Arc::new(RateLimiter::new(capacity)),
    )
}

fn search_config(timeout_ms: u64, max_results: usize, early_completion: bool) -> SearchConfig {
    SearchConfig {
        per_provider_timeout_ms: timeout_ms,
        max_results,
        early_completion,
        ..SearchConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_hung_provider_times_out_while_others_complete() {
    let client = MockProviderClient::new()
        .with("p1", MockBehavior::results(distinct_results("p1", 2)))
        .with("p2", MockBehavior::results(distinct_results("p2", 2)))
        .with(
            "p3",
            MockBehavior::results(distinct_results("p3", 2)).delayed(Duration::from_secs(600)),
        )
        .with("p4", MockBehavior::results(distinct_results("p4", 2)))
        .with("p5", MockBehavior::failing(ApiError::new(502, "bad gateway")));
    let orchestrator = orchestrator(5, client, 10);

    let summary = orchestrator
        .perform_search(SearchQuery::new("alien"), search_config(2_000, 100, true))
        .into_summary()
        .await
        .unwrap();

    assert_eq!(summary.success_count, 3);
    assert_eq!(summary.failure_count, 2);
    assert_eq!(summary.cancelled_count, 0);
    assert!(summary.errors_by_provider["p3"].is_timeout());
    assert!(!summary.errors_by_provider["p5"].is_timeout());
    assert_eq!(summary.raw_result_count, 6);
    let contributors: BTreeSet<&str> = summary
        .results
        .iter()
        .flat_map(|result| result.sources.iter().map(|source| source.provider.as_str()))
        .collect();
    assert_eq!(contributors, BTreeSet::from(["p1", "p2", "p4"]));
    assert!(summary.elapsed >= Duration::from_secs(2));
    assert!(summary.elapsed < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_provider_accounting_always_adds_up() {
    for max_results in [1, 4, 10, 100] {
        let mut client = MockProviderClient::new();
        for index in 1..=12u64 {
            let id = format!("p{index}");
            let behavior = match index % 3 {
                0 => MockBehavior::failing(ApiError::new(500, "boom")),
                1 => MockBehavior::results(distinct_results(&id, 3)).delayed(Duration::from_millis(index * 100)),
                _ => MockBehavior::results(distinct_results(&id, 2)),
            };
            client = client.with(id, behavior);
        }
        let orchestrator = orchestrator(12, client, 4);

        let summary = orchestrator
            .perform_search(SearchQuery::new("mixed"), search_config(5_000, max_results, true))
            .into_summary()
            .await
            .unwrap();

        assert_eq!(summary.selected_count(), 12, "max_results {max_results}");
        assert_eq!(
            summary.success_count + summary.failure_count + summary.cancelled_count,
            12
        );
        assert!(summary.results.len() <= max_results);
        if max_results == 100 {
            assert_eq!(summary.raw_result_count, 20);
        }
        assert_eq!(orchestrator.limiter().global_available(), 4);
    }
}

#[tokio::test(start_paused = true)]
async fn test_disabled_early_completion_waits_for_everyone() {
    let client = MockProviderClient::new()
        .with("p1", MockBehavior::results(distinct_results("p1", 10)))
        .with(
            "p2",
            MockBehavior::results(distinct_results("p2", 1)).delayed(Duration::from_secs(1)),
        );
    let orchestrator = orchestrator(2, client, 10);

    let summary = orchestrator
        .perform_search(SearchQuery::new("heat"), search_config(5_000, 5, false))
        .into_summary()
        .await
        .unwrap();

    assert!(!summary.early_completed);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.cancelled_count, 0);
    assert_eq!(summary.raw_result_count, 11);
    assert_eq!(summary.results.len(), 5);
    // p2's only title repeats p1's first one.
    assert!(
        summary
            .results
            .iter()
            .any(|result| result.providers() == ["p1", "p2"])
    );
}

#[tokio::test(start_paused = true)]
async fn test_global_cap_runs_providers_in_waves() {
    let mut client = MockProviderClient::new();
    for index in 1..=4 {
        let id = format!("p{index}");
        client = client.with(
            id.clone(),
            MockBehavior::results(distinct_results(&id, 1)).delayed(Duration::from_secs(1)),
        );
    }
    let orchestrator = orchestrator(4, client, 2);

    let summary = orchestrator
        .perform_search(SearchQuery::new("waves"), search_config(5_000, 100, true))
        .into_summary()
        .await
        .unwrap();

    assert_eq!(summary.success_count, 4);
    assert!(summary.elapsed >= Duration::from_secs(2));
    assert!(summary.elapsed < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_cancelling_mid_search_returns_every_permit() {
    let mut client = MockProviderClient::new();
    for index in 1..=3 {
        let id = format!("p{index}");
        client = client.with(
            id.clone(),
            MockBehavior::results(distinct_results(&id, 1)).delayed(Duration::from_secs(60)),
        );
    }
    let orchestrator = orchestrator(3, client, 10);
    let mut stream = orchestrator.perform_search(SearchQuery::new("slow"), search_config(120_000, 100, true));

    let mut fetching = 0;
    while fetching < 3 {
        match stream.next().await {
            Some(SearchEvent::Progress {
                stage: ProgressStage::Fetching,
                ..
            }) => fetching += 1,
            Some(_) => {}
            None => panic!("stream ended before providers were queried"),
        }
    }
    assert_eq!(orchestrator.limiter().global_available(), 7);

    stream.cancel();
    let rest: Vec<SearchEvent> = stream.collect().await;

    assert!(matches!(
        rest.last(),
        Some(SearchEvent::Error {
            error: SearchError::Cancelled,
            ..
        })
    ));
    assert_eq!(orchestrator.limiter().global_available(), 10);
    assert!(orchestrator.active_searches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_events_follow_the_protocol() {
    let client = MockProviderClient::new()
        .with("p1", MockBehavior::results(distinct_results("p1", 1)))
        .with("p2", MockBehavior::failing(ApiError::new(500, "boom")));
    let orchestrator = orchestrator(2, client, 10);

    let events: Vec<SearchEvent> = orchestrator
        .perform_search(SearchQuery::new("protocol"), SearchConfig::default())
        .collect()
        .await;

    let search_id = events[0].search_id();
    assert!(events.iter().all(|event| event.search_id() == search_id));
    assert!(matches!(events[0], SearchEvent::Started { .. }));
    assert!(matches!(events[1], SearchEvent::ScrapersSelected { count: 2, .. }));
    assert!(matches!(events.last(), Some(SearchEvent::Completed(_))));
    assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, SearchEvent::ScraperError { .. }))
            .count(),
        1
    );
}
