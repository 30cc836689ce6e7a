//! Rate limiter behaviour under real search load.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use streamscout_core::config::SearchConfig;
use streamscout_core::{RateLimitConfig, RateLimiter, SearchQuery, StreamscoutConfig};
use streamscout_search::errors::ApiError;
use streamscout_search::providers::{
    MockBehavior, MockProviderClient, StaticProviderRegistry, distinct_results, numbered_providers,
};
use streamscout_search::SearchOrchestrator;
use tokio::task::JoinSet;

fn tight_budget() -> RateLimitConfig {
    RateLimitConfig {
        requests_per_minute: 2,
        requests_per_hour: 100,
        burst_size: 5,
        cooldown_delay_ms: 0,
    }
}

#[tokio::test(start_paused = true)]
async fn test_permits_balance_after_mixed_outcomes() {
    let client = MockProviderClient::new()
        .with("p1", MockBehavior::results(distinct_results("p1", 3)))
        .with("p2", MockBehavior::failing(ApiError::new(500, "boom")))
        .with(
            "p3",
            MockBehavior::results(distinct_results("p3", 3)).delayed(Duration::from_secs(30)),
        );
    let limiter = Arc::new(RateLimiter::new(3));
    let orchestrator = SearchOrchestrator::new(
        Arc::new(StaticProviderRegistry::new(numbered_providers(3))),
        Arc::new(client),
        Arc::clone(&limiter),
    );
    let config = SearchConfig {
        per_provider_timeout_ms: 1_000,
        ..SearchConfig::default()
    };

    let summary = orchestrator
        .perform_search(SearchQuery::new("balance"), config)
        .into_summary()
        .await
        .unwrap();

    assert_eq!(summary.success_count, 1);
    assert_eq!(limiter.global_available(), 3);
    for provider in ["p1", "p2", "p3"] {
        let status = limiter.rate_limit_status(provider).unwrap();
        assert_eq!(status.current_burst, 0, "{provider} still holds a permit");
    }
}

#[tokio::test(start_paused = true)]
async fn test_minute_window_throttles_repeated_searches() {
    let mut config = StreamscoutConfig::for_testing();
    config.rate_limit.overrides.insert("p1".to_string(), tight_budget());
    let client = MockProviderClient::new().with("p1", MockBehavior::results(distinct_results("p1", 1)));
    let orchestrator = SearchOrchestrator::from_config(
        Arc::new(StaticProviderRegistry::new(numbered_providers(1))),
        Arc::new(client),
        Arc::new(RateLimiter::from_settings(&config.rate_limit)),
        &config,
    );

    let mut elapsed = Vec::new();
    for _ in 0..3 {
        let summary = orchestrator
            .perform_search(SearchQuery::new("again"), config.search.clone())
            .into_summary()
            .await
            .unwrap();
        assert_eq!(summary.success_count, 1);
        elapsed.push(summary.elapsed);
    }

    assert!(elapsed[0] < Duration::from_secs(1));
    assert!(elapsed[1] < Duration::from_secs(1));
    assert!(elapsed[2] >= Duration::from_secs(59));

    // The first two grants aged out while the third search waited.
    let status = orchestrator.limiter().rate_limit_status("p1").unwrap();
    assert!(!status.is_rate_limited);
    assert_eq!(status.remaining_requests, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_never_exceed_burst() {
    let limiter = Arc::new(RateLimiter::new(50));
    let config = RateLimitConfig {
        requests_per_minute: 100,
        requests_per_hour: 1_000,
        burst_size: 3,
        cooldown_delay_ms: 0,
    };
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut tasks = JoinSet::new();
    for _ in 0..10 {
        let limiter = Arc::clone(&limiter);
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        tasks.spawn(async move {
            let permit = limiter.acquire_permit("shared", &config).await.unwrap();
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            limiter.release_permit(permit);
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 3);
    assert_eq!(limiter.global_available(), 50);
    let status = limiter.rate_limit_status("shared").unwrap();
    assert_eq!(status.current_burst, 0);
    assert_eq!(status.remaining_requests, 90);
}
