//! Streamscout Search - Multi-provider search and source ranking
//!
//! Fans a query out to every eligible provider under the shared rate
//! limiter, streams progress while providers answer, merges near-duplicate
//! results into one ranked list and orders streaming sources by quality,
//! health and user preference.

pub mod aggregation;
pub mod errors;
pub mod orchestrator;
pub mod providers;
pub mod ranking;
pub mod source_manager;

// Re-export main types
pub use aggregation::{AggregatedResult, AggregatedSearchResults, AggregationStats, ResultAggregator, aggregate_results};
pub use errors::{ApiError, ProviderFailure, SearchError};
pub use orchestrator::{ProgressStage, SearchEvent, SearchEventStream, SearchId, SearchOrchestrator, SearchSummary};
pub use providers::{
    ContentRequest, DemoProviderClient, ProviderClient, ProviderRegistry, ProviderRequest, StaticProviderRegistry,
};
pub use ranking::{SourceRanker, UserSortingPreferences, sort_sources};
pub use source_manager::{ContentSourceManager, SourceLookup};

/// Convenience type alias for Results with SearchError.
pub type Result<T> = std::result::Result<T, SearchError>;
