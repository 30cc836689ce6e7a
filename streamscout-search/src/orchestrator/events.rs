//! Events emitted by an orchestrated search.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use streamscout_core::{RawResult, SearchQuery};
use uuid::Uuid;

use crate::aggregation::AggregatedResult;
use crate::errors::{ProviderFailure, SearchError};

/// Unique identifier of one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SearchId(Uuid);

impl Default for SearchId {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Milestone inside one provider task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    /// Waiting for a rate limit permit
    Starting,
    /// Query sent to the provider
    Fetching,
    /// Provider answered, results being filtered
    Processing,
}

/// Final report of a search that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSummary {
    pub search_id: SearchId,
    /// Deduplicated and ordered results
    pub results: Vec<AggregatedResult>,
    /// Raw results handed to aggregation
    pub raw_result_count: usize,
    pub duplicates_removed: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Providers stopped by early completion
    pub cancelled_count: usize,
    pub errors_by_provider: BTreeMap<String, ProviderFailure>,
    pub early_completed: bool,
    pub elapsed: Duration,
}

impl SearchSummary {
    /// Providers that were dispatched.
    pub fn selected_count(&self) -> usize {
        self.success_count + self.failure_count + self.cancelled_count
    }

    pub fn is_partial(&self) -> bool {
        self.failure_count > 0 || self.cancelled_count > 0
    }
}

/// One step of the search protocol.
///
/// `Started`, then `ScrapersSelected`, then any number of `Progress`,
/// `PartialResults` and `ScraperError`, then exactly one of `Completed` or
/// `Error`. A fatal failure before providers were selected skips straight
/// to `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Started {
        search_id: SearchId,
        query: SearchQuery,
    },
    ScrapersSelected {
        search_id: SearchId,
        count: usize,
        provider_ids: Vec<String>,
    },
    Progress {
        search_id: SearchId,
        provider_id: String,
        stage: ProgressStage,
    },
    PartialResults {
        search_id: SearchId,
        /// Every raw result received so far
        results: Vec<RawResult>,
        completed_scrapers: usize,
        total_scrapers: usize,
    },
    ScraperError {
        search_id: SearchId,
        provider_id: String,
        error: ProviderFailure,
    },
    Completed(SearchSummary),
    Error {
        search_id: SearchId,
        error: SearchError,
    },
}

impl SearchEvent {
    pub fn search_id(&self) -> SearchId {
        match self {
            SearchEvent::Started { search_id, .. }
            | SearchEvent::ScrapersSelected { search_id, .. }
            | SearchEvent::Progress { search_id, .. }
            | SearchEvent::PartialResults { search_id, .. }
            | SearchEvent::ScraperError { search_id, .. }
            | SearchEvent::Error { search_id, .. } => *search_id,
            SearchEvent::Completed(summary) => summary.search_id,
        }
    }

    /// `Completed` or `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchEvent::Completed(_) | SearchEvent::Error { .. })
    }
}
