//! Error types for provider calls and orchestrated searches.

use thiserror::Error;

/// Failure reported by a provider adapter or the provider registry.
///
/// Carries an HTTP-like status; `0` means the request never produced a
/// response (connection reset, DNS failure, client-side timeout).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Provider API error (status {status}): {message}")]
pub struct ApiError {
    /// HTTP-like status code, `0` when no response arrived
    pub status: u16,
    /// Adapter supplied description
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Error for a request that never got a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    /// Transient failures are worth retrying through a fallback request.
    pub fn is_transient(&self) -> bool {
        self.status == 0 || self.message.to_ascii_lowercase().contains("timeout")
    }
}

/// Non-fatal failure of one provider inside a search.
///
/// Recorded per provider and surfaced in the search summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFailure {
    /// Provider exceeded the per-provider deadline
    #[error("Provider timed out after {timeout_ms}ms")]
    Timeout {
        /// Deadline that was exceeded
        timeout_ms: u64,
    },

    /// Provider answered with an error
    #[error("Provider error (status {status}): {message}")]
    Api {
        /// Status reported by the adapter
        status: u16,
        /// Adapter supplied description
        message: String,
    },

    /// No rate limit permit could be obtained
    #[error("Rate limit acquisition failed: {reason}")]
    RateLimitAcquisitionFailed {
        /// Why acquisition failed
        reason: String,
    },

    /// Provider task ended abnormally
    #[error("Provider task aborted: {reason}")]
    TaskFailed {
        /// Panic or join failure description
        reason: String,
    },
}

impl ProviderFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderFailure::Timeout { .. })
    }

    /// Timeouts and transient API errors.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderFailure::Timeout { .. } => true,
            ProviderFailure::Api { status, message } => {
                ApiError::new(*status, message.clone()).is_transient()
            }
            ProviderFailure::RateLimitAcquisitionFailed { .. } | ProviderFailure::TaskFailed { .. } => false,
        }
    }
}

impl From<ApiError> for ProviderFailure {
    fn from(error: ApiError) -> Self {
        ProviderFailure::Api {
            status: error.status,
            message: error.message,
        }
    }
}

impl From<streamscout_core::RateLimitError> for ProviderFailure {
    fn from(error: streamscout_core::RateLimitError) -> Self {
        ProviderFailure::RateLimitAcquisitionFailed {
            reason: error.to_string(),
        }
    }
}

/// Fatal failure of a whole search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The provider registry could not be read
    #[error("Provider registry unavailable: {reason}")]
    RegistryUnavailable {
        /// Registry failure description
        reason: String,
    },

    /// The registry lists no enabled provider at all
    #[error("No providers configured")]
    NoProvidersConfigured,

    /// No enabled provider serves the requested content
    #[error("No eligible providers for content types: {requested}")]
    NoEligibleProviders {
        /// Requested content types, comma separated
        requested: String,
    },

    /// Every selected provider failed
    #[error("All {attempted} providers failed")]
    AllProvidersFailed {
        /// Providers that were queried
        attempted: usize,
    },

    /// The search was cancelled before it settled
    #[error("Search cancelled")]
    Cancelled,

    /// Configuration rejected before the search started
    #[error("Invalid search configuration: {reason}")]
    InvalidConfig {
        /// Validation failure
        reason: String,
    },
}

impl SearchError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            SearchError::RegistryUnavailable { .. } => {
                "Provider list could not be loaded, try again later".to_string()
            }
            SearchError::NoProvidersConfigured => "No providers are configured".to_string(),
            SearchError::NoEligibleProviders { requested } => {
                format!("No provider supports {requested}")
            }
            SearchError::AllProvidersFailed { attempted } => {
                format!("All {attempted} providers failed to answer")
            }
            SearchError::Cancelled => "Search was cancelled".to_string(),
            SearchError::InvalidConfig { reason } => format!("Invalid search settings: {reason}"),
        }
    }

    /// Whether the failure ends the search without any partial result.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SearchError::Cancelled)
    }
}

impl From<streamscout_core::ConfigError> for SearchError {
    fn from(error: streamscout_core::ConfigError) -> Self {
        SearchError::InvalidConfig {
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_api_errors() {
        assert!(ApiError::network("connection reset").is_transient());
        assert!(ApiError::new(504, "Gateway Timeout").is_transient());
        assert!(!ApiError::new(404, "not found").is_transient());

        let failure = ProviderFailure::from(ApiError::new(500, "read timeout"));
        assert!(failure.is_transient());
        assert!(!failure.is_timeout());
        assert!(ProviderFailure::Timeout { timeout_ms: 10 }.is_transient());
    }

    #[test]
    fn test_user_messages_distinguish_causes() {
        let none = SearchError::NoProvidersConfigured.user_message();
        let failed = SearchError::AllProvidersFailed { attempted: 3 }.user_message();

        assert_ne!(none, failed);
        assert!(failed.contains('3'));
    }
}
