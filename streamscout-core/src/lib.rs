//! Streamscout Core - Shared vocabulary and admission control
//!
//! This crate provides the types every Streamscout component speaks:
//! provider descriptors, search queries and raw results, streaming source
//! metadata, centralized configuration and the per-provider rate limiter.

pub mod config;
pub mod provider;
pub mod query;
pub mod rate_limit;
pub mod source;

// Re-export main types for convenient access
pub use config::{ConfigError, RateLimitConfig, StreamscoutConfig};
pub use provider::{ContentType, ProviderCapability, ProviderDescriptor, TrustTier};
pub use query::{RawResult, SearchFilters, SearchQuery, YearRange};
pub use rate_limit::{RateLimitError, RateLimitPermit, RateLimitStatus, RateLimiter};
pub use source::{ReleaseName, Resolution, SourceMetadata};

/// Core errors that can bubble up from any Streamscout subsystem.
#[derive(Debug, thiserror::Error)]
pub enum StreamscoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rate limit error: {0}")]
    RateLimit(#[from] RateLimitError),
}

impl StreamscoutError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            StreamscoutError::Config(ConfigError::InvalidValue { field, reason }) => {
                format!("Setting '{field}' {reason}")
            }
            StreamscoutError::RateLimit(RateLimitError::InvalidConfig { provider_id, .. }) => {
                format!("Provider {provider_id} has an unusable rate limit")
            }
            StreamscoutError::RateLimit(RateLimitError::Closed { .. }) => {
                "Request scheduling stopped".to_string()
            }
        }
    }

    /// Checks if this error stems from user supplied settings.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            StreamscoutError::Config(_) | StreamscoutError::RateLimit(RateLimitError::InvalidConfig { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, StreamscoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_user_message() {
        let error: StreamscoutError = ConfigError::InvalidValue {
            field: "search.max_results",
            reason: "must be greater than zero".to_string(),
        }
        .into();

        assert!(error.is_user_error());
        assert_eq!(
            error.user_message(),
            "Setting 'search.max_results' must be greater than zero"
        );
    }
}
