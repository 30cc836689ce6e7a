//! Centralized configuration for Streamscout.
//!
//! All tunable parameters and heuristic constants are defined here to avoid
//! hard-coded values scattered throughout the search and ranking code.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::{ProviderDescriptor, TrustTier};
use crate::source::Resolution;

/// Errors raised when a configuration value is out of range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A field holds a value the engine cannot work with.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Central configuration for all Streamscout components.
///
/// Groups related configuration settings into logical sections.
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamscoutConfig {
    pub rate_limit: RateLimitSettings,
    pub search: SearchConfig,
    pub aggregation: AggregationConfig,
    pub ranking: RankingConfig,
}

/// Request budget for a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Grants allowed inside any 60 second window
    pub requests_per_minute: u32,
    /// Grants allowed inside any 3600 second window
    pub requests_per_hour: u32,
    /// Simultaneous in-flight requests
    pub burst_size: u32,
    /// Minimum spacing between two grants
    pub cooldown_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl RateLimitConfig {
    /// Budget for providers that are unknown or known to ban aggressively.
    pub fn conservative() -> Self {
        Self {
            requests_per_minute: 10,
            requests_per_hour: 100,
            burst_size: 2,
            cooldown_delay_ms: 2_000,
        }
    }

    /// Budget for ordinary public providers.
    pub fn standard() -> Self {
        Self {
            requests_per_minute: 30,
            requests_per_hour: 500,
            burst_size: 5,
            cooldown_delay_ms: 500,
        }
    }

    /// Budget for providers we operate or that publish generous limits.
    pub fn aggressive() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_hour: 2_000,
            burst_size: 10,
            cooldown_delay_ms: 100,
        }
    }

    /// Preset selected by provider trust tier.
    pub fn for_tier(tier: TrustTier) -> Self {
        match tier {
            TrustTier::Untrusted => Self::conservative(),
            TrustTier::Standard => Self::standard(),
            TrustTier::Trusted => Self::aggressive(),
        }
    }

    /// Cooldown as a [`Duration`].
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_delay_ms)
    }

    /// Checks that every budget is usable.
    ///
    /// # Errors
    /// - `ConfigError::InvalidValue` - A rate or the burst size is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.requests_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.requests_per_minute",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.requests_per_hour == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.requests_per_hour",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.burst_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.burst_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Process-wide rate limiting settings.
///
/// Resolves the per-provider budget: an explicit override wins, otherwise
/// the preset for the provider's trust tier applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Requests in flight across all providers
    pub global_concurrency: usize,
    /// Budgets keyed by provider id, replacing the tier preset
    pub overrides: BTreeMap<String, RateLimitConfig>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            global_concurrency: 10,
            overrides: BTreeMap::new(),
        }
    }
}

impl RateLimitSettings {
    /// Budget that applies to `provider`.
    pub fn config_for(&self, provider: &ProviderDescriptor) -> RateLimitConfig {
        self.overrides
            .get(&provider.id)
            .copied()
            .unwrap_or_else(|| RateLimitConfig::for_tier(provider.trust_tier))
    }
}

/// Retry behaviour for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Pause between attempts
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 250,
        }
    }
}

/// Settings for one orchestrated search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Result count that triggers early completion and caps the final list
    pub max_results: usize,
    /// Hard deadline for a single provider query
    pub per_provider_timeout_ms: u64,
    /// Stop remaining providers once `max_results` raw results arrived
    pub early_completion: bool,
    pub retry: RetryPolicy,
    /// Capacity of the event channel between the search and its consumer
    pub event_buffer: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 100,
            per_provider_timeout_ms: 15_000,
            early_completion: true,
            retry: RetryPolicy::default(),
            event_buffer: 64,
        }
    }
}

impl SearchConfig {
    /// Per-provider deadline as a [`Duration`].
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.per_provider_timeout_ms)
    }

    /// Checks the search settings.
    ///
    /// # Errors
    /// - `ConfigError::InvalidValue` - Zero results, zero timeout or zero buffer
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_results == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.max_results",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.per_provider_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.per_provider_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.event_buffer",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Weights of the aggregated result score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregationWeights {
    pub source_count: f64,
    pub confidence: f64,
    pub rating: f64,
    pub recency: f64,
    pub completeness: f64,
}

impl Default for AggregationWeights {
    fn default() -> Self {
        Self {
            source_count: 0.3,
            confidence: 0.25,
            rating: 0.2,
            recency: 0.15,
            completeness: 0.1,
        }
    }
}

/// Deduplication and scoring settings for raw search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Similarity at or above which two results are merged
    pub duplicate_threshold: f64,
    /// Share of the title in the similarity measure
    pub title_weight: f64,
    /// Share of year proximity in the similarity measure
    pub year_weight: f64,
    pub weights: AggregationWeights,
    /// Results scoring below this are dropped
    pub min_score: f64,
    pub max_results: usize,
    /// Age in years at which recency reaches zero
    pub recency_horizon_years: u32,
    /// Year used for recency; the current UTC year when unset
    pub reference_year: Option<i32>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.8,
            title_weight: 0.8,
            year_weight: 0.2,
            weights: AggregationWeights::default(),
            min_score: 0.1,
            max_results: 100,
            recency_horizon_years: 20,
            reference_year: None,
        }
    }
}

impl AggregationConfig {
    /// Checks the aggregation settings.
    ///
    /// # Errors
    /// - `ConfigError::InvalidValue` - Threshold outside `0.0..=1.0` or zero horizon
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.duplicate_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "aggregation.duplicate_threshold",
                reason: format!("must be within 0.0..=1.0, got {}", self.duplicate_threshold),
            });
        }
        if self.recency_horizon_years == 0 {
            return Err(ConfigError::InvalidValue {
                field: "aggregation.recency_horizon_years",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Base score for each resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionScores {
    pub unknown: u32,
    pub sd: u32,
    pub p480: u32,
    pub p720: u32,
    pub p1080: u32,
    pub p2160: u32,
}

impl Default for ResolutionScores {
    fn default() -> Self {
        Self {
            unknown: 300,
            sd: 300,
            p480: 400,
            p720: 600,
            p1080: 800,
            p2160: 1000,
        }
    }
}

impl ResolutionScores {
    /// Base score of `resolution`.
    pub fn score_for(&self, resolution: Resolution) -> u32 {
        match resolution {
            Resolution::Unknown => self.unknown,
            Resolution::Sd => self.sd,
            Resolution::P480 => self.p480,
            Resolution::P720 => self.p720,
            Resolution::P1080 => self.p1080,
            Resolution::P2160 => self.p2160,
        }
    }
}

/// Bonus per dynamic range format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdrBonuses {
    pub dolby_vision: u32,
    pub hdr10_plus: u32,
    pub hdr10: u32,
}

impl Default for HdrBonuses {
    fn default() -> Self {
        Self {
            dolby_vision: 30,
            hdr10_plus: 25,
            hdr10: 20,
        }
    }
}

/// Swarm health scoring for peer-to-peer sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthScoring {
    /// Seeder count at which the logarithmic part saturates
    pub saturation_seeders: u32,
    /// Points awarded by the logarithmic seeder part
    pub seeder_points: f64,
    /// Bonus when seeders outnumber leechers two to one
    pub strong_ratio_bonus: f64,
    /// Bonus when seeders at least match leechers
    pub even_ratio_bonus: f64,
    /// Points for a fully available swarm
    pub availability_points: f64,
    /// Health assumed for sources without swarm data
    pub unknown_health: f64,
}

impl Default for HealthScoring {
    fn default() -> Self {
        Self {
            saturation_seeders: 1_000,
            seeder_points: 70.0,
            strong_ratio_bonus: 20.0,
            even_ratio_bonus: 10.0,
            availability_points: 10.0,
            unknown_health: 50.0,
        }
    }
}

/// Ordering adjustments for release group reputation (lower ranks first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAdjustments {
    pub trusted: i32,
    pub good: i32,
    pub poor: i32,
    pub banned: i32,
}

impl Default for GroupAdjustments {
    fn default() -> Self {
        Self {
            trusted: -50,
            good: -20,
            poor: 50,
            banned: 100,
        }
    }
}

/// How strongly user preferences shift the quality score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreferenceScaling {
    /// Weight for components matching a stated preference
    pub matching_weight: f64,
    /// Weight for components outside a stated preference
    pub other_weight: f64,
    /// Weight of the HDR bonus when HDR is preferred
    pub preferred_hdr_weight: f64,
    /// Score lost per resolution tier away from the preferred one
    pub resolution_step_penalty: f64,
    /// Points for an exact file size match
    pub size_match_points: f64,
}

impl Default for PreferenceScaling {
    fn default() -> Self {
        Self {
            matching_weight: 1.5,
            other_weight: 0.5,
            preferred_hdr_weight: 2.0,
            resolution_step_penalty: 100.0,
            size_match_points: 50.0,
        }
    }
}

/// Thresholds for dropping sources before sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefilterConfig {
    /// Inputs smaller than this are never pre-filtered
    pub min_input: usize,
    /// 720p-or-better alternatives needed before sub-480p sources go
    pub low_resolution_alternatives: usize,
    /// Trusted alternatives needed before unknown providers go
    pub trusted_alternatives: usize,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            min_input: 50,
            low_resolution_alternatives: 5,
            trusted_alternatives: 10,
        }
    }
}

/// Scoring constants for ordering streaming sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub resolution_scores: ResolutionScores,
    pub hdr_bonuses: HdrBonuses,
    pub health: HealthScoring,
    /// Points per provider reliability tier
    pub reliability_points: f64,
    pub group_adjustments: GroupAdjustments,
    pub preferences: PreferenceScaling,
    pub prefilter: PrefilterConfig,
    /// Inputs larger than this use bounded top-N selection
    pub partial_sort_threshold: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            resolution_scores: ResolutionScores::default(),
            hdr_bonuses: HdrBonuses::default(),
            health: HealthScoring::default(),
            reliability_points: 10.0,
            group_adjustments: GroupAdjustments::default(),
            preferences: PreferenceScaling::default(),
            prefilter: PrefilterConfig::default(),
            partial_sort_threshold: 200,
        }
    }
}

impl StreamscoutConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(value) = env_parse::<usize>("STREAMSCOUT_GLOBAL_CONCURRENCY") {
            config.rate_limit.global_concurrency = value;
        }

        if let Some(value) = env_parse::<usize>("STREAMSCOUT_MAX_RESULTS") {
            config.search.max_results = value;
        }

        if let Some(value) = env_parse::<u64>("STREAMSCOUT_PROVIDER_TIMEOUT_MS") {
            config.search.per_provider_timeout_ms = value;
        }

        if let Some(value) = env_parse::<bool>("STREAMSCOUT_EARLY_COMPLETION") {
            config.search.early_completion = value;
        }

        if let Some(value) = env_parse::<u32>("STREAMSCOUT_MAX_RETRIES") {
            config.search.retry.max_retries = value;
        }

        if let Some(value) = env_parse::<f64>("STREAMSCOUT_DUPLICATE_THRESHOLD") {
            config.aggregation.duplicate_threshold = value;
        }

        if let Some(value) = env_parse::<f64>("STREAMSCOUT_MIN_SCORE") {
            config.aggregation.min_score = value;
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Short timeouts, no cooldowns and a fixed reference year so scores
    /// do not drift with the calendar.
    pub fn for_testing() -> Self {
        let mut config = Self::default();
        config.search.per_provider_timeout_ms = 1_000;
        config.search.retry.backoff_ms = 10;
        config.aggregation.reference_year = Some(2024);
        config
    }

    /// Validates every section.
    ///
    /// # Errors
    /// - `ConfigError::InvalidValue` - The first invalid field found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.global_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.global_concurrency",
                reason: "must be greater than zero".to_string(),
            });
        }
        for override_config in self.rate_limit.overrides.values() {
            override_config.validate()?;
        }
        self.search.validate()?;
        self.aggregation.validate()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = StreamscoutConfig::default();

        assert_eq!(config.rate_limit.global_concurrency, 10);
        assert_eq!(config.search.max_results, 100);
        assert!(config.search.early_completion);
        assert_eq!(config.search.retry.max_retries, 0);
        assert_eq!(config.aggregation.duplicate_threshold, 0.8);
        assert_eq!(config.aggregation.min_score, 0.1);
        assert_eq!(config.ranking.hdr_bonuses.dolby_vision, 30);
        assert_eq!(config.ranking.group_adjustments.trusted, -50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_limit_presets_are_ordered() {
        let conservative = RateLimitConfig::conservative();
        let standard = RateLimitConfig::standard();
        let aggressive = RateLimitConfig::aggressive();

        assert!(conservative.requests_per_minute < standard.requests_per_minute);
        assert!(standard.requests_per_minute < aggressive.requests_per_minute);
        assert!(conservative.cooldown_delay_ms > aggressive.cooldown_delay_ms);
        assert_eq!(RateLimitConfig::for_tier(TrustTier::Trusted), aggressive);
        assert_eq!(RateLimitConfig::for_tier(TrustTier::Untrusted), conservative);
    }

    #[test]
    fn test_override_wins_over_tier_preset() {
        let mut settings = RateLimitSettings::default();
        let provider = ProviderDescriptor::new("alpha", "Alpha").with_trust_tier(TrustTier::Trusted);
        assert_eq!(settings.config_for(&provider), RateLimitConfig::aggressive());

        let custom = RateLimitConfig {
            requests_per_minute: 1,
            requests_per_hour: 1,
            burst_size: 1,
            cooldown_delay_ms: 0,
        };
        settings.overrides.insert("alpha".to_string(), custom);
        assert_eq!(settings.config_for(&provider), custom);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = StreamscoutConfig::default();
        config.aggregation.duplicate_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = StreamscoutConfig::default();
        config.search.max_results = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("search.max_results"));

        let zero_burst = RateLimitConfig {
            burst_size: 0,
            ..RateLimitConfig::standard()
        };
        assert!(zero_burst.validate().is_err());
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("STREAMSCOUT_GLOBAL_CONCURRENCY", "4");
            std::env::set_var("STREAMSCOUT_PROVIDER_TIMEOUT_MS", "2500");
            std::env::set_var("STREAMSCOUT_EARLY_COMPLETION", "false");
            std::env::set_var("STREAMSCOUT_DUPLICATE_THRESHOLD", "0.9");
            std::env::set_var("STREAMSCOUT_MAX_RESULTS", "not-a-number");
        }

        let config = StreamscoutConfig::from_env();

        assert_eq!(config.rate_limit.global_concurrency, 4);
        assert_eq!(config.search.provider_timeout(), Duration::from_millis(2500));
        assert!(!config.search.early_completion);
        assert_eq!(config.aggregation.duplicate_threshold, 0.9);
        assert_eq!(config.search.max_results, 100);

        unsafe {
            std::env::remove_var("STREAMSCOUT_GLOBAL_CONCURRENCY");
            std::env::remove_var("STREAMSCOUT_PROVIDER_TIMEOUT_MS");
            std::env::remove_var("STREAMSCOUT_EARLY_COMPLETION");
            std::env::remove_var("STREAMSCOUT_DUPLICATE_THRESHOLD");
            std::env::remove_var("STREAMSCOUT_MAX_RESULTS");
        }
    }
}
