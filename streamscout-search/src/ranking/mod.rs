//! Multi-criteria ordering of streaming sources.
//!
//! Sort keys, each breaking ties of the previous one:
//! 1. live sources before dead ones (zero seeders)
//! 2. cached sources before uncached ones
//! 3. quality score, descending
//! 4. swarm health, descending
//! 5. provider reliability, descending
//! 6. release group reputation adjustment, ascending
//! 7. distance to the preferred file size, ascending (only with a size preference)
//! 8. source id, ascending

pub mod preferences;
pub mod prefilter;
pub mod reputation;
pub mod scoring;

use std::cmp::Ordering;

use streamscout_core::SourceMetadata;
use streamscout_core::config::RankingConfig;
use tracing::debug;

pub use preferences::{
    AudioPreference, CachedPreference, FileSizePreference, HdrPreference, UserSortingPreferences,
};
pub use prefilter::prefilter_sources;
pub use reputation::{GroupReputation, GroupTier};
pub use scoring::{health_score, quality_score};

/// Precomputed sort keys of one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceScore {
    pub dead: bool,
    pub cached: bool,
    pub quality: f64,
    pub health: f64,
    pub reliability: u32,
    pub group_adjustment: i32,
    /// Distance to the preferred size; `None` without a size preference or size
    pub size_distance: Option<u64>,
}

/// Pure, deterministic source ordering.
#[derive(Debug, Clone, Default)]
pub struct SourceRanker {
    config: RankingConfig,
    reputation: GroupReputation,
}

impl SourceRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self {
            config,
            reputation: GroupReputation::default(),
        }
    }

    pub fn with_reputation(mut self, reputation: GroupReputation) -> Self {
        self.reputation = reputation;
        self
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Sort keys for `source` under `preferences`.
    pub fn score_source(&self, source: &SourceMetadata, preferences: &UserSortingPreferences) -> SourceScore {
        SourceScore {
            dead: source.is_dead(),
            cached: source.is_cached(),
            quality: quality_score(source, preferences, &self.config),
            health: health_score(source, &self.config.health),
            reliability: source.provider.reliability.ordinal(),
            group_adjustment: self
                .reputation
                .adjustment(source.release.group.as_deref(), &self.config.group_adjustments),
            size_distance: preferences
                .file_size
                .zip(source.file.size_bytes)
                .map(|(preference, size)| preference.distance(size)),
        }
    }

    /// Fully ordered copy of `sources`.
    ///
    /// With [`CachedPreference::CachedOnly`] uncached sources are dropped
    /// when at least one cached source exists.
    pub fn sort_sources(
        &self,
        sources: Vec<SourceMetadata>,
        preferences: &UserSortingPreferences,
    ) -> Vec<SourceMetadata> {
        let mut scored = self.scored(sources, preferences);
        let has_size_preference = preferences.file_size.is_some();
        scored.sort_by(|a, b| compare_scored(a, b, has_size_preference));
        scored.into_iter().map(|(_, source)| source).collect()
    }

    /// The best `limit` sources in order.
    ///
    /// Inputs above the partial-sort threshold are pre-filtered and only
    /// the requested prefix is ordered.
    pub fn top_sources(
        &self,
        sources: Vec<SourceMetadata>,
        preferences: &UserSortingPreferences,
        limit: usize,
    ) -> Vec<SourceMetadata> {
        if limit == 0 {
            return Vec::new();
        }
        let input = sources.len();
        if input <= self.config.partial_sort_threshold {
            let mut sorted = self.sort_sources(sources, preferences);
            sorted.truncate(limit);
            return sorted;
        }

        let sources = prefilter_sources(sources, &self.config.prefilter);
        let mut scored = self.scored(sources, preferences);
        let has_size_preference = preferences.file_size.is_some();
        let compare = |a: &(SourceScore, SourceMetadata), b: &(SourceScore, SourceMetadata)| {
            compare_scored(a, b, has_size_preference)
        };

        if limit < scored.len() {
            scored.select_nth_unstable_by(limit - 1, compare);
            scored.truncate(limit);
        }
        scored.sort_by(compare);

        debug!(input, returned = scored.len(), "Selected top sources");
        scored.into_iter().map(|(_, source)| source).collect()
    }

    fn scored(
        &self,
        sources: Vec<SourceMetadata>,
        preferences: &UserSortingPreferences,
    ) -> Vec<(SourceScore, SourceMetadata)> {
        let cached_only =
            preferences.cached == CachedPreference::CachedOnly && sources.iter().any(SourceMetadata::is_cached);

        sources
            .into_iter()
            .filter(|source| !cached_only || source.is_cached())
            .map(|source| (self.score_source(&source, preferences), source))
            .collect()
    }
}

/// Orders sources with default configuration.
pub fn sort_sources(sources: Vec<SourceMetadata>, preferences: &UserSortingPreferences) -> Vec<SourceMetadata> {
    SourceRanker::default().sort_sources(sources, preferences)
}

fn compare_scored(
    (a, a_source): &(SourceScore, SourceMetadata),
    (b, b_source): &(SourceScore, SourceMetadata),
    has_size_preference: bool,
) -> Ordering {
    a.dead
        .cmp(&b.dead)
        .then_with(|| b.cached.cmp(&a.cached))
        .then_with(|| b.quality.total_cmp(&a.quality))
        .then_with(|| b.health.total_cmp(&a.health))
        .then_with(|| b.reliability.cmp(&a.reliability))
        .then_with(|| a.group_adjustment.cmp(&b.group_adjustment))
        .then_with(|| {
            if has_size_preference {
                compare_distance(a.size_distance, b.size_distance)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a_source.id.cmp(&b_source.id))
}

/// Known distances ascending, unknown sizes last.
fn compare_distance(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use streamscout_core::Resolution;
    use streamscout_core::source::{ProviderKind, ReleaseType, ReliabilityTier, SourceProvider};

    use super::*;

    fn provider(kind: ProviderKind) -> SourceProvider {
        SourceProvider {
            id: "p".to_string(),
            name: "P".to_string(),
            kind,
            reliability: ReliabilityTier::Medium,
        }
    }

    fn ids(sources: &[SourceMetadata]) -> Vec<&str> {
        sources.iter().map(|source| source.id.as_str()).collect()
    }

    #[test]
    fn test_cached_beats_higher_quality() {
        let cached = SourceMetadata::new("cached", provider(ProviderKind::Debrid))
            .with_resolution(Resolution::P480)
            .cached_on("RealDebrid");
        let uhd = SourceMetadata::new("uhd", provider(ProviderKind::Direct))
            .with_resolution(Resolution::P2160)
            .with_release(ReleaseType::Remux, Some("FraMeSToR"));

        let sorted = sort_sources(vec![uhd, cached], &UserSortingPreferences::default());

        assert_eq!(ids(&sorted), vec!["cached", "uhd"]);
    }

    #[test]
    fn test_dead_sources_sink_to_bottom() {
        let dead_uhd = SourceMetadata::new("dead", provider(ProviderKind::PeerToPeer))
            .with_resolution(Resolution::P2160)
            .with_swarm(0, 40);
        let weak_sd = SourceMetadata::new("alive", provider(ProviderKind::PeerToPeer))
            .with_resolution(Resolution::Sd)
            .with_swarm(1, 40);

        let sorted = sort_sources(vec![dead_uhd, weak_sd], &UserSortingPreferences::default());

        assert_eq!(ids(&sorted), vec!["alive", "dead"]);
    }

    #[test]
    fn test_group_reputation_breaks_ties() {
        let trusted = SourceMetadata::new("b", provider(ProviderKind::Direct)).with_release(ReleaseType::WebDl, Some("FLUX"));
        let banned =
            SourceMetadata::new("a", provider(ProviderKind::Direct)).with_release(ReleaseType::WebDl, Some("MkvCage"));
        let unknown =
            SourceMetadata::new("c", provider(ProviderKind::Direct)).with_release(ReleaseType::WebDl, Some("Nobody"));

        let sorted = sort_sources(vec![banned, unknown, trusted], &UserSortingPreferences::default());

        assert_eq!(ids(&sorted), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_size_distance_orders_equal_quality() {
        let mut config = RankingConfig::default();
        config.preferences.size_match_points = 0.0;
        let ranker = SourceRanker::new(config);
        let preferences = UserSortingPreferences::default().with_file_size(FileSizePreference::new(4_000));

        let near = SourceMetadata::new("z-near", provider(ProviderKind::Direct)).with_size(4_100);
        let far = SourceMetadata::new("a-far", provider(ProviderKind::Direct)).with_size(9_000);
        let unknown = SourceMetadata::new("0-unknown", provider(ProviderKind::Direct));

        let sorted = ranker.sort_sources(vec![far, unknown, near], &preferences);

        assert_eq!(ids(&sorted), vec!["z-near", "a-far", "0-unknown"]);
    }

    #[test]
    fn test_cached_only_preference() {
        let cached = SourceMetadata::new("cached", provider(ProviderKind::Debrid)).cached_on("AllDebrid");
        let plain = SourceMetadata::new("plain", provider(ProviderKind::Direct));
        let preferences = UserSortingPreferences::default().cached_only();

        let sorted = sort_sources(vec![plain.clone(), cached], &preferences);
        assert_eq!(ids(&sorted), vec!["cached"]);

        let fallback = sort_sources(vec![plain], &preferences);
        assert_eq!(ids(&fallback), vec!["plain"]);
    }

    #[test]
    fn test_top_sources_matches_full_sort_prefix() {
        let mut config = RankingConfig::default();
        config.partial_sort_threshold = 20;
        config.prefilter.min_input = usize::MAX;
        let ranker = SourceRanker::new(config);
        let preferences = UserSortingPreferences::default();

        let resolutions = [Resolution::Sd, Resolution::P720, Resolution::P1080, Resolution::P2160];
        let sources: Vec<_> = (0..60)
            .map(|index| {
                SourceMetadata::new(format!("s{index:02}"), provider(ProviderKind::PeerToPeer))
                    .with_resolution(resolutions[index % 4])
                    .with_swarm((index * 7 % 50) as u32, 5)
            })
            .collect();

        let full = ranker.sort_sources(sources.clone(), &preferences);
        let top = ranker.top_sources(sources, &preferences, 10);

        assert_eq!(top, full[..10].to_vec());
        assert!(ranker.top_sources(Vec::new(), &preferences, 0).is_empty());
    }

    fn arbitrary_source() -> impl Strategy<Value = SourceMetadata> {
        (
            0u32..1_000,
            prop::sample::select(vec![
                Resolution::Unknown,
                Resolution::Sd,
                Resolution::P480,
                Resolution::P720,
                Resolution::P1080,
                Resolution::P2160,
            ]),
            prop::option::of((0u32..500, 0u32..500)),
            any::<bool>(),
            prop::option::of(1u64..20_000_000_000),
            prop::sample::select(vec!["FLUX", "YTS", "MkvCage", "Unknown"]),
        )
            .prop_map(|(id, resolution, swarm, cached, size, group)| {
                let kind = if swarm.is_some() {
                    ProviderKind::PeerToPeer
                } else {
                    ProviderKind::Debrid
                };
                let mut source = SourceMetadata::new(format!("s{id}"), provider(kind))
                    .with_resolution(resolution)
                    .with_release(ReleaseType::WebDl, Some(group));
                if let Some((seeders, leechers)) = swarm {
                    source = source.with_swarm(seeders, leechers);
                }
                if cached {
                    source = source.cached_on("RealDebrid");
                }
                if let Some(size) = size {
                    source = source.with_size(size);
                }
                source
            })
    }

    fn arbitrary_preferences() -> impl Strategy<Value = UserSortingPreferences> {
        (
            prop::option::of(prop::sample::select(vec![Resolution::P720, Resolution::P1080, Resolution::P2160])),
            prop::sample::select(vec![HdrPreference::Any, HdrPreference::Prefer, HdrPreference::Avoid]),
            prop::option::of(1u64..20_000_000_000),
        )
            .prop_map(|(resolution, hdr, size)| UserSortingPreferences {
                preferred_resolution: resolution,
                hdr,
                file_size: size.map(FileSizePreference::new),
                ..UserSortingPreferences::default()
            })
    }

    proptest! {
        #[test]
        fn live_cached_sources_precede_uncached(
            sources in prop::collection::vec(arbitrary_source(), 0..40),
            preferences in arbitrary_preferences(),
        ) {
            let sorted = sort_sources(sources, &preferences);
            let live: Vec<&SourceMetadata> = sorted.iter().filter(|source| !source.is_dead()).collect();

            if let Some(first_uncached) = live.iter().position(|source| !source.is_cached()) {
                prop_assert!(live[first_uncached..].iter().all(|source| !source.is_cached()));
            }
        }

        #[test]
        fn dead_sources_rank_after_live_ones(
            sources in prop::collection::vec(arbitrary_source(), 0..40),
            preferences in arbitrary_preferences(),
        ) {
            let sorted = sort_sources(sources, &preferences);

            if let Some(first_dead) = sorted.iter().position(SourceMetadata::is_dead) {
                prop_assert!(sorted[first_dead..].iter().all(SourceMetadata::is_dead));
            }
        }

        #[test]
        fn sorting_is_deterministic(
            sources in prop::collection::vec(arbitrary_source(), 0..40),
            preferences in arbitrary_preferences(),
        ) {
            let mut reversed = sources.clone();
            reversed.reverse();

            let first = sort_sources(sources.clone(), &preferences);
            let second = sort_sources(sources, &preferences);
            prop_assert_eq!(&first, &second);

            let ids_first: Vec<String> = first.iter().map(|source| source.id.clone()).collect();
            let ids_reversed: Vec<String> =
                sort_sources(reversed, &preferences).iter().map(|source| source.id.clone()).collect();
            prop_assert_eq!(ids_first, ids_reversed);
        }
    }
}
