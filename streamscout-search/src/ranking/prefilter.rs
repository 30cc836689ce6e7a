//! Cheap filtering applied to large source lists before sorting.

use streamscout_core::config::PrefilterConfig;
use streamscout_core::{Resolution, SourceMetadata};
use tracing::debug;

/// Drops dead, sub-480p and untrusted sources when better alternatives
/// are plentiful.
///
/// Lists shorter than `config.min_input` pass through untouched. A step
/// that would leave nothing is skipped, so a non-empty input always yields
/// a non-empty output.
pub fn prefilter_sources(sources: Vec<SourceMetadata>, config: &PrefilterConfig) -> Vec<SourceMetadata> {
    if sources.len() < config.min_input {
        return sources;
    }
    let input = sources.len();

    let sources = retain_non_empty(sources, |source| !source.is_dead());

    let high_quality = sources
        .iter()
        .filter(|source| source.quality.resolution >= Resolution::P720)
        .count();
    let sources = if high_quality > config.low_resolution_alternatives {
        retain_non_empty(sources, |source| !source.quality.resolution.is_below_480p())
    } else {
        sources
    };

    let trusted = sources
        .iter()
        .filter(|source| source.provider.reliability.is_trusted())
        .count();
    let sources = if trusted > config.trusted_alternatives {
        retain_non_empty(sources, |source| source.provider.reliability.is_trusted())
    } else {
        sources
    };

    debug!(input, kept = sources.len(), "Pre-filtered sources");
    sources
}

fn retain_non_empty(
    sources: Vec<SourceMetadata>,
    keep: impl Fn(&SourceMetadata) -> bool,
) -> Vec<SourceMetadata> {
    if sources.iter().any(&keep) {
        sources.into_iter().filter(|source| keep(source)).collect()
    } else {
        sources
    }
}

#[cfg(test)]
mod tests {
    use streamscout_core::source::{ProviderKind, ReliabilityTier, SourceProvider};

    use super::*;

    fn source(index: usize, resolution: Resolution, reliability: ReliabilityTier, seeders: u32) -> SourceMetadata {
        SourceMetadata::new(
            format!("s{index}"),
            SourceProvider {
                id: "p".to_string(),
                name: "P".to_string(),
                kind: ProviderKind::PeerToPeer,
                reliability,
            },
        )
        .with_resolution(resolution)
        .with_swarm(seeders, 1)
    }

    #[test]
    fn test_small_input_untouched() {
        let sources: Vec<_> = (0..10)
            .map(|index| source(index, Resolution::Sd, ReliabilityTier::Unknown, 0))
            .collect();

        assert_eq!(prefilter_sources(sources, &PrefilterConfig::default()).len(), 10);
    }

    #[test]
    fn test_large_input_drops_weak_sources() {
        let mut sources: Vec<_> = (0..40)
            .map(|index| source(index, Resolution::P1080, ReliabilityTier::High, 50))
            .collect();
        sources.extend((40..45).map(|index| source(index, Resolution::Sd, ReliabilityTier::High, 50)));
        sources.extend((45..50).map(|index| source(index, Resolution::P720, ReliabilityTier::Unknown, 50)));
        sources.extend((50..55).map(|index| source(index, Resolution::P720, ReliabilityTier::High, 0)));

        let filtered = prefilter_sources(sources, &PrefilterConfig::default());

        assert_eq!(filtered.len(), 40);
        assert!(filtered.iter().all(|source| !source.is_dead()));
        assert!(filtered.iter().all(|source| source.quality.resolution == Resolution::P1080));
    }

    #[test]
    fn test_never_empties_the_list() {
        let sources: Vec<_> = (0..60)
            .map(|index| source(index, Resolution::Sd, ReliabilityTier::Unknown, 0))
            .collect();

        let filtered = prefilter_sources(sources, &PrefilterConfig::default());

        assert_eq!(filtered.len(), 60);
    }
}
