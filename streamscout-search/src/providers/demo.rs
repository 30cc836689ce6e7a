//! Demo provider client for development and the CLI.

use async_trait::async_trait;
use streamscout_core::source::{ProviderKind, ReliabilityTier, SourceProvider};
use streamscout_core::{
    ProviderCapability, ProviderDescriptor, RawResult, SearchQuery, SourceMetadata, TrustTier,
};

use super::{ProviderClient, ProviderRequest};
use crate::errors::ApiError;

struct CatalogueEntry {
    key: &'static str,
    title: &'static str,
    year: u16,
    rating: f32,
    plot: &'static str,
    imdb_id: &'static str,
}

const CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry {
        key: "interstellar",
        title: "Interstellar",
        year: 2014,
        rating: 8.6,
        plot: "A team of explorers travel through a wormhole in space in an attempt to ensure humanity's survival.",
        imdb_id: "tt0816692",
    },
    CatalogueEntry {
        key: "matrix",
        title: "The Matrix",
        year: 1999,
        rating: 8.7,
        plot: "A computer hacker learns from mysterious rebels about the true nature of his reality.",
        imdb_id: "tt0133093",
    },
    CatalogueEntry {
        key: "inception",
        title: "Inception",
        year: 2010,
        rating: 8.8,
        plot: "A thief who steals corporate secrets through dream-sharing technology is given the inverse task of planting an idea.",
        imdb_id: "tt1375666",
    },
    CatalogueEntry {
        key: "dune",
        title: "Dune",
        year: 2021,
        rating: 8.0,
        plot: "Paul Atreides leads nomadic tribes in a revolt against the galactic emperor.",
        imdb_id: "tt1160419",
    },
    CatalogueEntry {
        key: "blade runner",
        title: "Blade Runner",
        year: 1982,
        rating: 8.1,
        plot: "A blade runner must pursue and terminate four replicants who stole a ship in space.",
        imdb_id: "tt0083658",
    },
];

/// Release name templates; `{}` is replaced with the dotted title.
const RELEASES: &[(&str, u64, u32, u32)] = &[
    ("{}.2160p.BluRay.REMUX.DV.HDR.HEVC.TrueHD.Atmos-FraMeSToR", 58_000_000_000, 45, 8),
    ("{}.2160p.WEB-DL.DDP5.1.HDR10+.HEVC-FLUX", 16_500_000_000, 120, 30),
    ("{}.1080p.BluRay.x264.DTS-SPARKS", 11_000_000_000, 310, 40),
    ("{}.1080p.WEBRip.x265.AAC-YTS", 2_100_000_000, 950, 300),
    ("{}.720p.HDTV.x264-DEMO", 1_200_000_000, 14, 20),
    ("{}.HDCAM.x264-EVO", 900_000_000, 0, 3),
];

/// Provider client returning canned data for well known titles.
///
/// Every provider answers slightly differently (title casing, missing
/// fields) so aggregation has real duplicates to merge.
#[derive(Debug, Default)]
pub struct DemoProviderClient;

impl DemoProviderClient {
    pub fn new() -> Self {
        Self
    }

    /// Providers matching the demo data.
    pub fn demo_providers() -> Vec<ProviderDescriptor> {
        vec![
            ProviderDescriptor::new("cinemeta", "Cinemeta")
                .with_priority(10)
                .with_capabilities([ProviderCapability::Metadata])
                .with_trust_tier(TrustTier::Trusted)
                .with_base_url("https://cinemeta.example.org/"),
            ProviderDescriptor::new("torrentio", "Torrentio")
                .with_priority(20)
                .with_capabilities([
                    ProviderCapability::Streaming,
                    ProviderCapability::Metadata,
                    ProviderCapability::PeerToPeer,
                ])
                .with_base_url("https://torrentio.example.org/"),
            ProviderDescriptor::new("debridio", "Debridio")
                .with_priority(30)
                .with_trust_tier(TrustTier::Trusted)
                .with_base_url("https://debridio.example.org/"),
            ProviderDescriptor::new("openhoard", "OpenHoard")
                .with_priority(40)
                .with_capabilities([ProviderCapability::Streaming, ProviderCapability::PeerToPeer])
                .with_trust_tier(TrustTier::Untrusted),
        ]
    }

    fn lookup(text: &str) -> Option<&'static CatalogueEntry> {
        let text = text.to_lowercase();
        CATALOGUE.iter().find(|entry| text.contains(entry.key))
    }

    fn source_provider(provider: &ProviderDescriptor) -> SourceProvider {
        let kind = if provider.has_capability(ProviderCapability::PeerToPeer) {
            ProviderKind::PeerToPeer
        } else {
            ProviderKind::Debrid
        };
        let reliability = match provider.trust_tier {
            TrustTier::Trusted => ReliabilityTier::High,
            TrustTier::Standard => ReliabilityTier::Medium,
            TrustTier::Untrusted => ReliabilityTier::Low,
        };
        SourceProvider {
            id: provider.id.clone(),
            name: provider.name.clone(),
            kind,
            reliability,
        }
    }
}

#[async_trait]
impl ProviderClient for DemoProviderClient {
    async fn search(
        &self,
        provider: &ProviderDescriptor,
        query: &SearchQuery,
    ) -> Result<Vec<RawResult>, ApiError> {
        let text = query.text.trim();
        if text.is_empty() {
            return Err(ApiError::new(400, "empty query"));
        }

        let result = match Self::lookup(text) {
            Some(entry) => {
                let mut result = RawResult::new(
                    format!("{}:{}", provider.id, entry.imdb_id),
                    entry.title,
                    &provider.name,
                )
                .with_year(entry.year)
                .with_rating(entry.rating);
                // Metadata providers carry plot and artwork, scrapers do not.
                if provider.has_capability(ProviderCapability::Metadata) {
                    result = result
                        .with_description(entry.plot)
                        .with_thumbnail(format!("https://img.example.org/{}.jpg", entry.imdb_id));
                }
                result
            }
            None => RawResult::new(format!("{}:{}", provider.id, text.to_lowercase()), text, &provider.name)
                .with_description(format!(
                    "A thrilling story about {text} with compelling characters and stunning visuals."
                ))
                .with_rating(7.5),
        };

        Ok(vec![result])
    }

    async fn fetch_sources(
        &self,
        provider: &ProviderDescriptor,
        request: &ProviderRequest,
    ) -> Result<Vec<SourceMetadata>, ApiError> {
        if !provider.has_capability(ProviderCapability::Streaming) {
            return Err(ApiError::new(501, "provider does not serve streams"));
        }

        let dotted = request.title.split_whitespace().collect::<Vec<_>>().join(".");
        let dotted = match (request.season, request.episode) {
            (Some(season), Some(episode)) => format!("{dotted}.S{season:02}E{episode:02}"),
            _ => dotted,
        };
        let source_provider = Self::source_provider(provider);
        let peer_to_peer = source_provider.kind == ProviderKind::PeerToPeer;

        let sources = RELEASES
            .iter()
            .enumerate()
            .map(|(index, (template, size, seeders, leechers))| {
                let name = template.replace("{}", &dotted);
                let mut source = SourceMetadata::from_release_name(
                    format!("{}:{}:{index}", provider.id, request.content_id),
                    source_provider.clone(),
                    &name,
                )
                .with_size(*size);
                if peer_to_peer {
                    source = source.with_swarm(*seeders, *leechers);
                } else if index < 3 {
                    source = source.cached_on(provider.name.clone());
                }
                source
            })
            .collect();

        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use streamscout_core::Resolution;

    use super::*;
    use crate::providers::ContentRequest;

    #[tokio::test]
    async fn test_known_title_uses_catalogue() {
        let client = DemoProviderClient::new();
        let providers = DemoProviderClient::demo_providers();

        let results = client
            .search(&providers[0], &SearchQuery::new("the matrix"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "The Matrix");
        assert_eq!(results[0].year, Some(1999));
        assert!(results[0].description.is_some());
    }

    #[tokio::test]
    async fn test_sources_follow_provider_kind() {
        let client = DemoProviderClient::new();
        let providers = DemoProviderClient::demo_providers();
        let content = ContentRequest::movie("c1", "Dune");

        let swarm = &providers[1];
        let request = ProviderRequest::for_content(swarm, &content);
        let sources = client.fetch_sources(swarm, &request).await.unwrap();
        assert_eq!(sources.len(), RELEASES.len());
        assert!(sources.iter().all(|source| source.health.seeders.is_some()));
        assert_eq!(sources[0].quality.resolution, Resolution::P2160);
        assert!(sources.last().unwrap().is_dead());

        let debrid = &providers[2];
        let request = ProviderRequest::for_content(debrid, &content);
        let sources = client.fetch_sources(debrid, &request).await.unwrap();
        assert_eq!(sources.iter().filter(|source| source.is_cached()).count(), 3);

        let metadata_only = &providers[0];
        let request = ProviderRequest::for_content(metadata_only, &content);
        assert!(client.fetch_sources(metadata_only, &request).await.is_err());
    }
}
