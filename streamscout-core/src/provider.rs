//! Provider descriptors as published by the provider registry.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of media a provider can answer queries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Movie,
    Series,
    Anime,
    Documentary,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
            ContentType::Anime => "anime",
            ContentType::Documentary => "documentary",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(ContentType::Movie),
            "series" | "tv" | "show" => Ok(ContentType::Series),
            "anime" => Ok(ContentType::Anime),
            "documentary" | "doc" => Ok(ContentType::Documentary),
            other => Err(format!("unknown content type '{other}'")),
        }
    }
}

/// Feature a provider backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCapability {
    /// Returns playable stream sources
    Streaming,
    /// Returns catalogue metadata (titles, years, ratings)
    Metadata,
    /// Returns peer-to-peer sources with swarm statistics
    PeerToPeer,
}

/// How much a provider is trusted, used to pick its rate-limit preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    Untrusted,
    #[default]
    Standard,
    Trusted,
}

/// Registry entry describing one provider backend.
///
/// Owned by the provider registry; the search engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub id: String,
    pub name: String,
    /// Lower values are queried first
    pub priority: u32,
    pub capabilities: BTreeSet<ProviderCapability>,
    pub content_types: BTreeSet<ContentType>,
    pub enabled: bool,
    pub trust_tier: TrustTier,
    /// Root of the provider API, used to build request URLs
    pub base_url: Option<String>,
}

impl ProviderDescriptor {
    /// Creates an enabled provider with streaming and metadata capabilities
    /// for movies and series.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: 100,
            capabilities: BTreeSet::from([ProviderCapability::Streaming, ProviderCapability::Metadata]),
            content_types: BTreeSet::from([ContentType::Movie, ContentType::Series]),
            enabled: true,
            trust_tier: TrustTier::Standard,
            base_url: None,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = ProviderCapability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    pub fn with_content_types(mut self, content_types: impl IntoIterator<Item = ContentType>) -> Self {
        self.content_types = content_types.into_iter().collect();
        self
    }

    pub fn with_trust_tier(mut self, trust_tier: TrustTier) -> Self {
        self.trust_tier = trust_tier;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether the provider declares `capability`.
    pub fn has_capability(&self, capability: ProviderCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether the provider serves at least one of `requested`.
    ///
    /// An empty request matches every provider.
    pub fn supports_any(&self, requested: &BTreeSet<ContentType>) -> bool {
        requested.is_empty() || !self.content_types.is_disjoint(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_any_matches_overlap() {
        let provider = ProviderDescriptor::new("a", "A").with_content_types([ContentType::Anime]);

        assert!(provider.supports_any(&BTreeSet::new()));
        assert!(provider.supports_any(&BTreeSet::from([ContentType::Anime, ContentType::Movie])));
        assert!(!provider.supports_any(&BTreeSet::from([ContentType::Movie])));
    }

    #[test]
    fn test_content_type_parsing() {
        assert_eq!("TV".parse::<ContentType>(), Ok(ContentType::Series));
        assert_eq!("movie".parse::<ContentType>(), Ok(ContentType::Movie));
        assert!("podcast".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_descriptor_serializes_snake_case() {
        let provider = ProviderDescriptor::new("a", "A").with_trust_tier(TrustTier::Trusted);
        let json = serde_json::to_value(&provider).unwrap();

        assert_eq!(json["trust_tier"], "trusted");
        assert_eq!(json["content_types"][0], "movie");
        assert_eq!(json["capabilities"][0], "streaming");
    }
}
