//! Requests handed to provider adapters when looking up sources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use streamscout_core::{ContentType, ProviderDescriptor};
use tracing::debug;
use url::Url;

/// What the caller wants sources for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    /// Caller side identifier of the movie or episode
    pub content_id: String,
    pub title: String,
    pub content_type: ContentType,
    pub year: Option<u16>,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<u64>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl ContentRequest {
    /// Request for a movie.
    pub fn movie(content_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            title: title.into(),
            content_type: ContentType::Movie,
            year: None,
            imdb_id: None,
            tmdb_id: None,
            season: None,
            episode: None,
        }
    }

    /// Request for one episode of a series.
    pub fn episode(content_id: impl Into<String>, title: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            content_type: ContentType::Series,
            season: Some(season),
            episode: Some(episode),
            ..Self::movie(content_id, title)
        }
    }

    pub fn with_imdb_id(mut self, imdb_id: impl Into<String>) -> Self {
        self.imdb_id = Some(imdb_id.into());
        self
    }

    pub fn with_tmdb_id(mut self, tmdb_id: u64) -> Self {
        self.tmdb_id = Some(tmdb_id);
        self
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    /// Stable lookup key: IMDB id when known, with `:season:episode` for
    /// episodes.
    pub fn lookup_key(&self) -> String {
        let base = self.imdb_id.as_deref().unwrap_or(&self.content_id);
        match (self.season, self.episode) {
            (Some(season), Some(episode)) => format!("{base}:{season}:{episode}"),
            _ => base.to_string(),
        }
    }
}

/// Fully built request for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub content_id: String,
    pub title: String,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<u64>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Endpoint to call; `None` for providers without a base URL
    pub url: Option<Url>,
    pub headers: BTreeMap<String, String>,
    /// Built from the title instead of the identifiers
    pub is_fallback: bool,
}

impl ProviderRequest {
    /// Identifier based request: `{base}/stream/{type}/{key}.json`.
    pub fn for_content(provider: &ProviderDescriptor, content: &ContentRequest) -> Self {
        let kind = match content.content_type {
            ContentType::Movie | ContentType::Documentary => "movie",
            ContentType::Series | ContentType::Anime => "series",
        };
        let file = format!("{}.json", content.lookup_key());
        let url = provider_base(provider).and_then(|base| {
            let mut url = base;
            url.path_segments_mut()
                .ok()?
                .pop_if_empty()
                .extend(["stream", kind, file.as_str()]);
            Some(url)
        });
        Self::assemble(content, url, false)
    }

    /// Title based request used after a transient failure:
    /// `{base}/search?q=title[&year][&season&episode]`.
    pub fn title_fallback(provider: &ProviderDescriptor, content: &ContentRequest) -> Self {
        let url = provider_base(provider).and_then(|base| {
            let mut url = base;
            url.path_segments_mut().ok()?.pop_if_empty().push("search");
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("q", &content.title);
                if let Some(year) = content.year {
                    query.append_pair("year", &year.to_string());
                }
                if let (Some(season), Some(episode)) = (content.season, content.episode) {
                    query.append_pair("season", &season.to_string());
                    query.append_pair("episode", &episode.to_string());
                }
            }
            Some(url)
        });
        Self::assemble(content, url, true)
    }

    fn assemble(content: &ContentRequest, url: Option<Url>, is_fallback: bool) -> Self {
        let headers = BTreeMap::from([
            ("Accept".to_string(), "application/json".to_string()),
            (
                "User-Agent".to_string(),
                format!("streamscout/{}", env!("CARGO_PKG_VERSION")),
            ),
        ]);
        Self {
            content_id: content.content_id.clone(),
            title: content.title.clone(),
            imdb_id: content.imdb_id.clone(),
            tmdb_id: content.tmdb_id,
            season: content.season,
            episode: content.episode,
            url,
            headers,
            is_fallback,
        }
    }
}

fn provider_base(provider: &ProviderDescriptor) -> Option<Url> {
    let raw = provider.base_url.as_deref()?;
    match Url::parse(raw) {
        Ok(url) if !url.cannot_be_a_base() => Some(url),
        Ok(_) | Err(_) => {
            debug!(provider = %provider.id, base_url = raw, "Ignoring unusable provider base URL");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ProviderDescriptor {
        ProviderDescriptor::new("torrentio", "Torrentio").with_base_url("https://torrentio.example.org/api/")
    }

    #[test]
    fn test_episode_request_uses_imdb_key() {
        let content = ContentRequest::episode("c1", "Severance", 2, 1).with_imdb_id("tt11280740");
        let request = ProviderRequest::for_content(&provider(), &content);

        assert_eq!(
            request.url.unwrap().as_str(),
            "https://torrentio.example.org/api/stream/series/tt11280740:2:1.json"
        );
        assert_eq!(request.headers.get("Accept").map(String::as_str), Some("application/json"));
        assert!(!request.is_fallback);
    }

    #[test]
    fn test_title_fallback_encodes_query() {
        let content = ContentRequest::movie("c2", "Blade Runner 2049").with_year(2017);
        let request = ProviderRequest::title_fallback(&provider(), &content);

        assert_eq!(
            request.url.unwrap().as_str(),
            "https://torrentio.example.org/api/search?q=Blade+Runner+2049&year=2017"
        );
        assert!(request.is_fallback);
    }

    #[test]
    fn test_missing_base_url_yields_no_endpoint() {
        let bare = ProviderDescriptor::new("local", "Local");
        let request = ProviderRequest::for_content(&bare, &ContentRequest::movie("c3", "Alien"));

        assert!(request.url.is_none());
        assert_eq!(request.content_id, "c3");
    }
}
