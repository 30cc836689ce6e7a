//! Search queries, filters and the raw results providers return.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::provider::ContentType;
use crate::source::Resolution;

/// Inclusive range of release years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub from: Option<u16>,
    pub to: Option<u16>,
}

impl YearRange {
    pub fn contains(&self, year: u16) -> bool {
        self.from.is_none_or(|from| year >= from) && self.to.is_none_or(|to| year <= to)
    }
}

/// Optional narrowing applied to one search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Content types to search; empty means all
    pub content_types: BTreeSet<ContentType>,
    pub year_range: Option<YearRange>,
    pub min_rating: Option<f32>,
    pub genres: BTreeSet<String>,
    pub languages: BTreeSet<String>,
    pub qualities: BTreeSet<Resolution>,
    pub exclude_adult: bool,
}

impl SearchFilters {
    /// Whether `result` passes the filters that can be checked locally.
    ///
    /// Results without a year or rating are kept; genre, language and
    /// quality sets are only forwarded to providers.
    pub fn accepts(&self, result: &RawResult) -> bool {
        if self.exclude_adult && result.adult {
            return false;
        }
        if let (Some(range), Some(year)) = (self.year_range, result.year)
            && !range.contains(year)
        {
            return false;
        }
        if let (Some(min), Some(rating)) = (self.min_rating, result.rating)
            && rating < min
        {
            return false;
        }
        true
    }
}

/// Free-text query plus filters, created once per search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub filters: SearchFilters,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: SearchFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// One search hit as produced by a provider adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub year: Option<u16>,
    /// Rating on a 0.0-10.0 scale
    pub rating: Option<f32>,
    /// Name of the provider that returned the hit
    pub provider: String,
    #[serde(default)]
    pub adult: bool,
}

impl RawResult {
    /// Creates a result with only the mandatory fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            thumbnail_url: None,
            year: None,
            rating: None,
            provider: provider.into(),
            adult: false,
        }
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_apply_year_and_rating() {
        let filters = SearchFilters {
            year_range: Some(YearRange {
                from: Some(2000),
                to: Some(2010),
            }),
            min_rating: Some(7.0),
            ..Default::default()
        };

        let inside = RawResult::new("1", "Inception", "p").with_year(2010).with_rating(8.8);
        let too_old = RawResult::new("2", "Alien", "p").with_year(1979).with_rating(8.5);
        let low_rated = RawResult::new("3", "Catwoman", "p").with_year(2004).with_rating(3.4);
        let unknown = RawResult::new("4", "Untitled", "p");

        assert!(filters.accepts(&inside));
        assert!(!filters.accepts(&too_old));
        assert!(!filters.accepts(&low_rated));
        assert!(filters.accepts(&unknown));
    }

    #[test]
    fn test_adult_results_excluded_on_request() {
        let mut result = RawResult::new("1", "Title", "p");
        result.adult = true;

        assert!(SearchFilters::default().accepts(&result));
        let strict = SearchFilters {
            exclude_adult: true,
            ..Default::default()
        };
        assert!(!strict.accepts(&result));
    }
}
