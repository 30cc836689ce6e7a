//! Pairwise similarity between raw search results.

use strsim::normalized_levenshtein;
use streamscout_core::RawResult;
use streamscout_core::config::AggregationConfig;

/// `1 - levenshtein / max_len` on trimmed, lower-cased titles.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&a.trim().to_lowercase(), &b.trim().to_lowercase())
}

/// 1.0 for the same year, 0.8 and 0.6 for one and two years apart, 0.0
/// beyond; 0.5 when either year is unknown.
pub fn year_similarity(a: Option<u16>, b: Option<u16>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => match a.abs_diff(b) {
            0 => 1.0,
            1 => 0.8,
            2 => 0.6,
            _ => 0.0,
        },
        _ => 0.5,
    }
}

/// Weighted title and year similarity.
pub fn result_similarity(a: &RawResult, b: &RawResult, config: &AggregationConfig) -> f64 {
    config.title_weight * title_similarity(&a.title, &b.title)
        + config.year_weight * year_similarity(a.year, b.year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_similarity_ignores_case_and_padding() {
        assert_eq!(title_similarity("Inception", "inception "), 1.0);
        assert!(title_similarity("Interstellar", "Intersteller") > 0.9);
        assert!(title_similarity("The Matrix", "Completely Different") < 0.3);
    }

    #[test]
    fn test_year_similarity_steps() {
        assert_eq!(year_similarity(Some(2010), Some(2010)), 1.0);
        assert_eq!(year_similarity(Some(2010), Some(2011)), 0.8);
        assert_eq!(year_similarity(Some(2012), Some(2010)), 0.6);
        assert_eq!(year_similarity(Some(2010), Some(2014)), 0.0);
        assert_eq!(year_similarity(None, Some(2010)), 0.5);
    }

    #[test]
    fn test_result_similarity_weights() {
        let config = AggregationConfig::default();
        let a = RawResult::new("1", "Dune", "a").with_year(2021);
        let b = RawResult::new("2", "Dune", "b").with_year(1984);

        let similarity = result_similarity(&a, &b, &config);
        assert!((similarity - 0.8).abs() < 1e-9);
    }
}
