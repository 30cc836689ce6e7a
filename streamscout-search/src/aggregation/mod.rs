//! Deduplication and scoring of raw search results.
//!
//! Results from many providers are greedily clustered by title and year
//! similarity, each cluster is merged into one [`AggregatedResult`], scored,
//! filtered and ordered.

pub mod similarity;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use streamscout_core::RawResult;
use streamscout_core::config::AggregationConfig;
use tracing::debug;

pub use similarity::{result_similarity, title_similarity, year_similarity};

/// One logical title merged from a cluster of near-duplicate raw results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Contributing raw ids joined with `|`
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub year: Option<u16>,
    pub rating: Option<f32>,
    pub sources: Vec<RawResult>,
    /// Agreement between contributing results, `0.0..=1.0`
    pub confidence: f64,
    /// Ordering score, unbounded
    pub score: f64,
    pub source_count: usize,
}

impl AggregatedResult {
    /// Names of the providers that contributed.
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.iter().map(|source| source.provider.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Bookkeeping about one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationStats {
    pub clusters: usize,
    /// Clusters that merged two or more results
    pub merged_clusters: usize,
    /// Results dropped for scoring below the minimum
    pub filtered_out: usize,
    /// Raw results contributed per provider
    pub provider_contributions: BTreeMap<String, usize>,
    pub average_confidence: f64,
}

/// Output of [`ResultAggregator::aggregate_results`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSearchResults {
    pub items: Vec<AggregatedResult>,
    /// Raw results absorbed into another cluster member
    pub duplicates_removed: usize,
    pub total_source_results: usize,
    pub stats: AggregationStats,
}

/// Pure deduplication and scoring of raw results.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    config: AggregationConfig,
}

impl ResultAggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Clusters, merges, scores, filters and orders `results`.
    pub fn aggregate_results(&self, results: &[RawResult]) -> AggregatedSearchResults {
        let reference_year = self
            .config
            .reference_year
            .unwrap_or_else(|| chrono::Utc::now().year());

        let clusters = self.cluster(results);
        let cluster_count = clusters.len();

        let mut provider_contributions = BTreeMap::new();
        for result in results {
            *provider_contributions.entry(result.provider.clone()).or_insert(0) += 1;
        }

        let mut merged_clusters = 0;
        let mut items: Vec<AggregatedResult> = clusters
            .into_iter()
            .map(|members| {
                if members.len() > 1 {
                    merged_clusters += 1;
                }
                let candidates: Vec<&RawResult> = members.iter().map(|&index| &results[index]).collect();
                let mut item = merge_cluster(&candidates);
                item.score = self.score(&item, reference_year);
                item
            })
            .collect();

        let before_filter = items.len();
        items.retain(|item| item.score >= self.config.min_score);
        let filtered_out = before_filter - items.len();

        items.sort_by(compare_aggregated);
        items.truncate(self.config.max_results);

        let average_confidence = if items.is_empty() {
            0.0
        } else {
            items.iter().map(|item| item.confidence).sum::<f64>() / items.len() as f64
        };

        debug!(
            input = results.len(),
            clusters = cluster_count,
            kept = items.len(),
            filtered_out,
            "Aggregated search results"
        );

        AggregatedSearchResults {
            items,
            duplicates_removed: results.len() - cluster_count,
            total_source_results: results.len(),
            stats: AggregationStats {
                clusters: cluster_count,
                merged_clusters,
                filtered_out,
                provider_contributions,
                average_confidence,
            },
        }
    }

    /// Greedy single pass: each unclustered result absorbs every later
    /// unclustered result similar enough to it.
    fn cluster(&self, results: &[RawResult]) -> Vec<Vec<usize>> {
        let mut assigned = vec![false; results.len()];
        let mut clusters = Vec::new();

        for anchor in 0..results.len() {
            if assigned[anchor] {
                continue;
            }
            assigned[anchor] = true;
            let mut members = vec![anchor];

            for candidate in anchor + 1..results.len() {
                if assigned[candidate] {
                    continue;
                }
                let similarity = result_similarity(&results[anchor], &results[candidate], &self.config);
                if similarity >= self.config.duplicate_threshold {
                    assigned[candidate] = true;
                    members.push(candidate);
                }
            }
            clusters.push(members);
        }

        clusters
    }

    fn score(&self, item: &AggregatedResult, reference_year: i32) -> f64 {
        let weights = &self.config.weights;
        let mut score = item.source_count as f64 * weights.source_count + item.confidence * weights.confidence;

        if let Some(rating) = item.rating {
            score += (f64::from(rating) / 10.0) * weights.rating;
        }
        if let Some(year) = item.year {
            let age = f64::from(reference_year - i32::from(year));
            let recency = (1.0 - age / f64::from(self.config.recency_horizon_years)).clamp(0.0, 1.0);
            score += recency * weights.recency;
        }

        let present = [
            item.description.is_some(),
            item.thumbnail_url.is_some(),
            item.year.is_some(),
            item.rating.is_some(),
        ]
        .iter()
        .filter(|&&present| present)
        .count();
        score += (present as f64 / 4.0) * weights.completeness;

        score
    }
}

/// Aggregates with the given configuration.
pub fn aggregate_results(results: &[RawResult], config: &AggregationConfig) -> AggregatedSearchResults {
    ResultAggregator::new(config.clone()).aggregate_results(results)
}

fn merge_cluster(candidates: &[&RawResult]) -> AggregatedResult {
    let first = candidates[0];
    if candidates.len() == 1 {
        return AggregatedResult {
            id: first.id.clone(),
            title: first.title.clone(),
            description: first.description.clone(),
            thumbnail_url: first.thumbnail_url.clone(),
            year: first.year,
            rating: first.rating,
            sources: vec![first.clone()],
            confidence: 1.0,
            score: 0.0,
            source_count: 1,
        };
    }

    let title = candidates
        .iter()
        .map(|candidate| candidate.title.as_str())
        .fold(first.title.as_str(), longer);
    let description = candidates
        .iter()
        .filter_map(|candidate| candidate.description.as_deref())
        .reduce(longer)
        .map(str::to_string);
    let thumbnail_url = candidates.iter().find_map(|candidate| candidate.thumbnail_url.clone());

    let mut year_counts: BTreeMap<u16, usize> = BTreeMap::new();
    for year in candidates.iter().filter_map(|candidate| candidate.year) {
        *year_counts.entry(year).or_insert(0) += 1;
    }
    // Most frequent, ties to the later year.
    let year = year_counts
        .iter()
        .max_by_key(|&(&year, &count)| (count, year))
        .map(|(&year, _)| year);

    let ratings: Vec<f64> = candidates
        .iter()
        .filter_map(|candidate| candidate.rating.map(f64::from))
        .collect();
    let mean_rating = (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);
    let rating_variance = mean_rating.map_or(0.0, |mean| {
        ratings.iter().map(|rating| (rating - mean).powi(2)).sum::<f64>() / ratings.len() as f64
    });

    let years_agree = candidates.iter().all(|candidate| candidate.year.is_some()) && year_counts.len() == 1;

    let source_count = candidates.len();
    let mut confidence = (source_count as f64 / 3.0).min(1.0);
    if years_agree {
        confidence += 0.1;
    }
    confidence += (0.1 - rating_variance / 10.0).max(0.0);

    AggregatedResult {
        id: candidates
            .iter()
            .map(|candidate| candidate.id.as_str())
            .collect::<Vec<_>>()
            .join("|"),
        title: title.to_string(),
        description,
        thumbnail_url,
        year,
        rating: mean_rating.map(|mean| mean as f32),
        sources: candidates.iter().map(|&candidate| candidate.clone()).collect(),
        confidence: confidence.min(1.0),
        score: 0.0,
        source_count,
    }
}

fn longer<'a>(best: &'a str, candidate: &'a str) -> &'a str {
    if candidate.chars().count() > best.chars().count() {
        candidate
    } else {
        best
    }
}

/// Score, confidence and source count descending, then title ascending.
fn compare_aggregated(a: &AggregatedResult, b: &AggregatedResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| b.source_count.cmp(&a.source_count))
        .then_with(|| a.title.cmp(&b.title))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn config() -> AggregationConfig {
        AggregationConfig {
            reference_year: Some(2024),
            ..AggregationConfig::default()
        }
    }

    #[test]
    fn test_trailing_space_duplicates_merge() {
        let results = vec![
            RawResult::new("a1", "Inception", "alpha").with_year(2010),
            RawResult::new("b1", "Inception ", "beta").with_year(2010),
        ];

        let aggregated = aggregate_results(&results, &config());

        assert_eq!(aggregated.items.len(), 1);
        let item = &aggregated.items[0];
        assert_eq!(item.source_count, 2);
        assert_eq!(item.id, "a1|b1");
        assert_eq!(item.providers(), vec!["alpha", "beta"]);
        assert_eq!(aggregated.duplicates_removed, 1);
        assert_eq!(aggregated.total_source_results, 2);
        assert_eq!(aggregated.stats.merged_clusters, 1);
    }

    #[test]
    fn test_merge_picks_best_fields() {
        let results = vec![
            RawResult::new("a", "Dune", "alpha").with_year(2021).with_rating(8.0),
            RawResult::new("b", "Dune ", "beta")
                .with_year(2021)
                .with_rating(8.2)
                .with_description("Short")
                .with_thumbnail("https://img/first.jpg"),
            RawResult::new("c", "dune", "gamma")
                .with_year(2020)
                .with_description("A much longer description")
                .with_thumbnail("https://img/second.jpg"),
        ];

        let aggregated = aggregate_results(&results, &config());
        let item = &aggregated.items[0];

        assert_eq!(item.source_count, 3);
        assert_eq!(item.title, "Dune ");
        assert_eq!(item.description.as_deref(), Some("A much longer description"));
        assert_eq!(item.thumbnail_url.as_deref(), Some("https://img/first.jpg"));
        assert_eq!(item.year, Some(2021));
        assert!((item.rating.unwrap() - 8.1).abs() < 1e-5);
        // Years disagree: 1.0 from count, no agreement bonus, small variance bonus.
        assert!(item.confidence <= 1.0);
    }

    #[test]
    fn test_year_tie_prefers_later_year() {
        let results = vec![
            RawResult::new("a", "Blade Runner", "alpha").with_year(1982),
            RawResult::new("b", "Blade Runner", "beta").with_year(1983),
        ];

        let aggregated = aggregate_results(&results, &config());

        assert_eq!(aggregated.items.len(), 1);
        assert_eq!(aggregated.items[0].year, Some(1983));
    }

    #[test]
    fn test_confidence_for_small_agreeing_cluster() {
        let results = vec![
            RawResult::new("a", "Heat", "alpha").with_year(1995).with_rating(8.3),
            RawResult::new("b", "Heat", "beta").with_year(1995).with_rating(8.3),
        ];

        let item = &aggregate_results(&results, &config()).items[0];

        // 2/3 + 0.1 (years agree) + 0.1 (no variance)
        assert!((item.confidence - (2.0 / 3.0 + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_singleton_has_full_confidence() {
        let results = vec![RawResult::new("only", "Metropolis", "alpha")];

        let aggregated = aggregate_results(&results, &config());

        assert_eq!(aggregated.items.len(), 1);
        assert_eq!(aggregated.items[0].confidence, 1.0);
        assert_eq!(aggregated.items[0].source_count, 1);
        assert_eq!(aggregated.items[0].id, "only");
    }

    #[test]
    fn test_score_formula() {
        let results = vec![
            RawResult::new("a", "Parasite", "alpha")
                .with_year(2019)
                .with_rating(8.5)
                .with_description("d")
                .with_thumbnail("t"),
        ];

        let item = &aggregate_results(&results, &config()).items[0];

        // 1*0.3 + 1*0.25 + 0.85*0.2 + (1 - 5/20)*0.15 + 1*0.1
        let expected = 0.3 + 0.25 + 0.85 * 0.2 + 0.75 * 0.15 + 0.1;
        assert!((item.score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_min_score_filter_and_truncation() {
        let mut strict = config();
        strict.min_score = 0.6;
        strict.max_results = 1;

        let results = vec![
            RawResult::new("a", "Alien", "alpha").with_rating(8.5).with_year(2020),
            RawResult::new("b", "Jaws", "alpha").with_rating(8.1).with_year(2020),
            RawResult::new("c", "Rocky", "alpha"),
        ];

        let aggregated = aggregate_results(&results, &strict);

        assert_eq!(aggregated.stats.filtered_out, 1);
        assert_eq!(aggregated.items.len(), 1);
        assert_eq!(aggregated.items[0].title, "Alien");
    }

    #[test]
    fn test_equal_scores_order_by_title() {
        let results = vec![
            RawResult::new("1", "Vertigo", "alpha"),
            RawResult::new("2", "Amadeus", "alpha"),
            RawResult::new("3", "Fargo", "alpha"),
        ];

        let aggregated = aggregate_results(&results, &config());
        let titles: Vec<&str> = aggregated.items.iter().map(|item| item.title.as_str()).collect();

        assert_eq!(titles, vec!["Amadeus", "Fargo", "Vertigo"]);
    }

    #[test]
    fn test_empty_input() {
        let aggregated = aggregate_results(&[], &config());

        assert!(aggregated.items.is_empty());
        assert_eq!(aggregated.duplicates_removed, 0);
        assert_eq!(aggregated.stats.average_confidence, 0.0);
    }

    fn dissimilar_results() -> impl Strategy<Value = Vec<RawResult>> {
        prop::sample::subsequence(
            vec![
                "Alien", "Heat", "Vertigo", "Psycho", "Jaws", "Rocky", "Amadeus", "Fargo",
                "Casablanca", "Goodfellas", "Memento", "Parasite",
            ],
            0..12,
        )
        .prop_map(|titles| {
            titles
                .into_iter()
                .enumerate()
                .map(|(index, title)| RawResult::new(index.to_string(), title, "p"))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn no_near_duplicates_means_one_item_per_input(results in dissimilar_results()) {
            let aggregated = aggregate_results(&results, &config());

            prop_assert_eq!(aggregated.items.len(), results.len());
            prop_assert!(aggregated.items.iter().all(|item| item.source_count == 1));
            prop_assert_eq!(aggregated.duplicates_removed, 0);
        }

        #[test]
        fn source_counts_cover_every_input(
            titles in prop::collection::vec("[a-e]{1,4}", 0..30),
            years in prop::collection::vec(prop::option::of(1990u16..1995), 30),
        ) {
            let results: Vec<RawResult> = titles
                .iter()
                .zip(&years)
                .enumerate()
                .map(|(index, (title, year))| {
                    let result = RawResult::new(index.to_string(), title.as_str(), "p");
                    match year {
                        Some(year) => result.with_year(*year),
                        None => result,
                    }
                })
                .collect();

            let mut unbounded = config();
            unbounded.min_score = f64::MIN;
            let aggregated = aggregate_results(&results, &unbounded);

            let covered: usize = aggregated.items.iter().map(|item| item.source_count).sum();
            prop_assert_eq!(covered, results.len());
            prop_assert!(aggregated.items.iter().all(|item| item.source_count >= 1));
            prop_assert!(aggregated.items.iter().all(|item| item.confidence <= 1.0));
        }
    }
}
