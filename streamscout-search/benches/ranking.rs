use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use streamscout_core::config::AggregationConfig;
use streamscout_core::source::{ProviderKind, ReliabilityTier, SourceProvider};
use streamscout_core::{RawResult, Resolution, SourceMetadata};
use streamscout_search::ranking::{FileSizePreference, SourceRanker, UserSortingPreferences};
use streamscout_search::ResultAggregator;

const RESOLUTIONS: [Resolution; 4] = [Resolution::Sd, Resolution::P720, Resolution::P1080, Resolution::P2160];

fn sources(count: usize) -> Vec<SourceMetadata> {
    (0..count)
        .map(|index| {
            let provider = SourceProvider {
                id: format!("p{}", index % 7),
                name: format!("Provider {}", index % 7),
                kind: ProviderKind::PeerToPeer,
                reliability: if index % 3 == 0 {
                    ReliabilityTier::High
                } else {
                    ReliabilityTier::Medium
                },
            };
            let mut source = SourceMetadata::new(format!("s{index}"), provider)
                .with_resolution(RESOLUTIONS[index % RESOLUTIONS.len()])
                .with_swarm((index * 37 % 900) as u32, (index % 50) as u32)
                .with_size(1_000_000_000 + (index as u64 % 20) * 250_000_000);
            if index % 11 == 0 {
                source = source.cached_on("debrid");
            }
            source
        })
        .collect()
}

fn raw_results(count: usize) -> Vec<RawResult> {
    const TITLES: [&str; 6] = ["Dune", "Dune Part Two", "Heat", "Alien", "Aliens", "Blade Runner"];
    (0..count)
        .map(|index| {
            RawResult::new(format!("r{index}"), TITLES[index % TITLES.len()], format!("p{}", index % 5))
                .with_year(1979 + (index % 45) as u16)
                .with_rating(5.0 + (index % 50) as f32 / 10.0)
        })
        .collect()
}

fn bench_source_ranking(c: &mut Criterion) {
    let ranker = SourceRanker::default();
    let preferences = UserSortingPreferences::default()
        .with_resolution(Resolution::P1080)
        .with_file_size(FileSizePreference::gigabytes(4.0));

    let mut group = c.benchmark_group("source_ranking");
    for count in [50, 500, 5_000] {
        let input = sources(count);
        group.bench_with_input(BenchmarkId::new("sort_sources", count), &input, |b, input| {
            b.iter(|| ranker.sort_sources(black_box(input.clone()), &preferences));
        });
        group.bench_with_input(BenchmarkId::new("top_sources_10", count), &input, |b, input| {
            b.iter(|| ranker.top_sources(black_box(input.clone()), &preferences, 10));
        });
    }
    group.finish();
}

fn bench_aggregation(c: &mut Criterion) {
    let aggregator = ResultAggregator::new(AggregationConfig {
        reference_year: Some(2024),
        ..AggregationConfig::default()
    });

    let mut group = c.benchmark_group("aggregation");
    for count in [20, 100, 400] {
        let input = raw_results(count);
        group.bench_with_input(BenchmarkId::new("aggregate_results", count), &input, |b, input| {
            b.iter(|| aggregator.aggregate_results(black_box(input)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_source_ranking, bench_aggregation);
criterion_main!(benches);
