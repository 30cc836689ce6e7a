//! CLI command implementations

use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use futures::StreamExt;
use streamscout_core::source::VideoCodec;
use streamscout_core::{ContentType, Resolution, SearchFilters, SearchQuery, StreamscoutConfig};
use streamscout_search::ranking::FileSizePreference;
use streamscout_search::{
    ContentRequest, ContentSourceManager, DemoProviderClient, SearchEvent, SearchSummary, StaticProviderRegistry,
    UserSortingPreferences,
};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Search every demo provider and print the merged results
    Search {
        /// Free text query
        query: String,
        /// Restrict to one content type (movie, series, anime, documentary)
        #[arg(long = "type")]
        content_type: Option<ContentType>,
        /// Result cap, also the early completion threshold
        #[arg(long)]
        max_results: Option<usize>,
        /// Per-provider deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Wait for every provider even when enough results arrived
        #[arg(long)]
        no_early: bool,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rank demo streaming sources for a title
    Sources {
        /// Movie or series title
        title: String,
        /// IMDB identifier
        #[arg(long)]
        imdb: Option<String>,
        /// Season number, requires --episode
        #[arg(long, requires = "episode")]
        season: Option<u32>,
        /// Episode number, requires --season
        #[arg(long, requires = "season")]
        episode: Option<u32>,
        /// Preferred resolution (480p, 720p, 1080p, 2160p)
        #[arg(long)]
        resolution: Option<Resolution>,
        /// Preferred video codec
        #[arg(long)]
        codec: Option<VideoCodec>,
        /// Preferred file size in gigabytes
        #[arg(long)]
        target_size_gb: Option<f64>,
        /// Only show the best N sources
        #[arg(long)]
        top: Option<usize>,
        /// Print sources as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

/// Handle the CLI command
///
/// # Errors
/// Returns the failure of the command that ran
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    let config = StreamscoutConfig::from_env();
    config.validate().context("invalid configuration")?;

    match command {
        Commands::Search {
            query,
            content_type,
            max_results,
            timeout_ms,
            no_early,
            json,
        } => {
            let mut search = config.search.clone();
            if let Some(max_results) = max_results {
                search.max_results = max_results;
            }
            if let Some(timeout_ms) = timeout_ms {
                search.per_provider_timeout_ms = timeout_ms;
            }
            if no_early {
                search.early_completion = false;
            }
            let filters = SearchFilters {
                content_types: content_type.into_iter().collect(),
                ..SearchFilters::default()
            };
            run_search(&config, SearchQuery::new(query).with_filters(filters), search, json).await
        }
        Commands::Sources {
            title,
            imdb,
            season,
            episode,
            resolution,
            codec,
            target_size_gb,
            top,
            json,
        } => {
            let mut content = match (season, episode) {
                (Some(season), Some(episode)) => ContentRequest::episode(title.clone(), title, season, episode),
                _ => ContentRequest::movie(title.clone(), title),
            };
            if let Some(imdb) = imdb {
                content = content.with_imdb_id(imdb);
            }

            let mut preferences = UserSortingPreferences::default();
            if let Some(resolution) = resolution {
                preferences = preferences.with_resolution(resolution);
            }
            if let Some(codec) = codec {
                preferences = preferences.with_codecs([codec]);
            }
            if let Some(size) = target_size_gb {
                preferences = preferences.with_file_size(FileSizePreference::gigabytes(size));
            }
            show_sources(&config, &content, &preferences, top, json).await
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn demo_manager(config: &StreamscoutConfig) -> ContentSourceManager {
    ContentSourceManager::from_config(
        Arc::new(StaticProviderRegistry::new(DemoProviderClient::demo_providers())),
        Arc::new(DemoProviderClient::new()),
        config,
    )
}

/// Streams search progress to stderr and prints the final results.
///
/// # Errors
/// - The search ended with a fatal `SearchError`
pub async fn run_search(
    config: &StreamscoutConfig,
    query: SearchQuery,
    search: streamscout_core::config::SearchConfig,
    json: bool,
) -> anyhow::Result<()> {
    let manager = demo_manager(config);
    let mut events = manager.orchestrator().perform_search(query, search);

    let mut summary: Option<SearchSummary> = None;
    while let Some(event) = events.next().await {
        match event {
            SearchEvent::Started { query, .. } => eprintln!("Searching for \"{}\"", query.text),
            SearchEvent::ScrapersSelected { provider_ids, .. } => {
                eprintln!("Querying {} providers: {}", provider_ids.len(), provider_ids.join(", "));
            }
            SearchEvent::PartialResults {
                results,
                completed_scrapers,
                total_scrapers,
                ..
            } => eprintln!("  [{completed_scrapers}/{total_scrapers}] {} results so far", results.len()),
            SearchEvent::ScraperError { provider_id, error, .. } => eprintln!("  {provider_id} failed: {error}"),
            SearchEvent::Progress { .. } => {}
            SearchEvent::Completed(done) => summary = Some(done),
            SearchEvent::Error { error, .. } => anyhow::bail!(error.user_message()),
        }
    }
    let summary = summary.context("search ended without a result")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary.results)?);
        return Ok(());
    }

    println!(
        "{} results from {} raw ({} duplicates merged) in {:.2}s",
        summary.results.len(),
        summary.raw_result_count,
        summary.duplicates_removed,
        summary.elapsed.as_secs_f64()
    );
    println!("{:-<72}", "");
    for (rank, result) in summary.results.iter().enumerate() {
        let year = result.year.map(|year| year.to_string()).unwrap_or_else(|| "----".to_string());
        let rating = result
            .rating
            .map(|rating| format!("{rating:.1}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>3}. {} ({year})  rating {rating}  score {:.2}  via {}",
            rank + 1,
            result.title,
            result.score,
            result.providers().join(", ")
        );
    }
    if summary.early_completed {
        println!("Stopped early, {} providers cancelled", summary.cancelled_count);
    }
    Ok(())
}

/// Prints ranked demo sources for `content`.
///
/// # Errors
/// - No streaming provider could be queried or every provider failed
pub async fn show_sources(
    config: &StreamscoutConfig,
    content: &ContentRequest,
    preferences: &UserSortingPreferences,
    top: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let mut manager = demo_manager(config);
    if let Some(top) = top {
        manager = manager.with_max_sources(top);
    }
    let lookup = manager
        .find_sources(content, preferences)
        .await
        .map_err(|error| anyhow::anyhow!(error.user_message()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&lookup.sources)?);
        return Ok(());
    }

    println!(
        "{} sources from {} providers for {}",
        lookup.sources.len(),
        lookup.providers_queried,
        content.lookup_key()
    );
    println!("{:-<72}", "");
    for (rank, source) in lookup.sources.iter().enumerate() {
        let seeders = match source.health.seeders {
            Some(seeders) => format!("{seeders} seeders"),
            None if source.is_cached() => "cached".to_string(),
            None => "-".to_string(),
        };
        let size = source
            .file
            .size_bytes
            .map(|bytes| format!("{:.1} GB", bytes as f64 / 1_000_000_000.0))
            .unwrap_or_else(|| "? GB".to_string());
        println!(
            "{:>3}. {:<8} {:<6} {:<9} {:<12} {}  [{}]",
            rank + 1,
            format!("{:?}", source.quality.resolution),
            format!("{:?}", source.codec.codec),
            size,
            seeders,
            source.file.name.as_deref().unwrap_or(&source.id),
            source.provider.name
        );
    }
    for (provider, error) in &lookup.errors_by_provider {
        println!("  {provider}: {error}");
    }
    Ok(())
}
