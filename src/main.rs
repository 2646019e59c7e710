use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;

use place_crawler::all_search::AllSearchClient;
use place_crawler::config::{default_keywords, default_locations};
use place_crawler::crawler::{crawl_keywords, replay, timestamped_path};
use place_crawler::processor::{clean_results, write_csv};
use place_crawler::sanitizer::display_name;
use place_crawler::workbook::write_xlsx;
use place_crawler::{api, load_config, logging, CrawlerConfig, ResultAggregator};

const RESULTS_STEM: &str = "naver_map_results";
const ALL_SEARCH_PAGE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "place-crawler")]
#[command(about = "Collects ranked place listings from Naver Map search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args)]
struct OutputArgs {
    /// JSON output file (overwritten). Defaults to <output_dir>/naver_map_results.json
    #[arg(long)]
    output: Option<PathBuf>,

    /// Add a timestamp to the default output file name
    #[arg(long)]
    timestamped: bool,

    /// Also write a CSV export to this path
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Also write an Excel workbook (all rows, one sheet per keyword, summary)
    #[arg(long)]
    xlsx: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search keywords in the browser and collect ranked places
    Crawl {
        /// Keywords to search; defaults to a built-in list
        keywords: Vec<String>,

        /// Places per keyword
        #[arg(long)]
        limit: Option<usize>,

        #[command(flatten)]
        out: OutputArgs,
    },
    /// Query the JSON search endpoint around several city centres
    SearchApi {
        keywords: Vec<String>,

        #[command(flatten)]
        out: OutputArgs,
    },
    /// Run extraction over a saved search-frame HTML file
    Replay {
        html: PathBuf,

        #[arg(long, default_value = "replay")]
        query: String,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        bind: Option<std::net::SocketAddr>,
    },
}

fn resolve_output(config: &CrawlerConfig, out: &OutputArgs) -> PathBuf {
    match &out.output {
        Some(path) => path.clone(),
        None if out.timestamped => timestamped_path(&config.output_dir, RESULTS_STEM, "json").1,
        None => config.output_dir.join(format!("{RESULTS_STEM}.json")),
    }
}

fn keywords_or_default(keywords: Vec<String>) -> Vec<String> {
    if keywords.is_empty() {
        default_keywords()
    } else {
        keywords
    }
}

fn write_outputs(config: &CrawlerConfig, aggregator: ResultAggregator, out: &OutputArgs) -> anyhow::Result<()> {
    let path = resolve_output(config, out);

    for query in aggregator.queries() {
        let records = aggregator.records(query);
        info!("'{}': {} places", query, records.len());
        for record in records.iter().take(10) {
            info!("  {}. {} - {}", record.rank, display_name(&record.name), record.address);
        }
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let document = aggregator.into_document(timestamp);
    document
        .write_json(&path)
        .with_context(|| format!("writing {}", path.display()))?;

    if out.csv.is_some() || out.xlsx.is_some() {
        let cleaned = clean_results(&document.results);
        if let Some(csv) = &out.csv {
            write_csv(csv, &cleaned).with_context(|| format!("writing {}", csv.display()))?;
        }
        if let Some(xlsx) = &out.xlsx {
            write_xlsx(xlsx, &cleaned).with_context(|| format!("writing {}", xlsx.display()))?;
        }
    }

    info!("🎉 done: {} places in {}", document.total_places, path.display());
    Ok(())
}

fn print_replay(html: &Path, records: &[place_crawler::PlaceRecord]) {
    info!("{} places extracted from {}", records.len(), html.display());
    for record in records {
        info!(
            "  {}. {} | {} | {}",
            record.rank,
            display_name(&record.name),
            record.address,
            record.category
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config()?;
    logging::init(&config)?;

    match cli.command {
        Commands::Crawl { keywords, limit, out } => {
            let keywords = keywords_or_default(keywords);
            let limit = limit.unwrap_or(config.max_results);
            info!("🗺️ crawling {} keywords: {:?}", keywords.len(), keywords);

            let aggregator = crawl_keywords(&config, &keywords, limit).await?;
            write_outputs(&config, aggregator, &out)?;
        }
        Commands::SearchApi { keywords, out } => {
            let keywords = keywords_or_default(keywords);
            let client = AllSearchClient::new(&config.base_url, config.navigation_timeout, ALL_SEARCH_PAGE_DELAY)?;
            let locations = default_locations();

            let mut aggregator = ResultAggregator::new();
            for keyword in &keywords {
                info!("🎯 '{}'", keyword);
                let total = client
                    .search_locations(keyword, &locations, config.query_delay, &mut aggregator)
                    .await;
                info!("📈 '{}': {} unique places", keyword, total);
            }
            write_outputs(&config, aggregator, &out)?;
        }
        Commands::Replay { html, query, limit } => {
            let limit = limit.unwrap_or(config.max_results);
            let records = replay(&config, &html, &query, limit)
                .await
                .with_context(|| format!("replaying {}", html.display()))?;
            print_replay(&html, &records);
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            api::serve(config).await?;
        }
    }

    Ok(())
}
