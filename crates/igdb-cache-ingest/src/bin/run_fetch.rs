//! run-fetch - download the IGDB catalog into the cache artifact

use clap::Parser;
use igdb_cache_common::Result;
use igdb_cache_ingest::cli;
use igdb_cache_ingest::config::FetchConfig;
use igdb_cache_ingest::fetcher;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "run-fetch")]
#[command(author, version, about = "Download the IGDB game catalog into a local cache file")]
struct Cli {
    /// Cache file to write
    #[arg(short, long, env = "IGDB_CACHE_PATH")]
    cache: Option<PathBuf>,

    /// Stop after this many records (for trial runs)
    #[arg(long)]
    max_records: Option<u64>,

    /// Minimum catalog size accepted as complete
    #[arg(long)]
    min_games: Option<usize>,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    let _log_guard = cli::init(args.verbose, "run-fetch");

    cli::finish(execute(args).await)
}

async fn execute(args: Cli) -> Result<()> {
    let mut config = FetchConfig::from_env()?;

    if let Some(cache) = args.cache {
        config.cache_path = cache;
    }
    if let Some(max) = args.max_records {
        config.max_records = Some(max);
    }
    if let Some(min) = args.min_games {
        config.min_games = min;
    }
    if args.no_progress {
        config.show_progress = false;
    }

    let summary = fetcher::run(&config).await?;
    tracing::info!(
        games = summary.games,
        cache = %summary.cache_path.display(),
        "Cache ready"
    );
    Ok(())
}
