//! run-partition - split the cache into bucket files and an index

use clap::Parser;
use igdb_cache_common::Result;
use igdb_cache_ingest::cli;
use igdb_cache_ingest::config::PartitionConfig;
use igdb_cache_ingest::partition;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "run-partition")]
#[command(author, version, about = "Partition the IGDB cache into prefix buckets")]
struct Cli {
    /// Cache file to read
    #[arg(short, long, env = "IGDB_CACHE_PATH")]
    cache: Option<PathBuf>,

    /// Directory receiving games/ and index.json
    #[arg(short, long, env = "IGDB_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    let _log_guard = cli::init(args.verbose, "run-partition");

    cli::finish(execute(args))
}

fn execute(args: Cli) -> Result<()> {
    let mut config = PartitionConfig::from_env();

    if let Some(cache) = args.cache {
        config.cache_path = cache;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }

    partition::run(&config).map(|_| ())
}
