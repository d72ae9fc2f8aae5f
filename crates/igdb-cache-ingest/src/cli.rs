//! Shared plumbing for the `run-fetch` and `run-partition` binaries

use igdb_cache_common::logging::{init_logging, LogConfig, LogGuard, LogLevel, LogOutput};
use igdb_cache_common::Result;
use std::process::ExitCode;
use tracing::error;

/// Set up logging for a binary.
///
/// `--verbose` switches the default level to debug; `LOG_*` variables take
/// precedence over both. A logging failure is reported and the run goes on.
pub fn init(verbose: bool, log_file_prefix: &str) -> Option<LogGuard> {
    let defaults = LogConfig::builder()
        .level(if verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix(log_file_prefix)
        .build();

    let config = match defaults.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring invalid logging environment: {}", e);
            defaults
        },
    };

    match init_logging(&config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {:#}", e);
            None
        },
    }
}

/// Map a stage result to the process exit code.
///
/// Failures print one `<Classification>: <cause>` line on stderr.
pub fn finish<T>(result: Result<T>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Run failed");
            eprintln!("{}", e.summary());
            ExitCode::FAILURE
        },
    }
}
