//! Cache artifact I/O
//!
//! The cache is a JSON array with one compact record per line. It is written
//! to a temp file in the target directory and renamed over the old cache, so
//! a reader sees either the previous catalog or the new one.

use igdb_cache_common::{GameRecord, PipelineError, Result};
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Atomically replace the cache at `path` with `games`
pub fn write_cache(path: &Path, games: &[GameRecord]) -> Result<u64> {
    let fail = |what: &str, e: &dyn std::fmt::Display| {
        PipelineError::fetch(format!("cannot {} cache {}: {}", what, path.display(), e))
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| fail("create directory for", &e))?;

    let tmp = NamedTempFile::new_in(parent).map_err(|e| fail("create temp file for", &e))?;
    {
        let mut out = BufWriter::new(tmp.as_file());
        write_records(&mut out, games).map_err(|e| fail("write", &e))?;
        out.flush().map_err(|e| fail("write", &e))?;
    }
    tmp.as_file().sync_all().map_err(|e| fail("sync", &e))?;

    let file = tmp.persist(path).map_err(|e| fail("replace", &e.error))?;
    let size = file.metadata().map(|m| m.len()).unwrap_or_default();

    info!(path = %path.display(), games = games.len(), bytes = size, "Cache written");
    Ok(size)
}

/// One compact record per line inside a JSON array
pub(crate) fn write_records<W: Write>(out: &mut W, games: &[GameRecord]) -> std::io::Result<()> {
    if games.is_empty() {
        return out.write_all(b"[]\n");
    }

    out.write_all(b"[\n")?;
    for (i, game) in games.iter().enumerate() {
        if i > 0 {
            out.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut *out, game)?;
    }
    out.write_all(b"\n]\n")
}

/// Read and check a cache artifact.
///
/// Missing, unreadable, malformed, empty caches and caches with repeated
/// `igdb_id`s are all `InputError`.
pub fn load_cache(path: &Path) -> Result<Vec<GameRecord>> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::input(format!(
                "cache {} not found; run run-fetch first",
                path.display()
            ))
        } else {
            PipelineError::input(format!("cannot read cache {}: {}", path.display(), e))
        }
    })?;

    let games: Vec<GameRecord> = serde_json::from_slice(&bytes).map_err(|e| {
        PipelineError::input(format!("cache {} is not a valid catalog: {}", path.display(), e))
    })?;

    if games.is_empty() {
        return Err(PipelineError::input(format!(
            "cache {} contains no games",
            path.display()
        )));
    }

    let mut seen = HashSet::with_capacity(games.len());
    if let Some(dup) = games.iter().find(|g| !seen.insert(g.igdb_id)) {
        return Err(PipelineError::input(format!(
            "cache {} repeats igdb_id {}",
            path.display(),
            dup.igdb_id
        )));
    }

    debug!(path = %path.display(), games = games.len(), "Cache loaded");
    Ok(games)
}
