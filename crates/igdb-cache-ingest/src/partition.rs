//! Partition stage: split the cache into bucket files plus `index.json`
//!
//! The new tree is written into a staging directory next to `games/` and
//! swapped in with two renames, so readers see either the previous tree or
//! the new one. The index is prepared before the swap and renamed into place
//! right after it.

use crate::bucket::{bucket_dir, bucket_file, bucket_key};
use crate::cache::{load_cache, write_records};
use crate::config::PartitionConfig;
use crate::index::{BucketEntry, CatalogIndex};
use chrono::{DateTime, Utc};
use igdb_cache_common::checksum::sha256_hex;
use igdb_cache_common::{GameRecord, PipelineError, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const GAMES_DIR: &str = "games";
pub const INDEX_FILE: &str = "index.json";

const STAGING_PREFIX: &str = ".games.staging-";
const OLD_PREFIX: &str = ".games.old-";
const INDEX_TMP_PREFIX: &str = ".index.json.";

/// Games grouped by bucket key, each bucket ordered by `igdb_id`
#[derive(Debug, Default)]
pub struct BucketPlan {
    buckets: BTreeMap<String, Vec<GameRecord>>,
}

impl BucketPlan {
    pub fn from_games(games: Vec<GameRecord>) -> Self {
        let mut buckets: BTreeMap<String, Vec<GameRecord>> = BTreeMap::new();

        for game in games {
            buckets.entry(bucket_key(&game.name)).or_default().push(game);
        }
        for games in buckets.values_mut() {
            games.sort_by_key(|g| g.igdb_id);
        }

        Self { buckets }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn total_games(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn get(&self, key: &str) -> Option<&[GameRecord]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[GameRecord])> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Outcome of a successful partition run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSummary {
    pub total_games: usize,
    pub bucket_count: usize,
    pub subdir_count: usize,
    pub index_path: PathBuf,
}

/// Partition the cache, stamping the index with the cache's modification time
pub fn run(config: &PartitionConfig) -> Result<PartitionSummary> {
    let generated_at = std::fs::metadata(&config.cache_path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    partition(config, generated_at)
}

/// Partition the cache with an explicit index timestamp
pub fn partition(config: &PartitionConfig, generated_at: DateTime<Utc>) -> Result<PartitionSummary> {
    let games = load_cache(&config.cache_path)?;
    info!(cache = %config.cache_path.display(), games = games.len(), "Partitioning catalog");

    let plan = BucketPlan::from_games(games);
    write_output(&config.output_dir, &plan, generated_at)
}

/// Write `plan` below `output_dir` and replace the previous tree and index
pub fn write_output(
    output_dir: &Path,
    plan: &BucketPlan,
    generated_at: DateTime<Utc>,
) -> Result<PartitionSummary> {
    std::fs::create_dir_all(output_dir).map_err(|e| {
        PipelineError::partition(format!("cannot create {}: {}", output_dir.display(), e))
    })?;
    remove_leftovers(output_dir)?;

    let staging = output_dir.join(format!("{}{}", STAGING_PREFIX, Uuid::new_v4().simple()));
    let entries = match write_buckets(&staging, plan) {
        Ok(entries) => entries,
        Err(e) => {
            discard(&staging);
            return Err(e);
        },
    };

    let index = CatalogIndex::new(generated_at, entries);
    let index_tmp = match prepare_index(output_dir, &index) {
        Ok(tmp) => tmp,
        Err(e) => {
            discard(&staging);
            return Err(e);
        },
    };

    swap_into_place(output_dir, &staging)?;

    let index_path = output_dir.join(INDEX_FILE);
    index_tmp.persist(&index_path).map_err(|e| {
        PipelineError::partition(format!(
            "bucket tree replaced but {} could not be written: {}",
            index_path.display(),
            e.error
        ))
    })?;

    info!(
        games = index.total_games,
        buckets = index.bucket_count,
        subdirs = index.subdir_count,
        index = %index_path.display(),
        "Partition complete"
    );

    Ok(PartitionSummary {
        total_games: index.total_games,
        bucket_count: index.bucket_count,
        subdir_count: index.subdir_count,
        index_path,
    })
}

fn write_buckets(staging: &Path, plan: &BucketPlan) -> Result<Vec<BucketEntry>> {
    let mut entries = Vec::with_capacity(plan.bucket_count());

    for (key, games) in plan.iter() {
        let dir = staging.join(bucket_dir(key));
        std::fs::create_dir_all(&dir)
            .map_err(|e| PipelineError::partition(format!("cannot create {}: {}", dir.display(), e)))?;

        let mut bytes = Vec::new();
        write_records(&mut bytes, games)
            .map_err(|e| PipelineError::partition(format!("cannot encode bucket {}: {}", key, e)))?;

        let path = dir.join(format!("{}.json", key));
        std::fs::write(&path, &bytes)
            .map_err(|e| PipelineError::partition(format!("cannot write {}: {}", path.display(), e)))?;

        debug!(bucket = key, games = games.len(), "Wrote bucket");

        entries.push(BucketEntry {
            key: key.to_string(),
            file: bucket_file(key),
            count: games.len(),
            size: bytes.len() as u64,
            sha256: sha256_hex(&bytes),
        });
    }

    Ok(entries)
}

fn prepare_index(output_dir: &Path, index: &CatalogIndex) -> Result<NamedTempFile> {
    let bytes = index.to_json()?;
    let fail = |e: std::io::Error| PipelineError::partition(format!("cannot write index: {}", e));

    let mut tmp = tempfile::Builder::new()
        .prefix(INDEX_TMP_PREFIX)
        .tempfile_in(output_dir)
        .map_err(fail)?;
    tmp.write_all(&bytes).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    Ok(tmp)
}

/// Replace `output_dir/games` with `staging`.
///
/// The live tree is renamed aside first; if the second rename fails it is
/// moved back. The staging directory is consumed either way.
pub(crate) fn swap_into_place(output_dir: &Path, staging: &Path) -> Result<()> {
    let live = output_dir.join(GAMES_DIR);
    let old = output_dir.join(format!("{}{}", OLD_PREFIX, Uuid::new_v4().simple()));
    let had_live = live.exists();

    if had_live {
        if let Err(e) = std::fs::rename(&live, &old) {
            discard(staging);
            return Err(PipelineError::partition(format!(
                "cannot move {} aside: {}",
                live.display(),
                e
            )));
        }
    }

    if let Err(e) = std::fs::rename(staging, &live) {
        if had_live {
            if let Err(restore) = std::fs::rename(&old, &live) {
                error!(
                    old = %old.display(),
                    error = %restore,
                    "Could not restore previous bucket tree"
                );
            }
        }
        discard(staging);
        return Err(PipelineError::partition(format!(
            "cannot move new tree into {}: {}",
            live.display(),
            e
        )));
    }

    if had_live {
        if let Err(e) = std::fs::remove_dir_all(&old) {
            warn!(path = %old.display(), error = %e, "Could not remove previous bucket tree");
        }
    }

    Ok(())
}

/// Clean up after interrupted runs.
///
/// A run killed between the two renames of [`swap_into_place`] leaves no
/// `games/` and the previous tree under an old prefix; that tree is moved
/// back first. Remaining staging trees, old trees and index temp files are
/// then removed.
fn remove_leftovers(output_dir: &Path) -> Result<()> {
    let list = || {
        std::fs::read_dir(output_dir).map_err(|e| {
            PipelineError::partition(format!("cannot list {}: {}", output_dir.display(), e))
        })
    };

    let live = output_dir.join(GAMES_DIR);
    if !live.exists() {
        let orphan = list()?
            .flatten()
            .find(|entry| entry.file_name().to_string_lossy().starts_with(OLD_PREFIX));

        if let Some(entry) = orphan {
            let path = entry.path();
            warn!(path = %path.display(), "Restoring previous bucket tree from an interrupted run");
            std::fs::rename(&path, &live).map_err(|e| {
                PipelineError::partition(format!(
                    "cannot restore {} to {}: {}",
                    path.display(),
                    live.display(),
                    e
                ))
            })?;
        }
    }

    for entry in list()?.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let path = entry.path();

        let removed = if name.starts_with(STAGING_PREFIX) || name.starts_with(OLD_PREFIX) {
            std::fs::remove_dir_all(&path)
        } else if name.starts_with(INDEX_TMP_PREFIX) {
            std::fs::remove_file(&path)
        } else {
            continue;
        };

        warn!(path = %path.display(), "Removing leftover from an interrupted run");
        removed.map_err(|e| {
            PipelineError::partition(format!("cannot remove {}: {}", path.display(), e))
        })?;
    }

    Ok(())
}

fn discard(dir: &Path) {
    if dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(dir) {
            warn!(path = %dir.display(), error = %e, "Could not remove staging directory");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plan_groups_and_orders() {
        let plan = BucketPlan::from_games(vec![
            GameRecord::new(9, "Wipeout"),
            GameRecord::new(1, "The Witcher 3"),
            GameRecord::new(5, "!!!"),
            GameRecord::new(3, "Doom"),
        ]);

        assert_eq!(plan.bucket_count(), 3);
        assert_eq!(plan.total_games(), 4);

        let ids: Vec<_> = plan.get("wi").unwrap().iter().map(|g| g.igdb_id).collect();
        assert_eq!(ids, vec![1, 9]);
        assert_eq!(plan.get("00").unwrap()[0].igdb_id, 5);

        let keys: Vec<_> = plan.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["00", "do", "wi"]);
    }

    #[test]
    fn test_swap_restores_previous_tree_on_failure() {
        let dir = TempDir::new().unwrap();
        let live = dir.path().join(GAMES_DIR);
        std::fs::create_dir_all(live.join("w")).unwrap();
        std::fs::write(live.join("w").join("wi.json"), "[]").unwrap();

        let missing = dir.path().join(".games.staging-missing");
        let err = swap_into_place(dir.path(), &missing).unwrap_err();

        assert_eq!(err.kind(), "PartitionError");
        assert_eq!(std::fs::read_to_string(live.join("w").join("wi.json")).unwrap(), "[]");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![GAMES_DIR]);
    }

    #[test]
    fn test_swap_without_previous_tree() {
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join(".games.staging-new");
        std::fs::create_dir_all(staging.join("d")).unwrap();

        swap_into_place(dir.path(), &staging).unwrap();

        assert!(dir.path().join(GAMES_DIR).join("d").is_dir());
        assert!(!staging.exists());
    }

    #[test]
    fn test_leftovers_are_removed() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".games.staging-abc").join("w")).unwrap();
        std::fs::create_dir_all(dir.path().join(".games.old-def")).unwrap();
        std::fs::create_dir_all(dir.path().join("keep")).unwrap();

        remove_leftovers(dir.path()).unwrap();

        assert!(!dir.path().join(".games.staging-abc").exists());
        assert!(!dir.path().join(".games.old-def").exists());
        assert!(dir.path().join("keep").exists());
    }

    #[test]
    fn test_orphaned_old_tree_is_restored() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join(".games.old-abc").join("w");
        std::fs::create_dir_all(&old).unwrap();
        std::fs::write(old.join("wi.json"), "[]").unwrap();
        std::fs::create_dir_all(dir.path().join(".games.staging-def")).unwrap();

        remove_leftovers(dir.path()).unwrap();

        let restored = dir.path().join(GAMES_DIR).join("w").join("wi.json");
        assert_eq!(std::fs::read_to_string(restored).unwrap(), "[]");
        assert!(!dir.path().join(".games.old-abc").exists());
        assert!(!dir.path().join(".games.staging-def").exists());
    }

    #[test]
    fn test_old_tree_is_dropped_when_live_tree_exists() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(GAMES_DIR).join("d")).unwrap();
        std::fs::create_dir_all(dir.path().join(".games.old-abc").join("w")).unwrap();

        remove_leftovers(dir.path()).unwrap();

        assert!(dir.path().join(GAMES_DIR).join("d").is_dir());
        assert!(!dir.path().join(GAMES_DIR).join("w").exists());
        assert!(!dir.path().join(".games.old-abc").exists());
    }

    #[test]
    fn test_stray_index_temp_file_is_removed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".index.json.Xy12ab"), "{").unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "{}").unwrap();

        remove_leftovers(dir.path()).unwrap();

        assert!(!dir.path().join(".index.json.Xy12ab").exists());
        assert!(dir.path().join(INDEX_FILE).exists());
    }

    #[test]
    fn test_index_temp_file_uses_sweepable_prefix() {
        let dir = TempDir::new().unwrap();
        let index = CatalogIndex::new(Utc::now(), Vec::new());

        let tmp = prepare_index(dir.path(), &index).unwrap();

        let name = tmp.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(INDEX_TMP_PREFIX), "{}", name);
    }
}
