//! End-to-end tests for the partition stage

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{TimeZone, Utc};
use igdb_cache_common::checksum::file_sha256;
use igdb_cache_common::GameRecord;
use igdb_cache_ingest::bucket::bucket_key;
use igdb_cache_ingest::cache::write_cache;
use igdb_cache_ingest::config::PartitionConfig;
use igdb_cache_ingest::index::CatalogIndex;
use igdb_cache_ingest::partition::{self, GAMES_DIR, INDEX_FILE};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    config: PartitionConfig,
}

impl Workspace {
    fn new(games: &[GameRecord]) -> Self {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("all_games.json");
        write_cache(&cache, games).unwrap();

        let config = PartitionConfig::new(cache, dir.path().join("site"));
        Self { _dir: dir, config }
    }

    fn out(&self) -> &Path {
        &self.config.output_dir
    }

    fn index(&self) -> CatalogIndex {
        let bytes = std::fs::read(self.out().join(INDEX_FILE)).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn bucket(&self, file: &str) -> Vec<GameRecord> {
        let bytes = std::fs::read(self.out().join(file)).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Every file below the output directory with its contents
    fn snapshot(&self) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files = Vec::new();
        collect(self.out(), self.out(), &mut files);
        files.sort();
        files
    }
}

fn collect(root: &Path, dir: &Path, files: &mut Vec<(PathBuf, Vec<u8>)>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let rel = path.strip_prefix(root).unwrap().to_path_buf();
            files.push((rel, std::fs::read(&path).unwrap()));
        }
    }
}

fn catalog() -> Vec<GameRecord> {
    vec![
        GameRecord::new(1, "The Witcher 3"),
        GameRecord::new(2, "Wipeout"),
        GameRecord::new(3, "Doom"),
        GameRecord::new(4, "Ōkami"),
        GameRecord::new(5, "???"),
        GameRecord::new(6, ""),
        GameRecord::new(7, "007: Nightfire"),
        GameRecord::new(8, "A Plague Tale"),
    ]
}

#[test]
fn test_two_games_share_one_bucket() {
    let ws = Workspace::new(&[GameRecord::new(1, "The Witcher 3"), GameRecord::new(2, "Wipeout")]);

    let summary = partition::run(&ws.config).unwrap();

    assert_eq!(summary.total_games, 2);
    assert_eq!(summary.bucket_count, 1);

    let index = ws.index();
    assert_eq!(index.total_games, 2);
    assert_eq!(index.bucket_count, 1);
    assert_eq!(index.subdir_count, 1);
    assert_eq!(index.buckets[0].key, "wi");
    assert_eq!(index.buckets[0].file, "games/w/wi.json");

    let ids: Vec<_> = ws.bucket("games/w/wi.json").iter().map(|g| g.igdb_id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_index_matches_files_on_disk() {
    let ws = Workspace::new(&catalog());
    partition::run(&ws.config).unwrap();

    let index = ws.index();
    assert_eq!(index.version, "1.0.0");
    assert_eq!(index.structure, "games/{first_char}/{bucket}.json");

    let keys: Vec<_> = index.buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["00", "do", "ok", "pl", "wi"]);

    for entry in &index.buckets {
        let path = ws.out().join(&entry.file);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), entry.size);
        assert_eq!(file_sha256(&path).unwrap(), entry.sha256);
        assert_eq!(ws.bucket(&entry.file).len(), entry.count);
    }

    // Nameless games and digit-led names share the 00 bucket
    let zero: Vec<_> = ws.bucket("games/0/00.json").iter().map(|g| g.igdb_id).collect();
    assert_eq!(zero, vec![5, 6, 7]);
}

#[test]
fn test_every_game_lands_exactly_once() {
    let games = catalog();
    let ws = Workspace::new(&games);
    partition::run(&ws.config).unwrap();

    let index = ws.index();
    let counted: usize = index.buckets.iter().map(|b| b.count).sum();
    assert_eq!(counted, index.total_games);
    assert_eq!(index.total_games, games.len());

    let mut seen = Vec::new();
    for entry in &index.buckets {
        for game in ws.bucket(&entry.file) {
            assert_eq!(bucket_key(&game.name), entry.key);
            seen.push(game);
        }
    }
    seen.sort_by_key(|g| g.igdb_id);
    assert_eq!(seen, games);
}

#[test]
fn test_rerun_is_byte_identical() {
    let ws = Workspace::new(&catalog());

    partition::run(&ws.config).unwrap();
    let first = ws.snapshot();
    partition::run(&ws.config).unwrap();
    let second = ws.snapshot();

    assert_eq!(first, second);
}

#[test]
fn test_generated_at_is_caller_supplied() {
    let ws = Workspace::new(&catalog());
    let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();

    partition::partition(&ws.config, at).unwrap();

    assert_eq!(ws.index().generated_at, "2025-01-02T03:04:05Z");
}

#[test]
fn test_stale_buckets_are_removed() {
    let ws = Workspace::new(&catalog());
    partition::run(&ws.config).unwrap();
    assert!(ws.out().join("games/d/do.json").exists());

    write_cache(&ws.config.cache_path, &[GameRecord::new(2, "Wipeout")]).unwrap();
    partition::run(&ws.config).unwrap();

    assert!(!ws.out().join("games/d/do.json").exists());
    assert!(!ws.out().join("games/d").exists());
    assert_eq!(ws.index().bucket_count, 1);

    let top: BTreeSet<_> = std::fs::read_dir(ws.out())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(top, BTreeSet::from([GAMES_DIR.to_string(), INDEX_FILE.to_string()]));
}

#[test]
fn test_bad_cache_leaves_previous_output_intact() {
    let ws = Workspace::new(&catalog());
    partition::run(&ws.config).unwrap();
    let before = ws.snapshot();

    std::fs::write(&ws.config.cache_path, "[{\"igdb_id\": 1, \"name\": ").unwrap();
    let err = partition::run(&ws.config).unwrap_err();

    assert_eq!(err.kind(), "InputError");
    assert!(err.summary().starts_with("InputError: "));
    assert_eq!(ws.snapshot(), before);
}

#[test]
fn test_missing_cache_is_input_error() {
    let dir = TempDir::new().unwrap();
    let config = PartitionConfig::new(dir.path().join("missing.json"), dir.path().join("site"));

    let err = partition::run(&config).unwrap_err();

    assert_eq!(err.kind(), "InputError");
    assert!(!dir.path().join("site").exists());
}

#[test]
fn test_leftovers_from_interrupted_run_are_cleaned() {
    let ws = Workspace::new(&catalog());
    let stale = ws.out().join(".games.staging-deadbeef").join("x");
    std::fs::create_dir_all(&stale).unwrap();
    std::fs::write(stale.join("xx.json"), "[]").unwrap();

    partition::run(&ws.config).unwrap();

    assert!(!ws.out().join(".games.staging-deadbeef").exists());
    assert!(ws.out().join(GAMES_DIR).is_dir());
}

#[test]
fn test_output_path_occupied_by_file_is_partition_error() {
    let dir = TempDir::new().unwrap();
    let cache = dir.path().join("all_games.json");
    write_cache(&cache, &catalog()).unwrap();
    let blocked = dir.path().join("site");
    std::fs::write(&blocked, "not a directory").unwrap();

    let err = partition::run(&PartitionConfig::new(cache, &blocked)).unwrap_err();

    assert_eq!(err.kind(), "PartitionError");
    assert_eq!(std::fs::read_to_string(&blocked).unwrap(), "not a directory");
}

fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        "\\PC{0,24}",
        "[A-Za-z0-9 :'!.-]{0,24}",
        "(The|A|An) [A-Za-zÀ-ÿ0-9]{1,12}",
        "[ !?#.]{0,6}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_buckets_partition_the_catalog(names in prop::collection::vec(arb_name(), 1..40)) {
        let games: Vec<GameRecord> = names
            .iter()
            .enumerate()
            .map(|(i, name)| GameRecord::new(i as i64 + 1, name.clone()))
            .collect();
        let ws = Workspace::new(&games);
        partition::run(&ws.config).unwrap();

        let index = ws.index();
        prop_assert_eq!(index.total_games, games.len());

        let mut seen = Vec::new();
        for entry in &index.buckets {
            let bucket = ws.bucket(&entry.file);
            prop_assert_eq!(bucket.len(), entry.count);
            prop_assert!(bucket.windows(2).all(|w| w[0].igdb_id < w[1].igdb_id));
            for game in bucket {
                prop_assert_eq!(bucket_key(&game.name), entry.key.clone());
                seen.push(game.igdb_id);
            }
        }
        seen.sort_unstable();
        prop_assert_eq!(seen, (1..=games.len() as i64).collect::<Vec<_>>());
    }
}
