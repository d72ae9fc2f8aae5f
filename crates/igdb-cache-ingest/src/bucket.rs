//! Bucket key derivation
//!
//! A game's bucket is named after the first two alphanumeric characters of
//! its normalized name:
//!
//! 1. NFKD decomposition with combining marks removed (`Ōkami` -> `okami`)
//! 2. Unicode lowercase, with final sigma `ς` folded to `σ` so keys that
//!    differ only there do not collide on case-insensitive filesystems
//! 3. A leading `the`, `a` or `an` followed by whitespace is dropped when
//!    alphanumeric content remains after it
//! 4. Everything that is not alphabetic or numeric is dropped
//! 5. The first two remaining characters form the key; names with nothing
//!    left go to [`SENTINEL_KEY`]
//!
//! ```rust
//! use igdb_cache_ingest::bucket::{bucket_key, bucket_dir};
//!
//! assert_eq!(bucket_key("The Witcher 3"), "wi");
//! assert_eq!(bucket_key("Wipeout"), "wi");
//! assert_eq!(bucket_key("Ōkami"), "ok");
//! assert_eq!(bucket_key("#!?"), "00");
//! assert_eq!(bucket_dir("00"), "0");
//! ```

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Key for names without any alphanumeric character
pub const SENTINEL_KEY: &str = "00";

/// Characters kept in a key
pub const KEY_LEN: usize = 2;

const ARTICLES: &[&str] = &["the", "a", "an"];

/// Compute the bucket key for a game name
pub fn bucket_key(name: &str) -> String {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(fold_final_sigma)
        .collect();

    let key: String = strip_article(&folded)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .take(KEY_LEN)
        .collect();

    if key.is_empty() {
        SENTINEL_KEY.to_string()
    } else {
        key
    }
}

/// Subdirectory holding the bucket file for `key`
pub fn bucket_dir(key: &str) -> String {
    key.chars().next().map(String::from).unwrap_or_else(|| "0".to_string())
}

/// Relative path of a bucket file below the output directory
pub fn bucket_file(key: &str) -> String {
    format!("games/{}/{}.json", bucket_dir(key), key)
}

fn fold_final_sigma(c: char) -> char {
    if c == 'ς' {
        'σ'
    } else {
        c
    }
}

fn strip_article(name: &str) -> &str {
    let trimmed = name.trim_start();

    for article in ARTICLES {
        let Some(rest) = trimmed.strip_prefix(article) else {
            continue;
        };
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        if rest.chars().any(char::is_alphanumeric) {
            return rest;
        }
    }

    trimmed
}
