//! Package identity extraction from cached download filenames.
//!
//! Homebrew stores downloads in two shapes:
//!
//! - `downloads/<sha256>--<name>--<version>.<tag>.bottle.tar.gz` (cache key first)
//! - `<name>--<version>.<tag>.bottle.tar.gz` (the symlinks beside `downloads/`)
//!
//! Name-first files resolve to everything before the first `--`. After a cache
//! key the name stops at the first `.` and, if an inner `--` remains, at that
//! delimiter: `<sha256>--python@3.12--3.12.1.bottle.tar.gz` gives `python@3`
//! and `<sha256>--Firefox 120.0.dmg` gives `Firefox 120`.

use std::fmt;

const DELIMITER: &str = "--";

/// Cache keys are hex digests; shorter hex runs are treated as package names
const MIN_CACHE_KEY_LEN: usize = 32;

/// Why a filename could not be turned into a package name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    /// No `--` delimiter in the filename
    NoDelimiter,
    /// No `.` after the first `--`
    NoExtension,
    /// The delimiters leave nothing to use as a name
    EmptyName,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::NoDelimiter => write!(f, "no '--' delimiter"),
            ParseFailure::NoExtension => write!(f, "no '.' after the '--' delimiter"),
            ParseFailure::EmptyName => write!(f, "empty package name"),
        }
    }
}

impl std::error::Error for ParseFailure {}

/// Extract a best-effort package name from a cached download filename
pub fn parse_artifact_name(filename: &str) -> Result<String, ParseFailure> {
    let delimiter = filename.find(DELIMITER).ok_or(ParseFailure::NoDelimiter)?;
    let after_delimiter = &filename[delimiter + DELIMITER.len()..];

    // Nothing to extract unless an extension follows the first delimiter
    if !after_delimiter.contains('.') {
        return Err(ParseFailure::NoExtension);
    }

    let name = if is_cache_key(&filename[..delimiter]) {
        let candidate = after_delimiter
            .split_once('.')
            .map_or(after_delimiter, |(stem, _)| stem);

        // Compound names keep only what precedes the next delimiter
        match candidate.split_once(DELIMITER) {
            Some((head, _)) if !head.is_empty() => head,
            _ => candidate,
        }
    } else {
        &filename[..delimiter]
    };

    if name.is_empty() {
        return Err(ParseFailure::EmptyName);
    }

    Ok(name.to_string())
}

fn is_cache_key(segment: &str) -> bool {
    segment.len() >= MIN_CACHE_KEY_LEN && segment.chars().all(|c| c.is_ascii_hexdigit())
}

/// Keep only alphabetic characters, lowercased, for fuzzy matching
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}
