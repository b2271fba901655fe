//! ISBN extraction from book file names.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Separators tolerated inside ISBNs returned by lookup services.
static ISBN_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\- ]+").unwrap());

/// A 10- or 13-character ISBN, used as the cross-tracker lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Isbn(String);

impl Isbn {
    /// Extract the first 10- or 13-digit run from a file name.
    ///
    /// A run is a maximal sequence of ASCII digits, so a 12-digit run is
    /// ignored rather than truncated.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        let mut start = None;

        for (idx, byte) in bytes.iter().enumerate().chain(std::iter::once((bytes.len(), &b' '))) {
            match (byte.is_ascii_digit(), start) {
                (true, None) => start = Some(idx),
                (false, Some(begin)) => {
                    let len = idx - begin;
                    if len == 10 || len == 13 {
                        return Some(Self(name[begin..idx].to_string()));
                    }
                    start = None;
                }
                _ => {}
            }
        }

        None
    }

    /// Extract an ISBN from the file name component of a path.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(Self::from_file_name)
    }

    /// Normalize an ISBN as returned by a lookup service.
    ///
    /// Hyphens and spaces are removed and an `x` check digit is upper-cased.
    /// Returns `None` when the result is not 10 or 13 characters long.
    pub fn normalize(raw: &str) -> Option<Self> {
        let cleaned = ISBN_SEPARATORS.replace_all(raw.trim(), "").to_uppercase();
        let valid_chars = cleaned
            .chars()
            .enumerate()
            .all(|(i, c)| c.is_ascii_digit() || (c == 'X' && i == cleaned.len() - 1));

        if valid_chars && (cleaned.len() == 10 || cleaned.len() == 13) {
            Some(Self(cleaned))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
