use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::tracker::TrackerKind;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub global: GlobalConfig,
    #[serde(default)]
    pub bibliotik: TrackerCredentials,
    #[serde(default)]
    pub myanonamouse: TrackerCredentials,
    #[serde(default)]
    pub packager: PackagerConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

impl Config {
    /// Credentials for a tracker variant.
    pub fn credentials(&self, kind: TrackerKind) -> &TrackerCredentials {
        match kind {
            TrackerKind::Bibliotik => &self.bibliotik,
            TrackerKind::MyAnonamouse => &self.myanonamouse,
        }
    }

    /// Trackers with credentials, in configured order.
    pub fn enabled_trackers(&self) -> Vec<(TrackerKind, &TrackerCredentials)> {
        let order = if self.global.tracker_order.is_empty() {
            TrackerKind::ALL.to_vec()
        } else {
            self.global.tracker_order.clone()
        };

        order
            .into_iter()
            .map(|kind| (kind, self.credentials(kind)))
            .filter(|(_, creds)| creds.is_enabled())
            .collect()
    }
}

/// Global settings: archive locations and run behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Where torrents of accepted uploads are archived.
    pub torrent_dir: PathBuf,
    /// Where book files of accepted uploads are moved.
    pub data_dir: PathBuf,
    /// Per-request HTTP timeout. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Books processed concurrently (tracker calls for one book stay sequential).
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Rename archived files from resolved metadata.
    #[serde(default)]
    pub rename_archived: bool,
    /// Recognized e-book extensions (lower-case, without dot).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Order in which trackers are tried. Empty means the built-in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracker_order: Vec<TrackerKind>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            torrent_dir: PathBuf::from("torrents"),
            data_dir: PathBuf::from("uploaded"),
            timeout_secs: None,
            jobs: default_jobs(),
            rename_archived: false,
            extensions: default_extensions(),
            tracker_order: Vec::new(),
        }
    }
}

fn default_jobs() -> usize {
    1
}

fn default_extensions() -> Vec<String> {
    ["epub", "pdf", "mobi", "azw", "azw3", "djvu", "fb2", "cbz", "cbr"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Login credentials for one tracker. Blank username or password disables it.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct TrackerCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Override for the site base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl TrackerCredentials {
    pub fn is_enabled(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.trim().is_empty()
    }
}

impl fmt::Debug for TrackerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerCredentials")
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .field("url", &self.url)
            .finish()
    }
}

/// Torrent packaging tool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackagerConfig {
    /// Program name or path of the torrent creation tool.
    #[serde(default = "default_packager_program")]
    pub program: String,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            program: default_packager_program(),
        }
    }
}

fn default_packager_program() -> String {
    "mktorrent".to_string()
}

/// Public bibliographic lookup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupConfig {
    /// Base URL of the Open Library compatible books API.
    #[serde(default = "default_lookup_url")]
    pub url: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            url: default_lookup_url(),
        }
    }
}

fn default_lookup_url() -> String {
    "https://openlibrary.org".to_string()
}
