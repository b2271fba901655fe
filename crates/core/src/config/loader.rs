use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use super::{types::Config, ConfigError};

/// Configuration written on first run. Tracker credentials are left blank so
/// every tracker starts out disabled.
pub const DEFAULT_CONFIG: &str = r#"# bookseed configuration
#
# Fill in the credentials of the trackers you want to upload to.
# A tracker with a blank username or password is skipped.

[global]
# Torrents of accepted uploads are archived here.
torrent_dir = "torrents"
# Book files of accepted uploads are moved here.
data_dir = "uploaded"
# timeout_secs = 60
# jobs = 1
# rename_archived = false
# tracker_order = ["bibliotik", "myanonamouse"]

[bibliotik]
username = ""
password = ""

[myanonamouse]
username = ""
password = ""

[packager]
program = "mktorrent"

[lookup]
url = "https://openlibrary.org"
"#;

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("BOOKSEED_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Write the default configuration to `path`, creating parent directories.
///
/// Never overwrites an existing file.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(DEFAULT_CONFIG.as_bytes())?;
    Ok(())
}
