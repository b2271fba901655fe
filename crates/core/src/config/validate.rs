use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Archive directories are set and distinct
/// - jobs is at least 1
/// - Extensions are non-empty
/// - tracker_order has no repeats
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let global = &config.global;

    if global.torrent_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "global.torrent_dir cannot be empty".to_string(),
        ));
    }

    if global.data_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "global.data_dir cannot be empty".to_string(),
        ));
    }

    if global.torrent_dir == global.data_dir {
        return Err(ConfigError::ValidationError(
            "global.torrent_dir and global.data_dir must differ".to_string(),
        ));
    }

    if global.jobs == 0 {
        return Err(ConfigError::ValidationError(
            "global.jobs cannot be 0".to_string(),
        ));
    }

    if global.extensions.is_empty() {
        return Err(ConfigError::ValidationError(
            "global.extensions cannot be empty".to_string(),
        ));
    }

    for (i, kind) in global.tracker_order.iter().enumerate() {
        if global.tracker_order[..i].contains(kind) {
            return Err(ConfigError::ValidationError(format!(
                "global.tracker_order lists {} more than once",
                kind
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use std::path::PathBuf;

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[global]
torrent_dir = "torrents"
data_dir = "uploaded"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_empty_data_dir_fails() {
        let mut config = valid_config();
        config.global.data_dir = PathBuf::new();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_same_dirs_fails() {
        let mut config = valid_config();
        config.global.torrent_dir = config.global.data_dir.clone();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_jobs_fails() {
        let mut config = valid_config();
        config.global.jobs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_duplicate_tracker_order_fails() {
        let config = load_config_from_str(
            r#"
[global]
torrent_dir = "torrents"
data_dir = "uploaded"
tracker_order = ["bibliotik", "bibliotik"]
"#,
        )
        .unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("bibliotik"));
    }
}
