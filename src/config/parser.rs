use crate::config::types::Config;
use crate::ConfigError;
use std::path::Path;
use url::Url;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Validates a parsed configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let listing = Url::parse(&config.crawl.listing_base).map_err(|e| {
        ConfigError::Validation(format!(
            "listing-base is not an absolute URL ({}): {}",
            config.crawl.listing_base, e
        ))
    })?;
    if !matches!(listing.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "listing-base must be http(s), got scheme {}",
            listing.scheme()
        )));
    }

    if config.crawl.start_page == 0 {
        return Err(ConfigError::Validation(
            "start-page must be at least 1".to_string(),
        ));
    }

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path must not be empty".to_string(),
        ));
    }

    if config.output.media_dir.is_empty() {
        return Err(ConfigError::Validation(
            "media-dir must not be empty".to_string(),
        ));
    }

    if let Some([from, _to]) = &config.crawl.media_rewrite {
        if from.is_empty() {
            return Err(ConfigError::Validation(
                "media-rewrite source must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}
