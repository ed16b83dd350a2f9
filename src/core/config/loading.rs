//! Handles loading configuration from files and applying it to the Config struct.

use super::{Config, ConfigFile};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Loads configuration settings from a TOML file.
pub(crate) fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!(
            "File not found or is not a file: {}",
            file_path
        ));
    }
    tracing::debug!("Attempting to read config file: {}", file_path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    let config_file_content: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::debug!("Successfully parsed configuration file: {}", file_path);
    Ok(config_file_content)
}

/// Merges the fields present in `file_config` onto `config`.
pub(crate) fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    // Network
    if let Some(timeout) = file_config.network.request_timeout {
        config.request_timeout = Duration::from_secs(timeout);
    }
    if let Some(ref user_agent) = file_config.network.user_agent {
        config.user_agent = user_agent.clone();
    }
    if let Some(min_sleep) = file_config.network.min_sleep {
        config.sleep_between_requests.0 = min_sleep;
    }
    if let Some(max_sleep) = file_config.network.max_sleep {
        config.sleep_between_requests.1 = max_sleep;
    }
    if let Some(attempts) = file_config.network.max_fetch_attempts {
        config.max_fetch_attempts = attempts;
    }

    // Search
    if let Some(enable) = file_config.search.enabled {
        config.enable_web_search = enable;
    }
    if let Some(ref url) = file_config.search.url {
        config.search_url = url.trim().to_string();
    }
    if let Some(max) = file_config.search.max_results {
        config.max_search_results = max;
    }

    // Scraping
    if let Some(enable) = file_config.scraping.enabled {
        config.enable_site_scrape = enable;
    }
    if let Some(ref pages) = file_config.scraping.common_pages {
        if !pages.is_empty() {
            config.common_pages_to_scrape = pages.clone();
        }
    }
    if let Some(ref prefixes) = file_config.scraping.generic_email_prefixes {
        config.generic_email_prefixes = prefixes.iter().map(|p| p.to_lowercase()).collect();
    }

    // Hunter
    if let Some(ref key) = file_config.hunter.api_key {
        config.hunter_api_key = Some(key.clone());
    }
    if let Some(ref url) = file_config.hunter.api_url {
        config.hunter_api_url = url.trim().to_string();
    }

    // Enrichment
    if let Some(enable) = file_config.enrichment.replace_invalid_emails {
        config.replace_invalid_emails = enable;
    }
    if let Some(max) = file_config.enrichment.max_disambiguation_suffix {
        config.max_disambiguation_suffix = max;
    }

    for (vanity, canonical) in &file_config.aliases {
        config
            .domain_aliases
            .insert(vanity.clone(), canonical.clone());
    }
}
