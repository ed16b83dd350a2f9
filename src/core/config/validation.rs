//! Contains validation logic for the final Config struct.

use super::{Config, Result};
use crate::core::error::AppError;
use std::collections::HashMap;

/// Validates the configuration after loading and overrides.
/// Clamps or normalizes values where that is unambiguous, errors otherwise.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    if config.sleep_between_requests.0 < 0.0 || config.sleep_between_requests.1 < 0.0 {
        return Err(AppError::Config(
            "Sleep durations cannot be negative.".to_string(),
        ));
    }
    if config.sleep_between_requests.0 > config.sleep_between_requests.1 {
        tracing::warn!(
            "Min sleep ({:.2}s) > Max sleep ({:.2}s). Setting max sleep = min sleep.",
            config.sleep_between_requests.0,
            config.sleep_between_requests.1
        );
        config.sleep_between_requests.1 = config.sleep_between_requests.0;
    }
    if config.request_timeout.is_zero() {
        return Err(AppError::Config(
            "Request timeout must be at least one second.".to_string(),
        ));
    }
    if config.max_fetch_attempts == 0 {
        tracing::warn!("Max fetch attempts was set to 0. Setting to 1.");
        config.max_fetch_attempts = 1;
    }
    if config.max_search_results == 0 && config.enable_web_search {
        tracing::warn!("Max search results is 0; search adapters will only read result snippets.");
    }
    if config.enable_web_search && url::Url::parse(&config.search_url).is_err() {
        return Err(AppError::Config(format!(
            "Invalid search URL: {}",
            config.search_url
        )));
    }
    if url::Url::parse(&config.hunter_api_url).is_err() {
        return Err(AppError::Config(format!(
            "Invalid domain-search API URL: {}",
            config.hunter_api_url
        )));
    }
    if config.max_disambiguation_suffix == 0 {
        tracing::warn!("Disambiguation suffix limit is 0; any collision leaves the row unresolved.");
    }

    if let Some(ref key) = config.hunter_api_key {
        if key.trim().is_empty() {
            tracing::warn!("Domain-search API key is blank. The adapter will be disabled.");
            config.hunter_api_key = None;
        } else {
            config.hunter_api_key = Some(key.trim().to_string());
        }
    }

    let mut aliases = HashMap::with_capacity(config.domain_aliases.len());
    for (vanity, canonical) in config.domain_aliases.drain() {
        let vanity = vanity.trim().to_lowercase();
        let canonical = canonical.trim().to_lowercase();
        if vanity.is_empty() || canonical.is_empty() || !canonical.contains('.') {
            return Err(AppError::Config(format!(
                "Invalid domain alias '{}' -> '{}'",
                vanity, canonical
            )));
        }
        aliases.insert(vanity, canonical);
    }
    config.domain_aliases = aliases;

    config.common_pages_to_scrape = config
        .common_pages_to_scrape
        .iter()
        .map(|p| {
            let p = p.trim();
            if p.starts_with('/') {
                p.to_string()
            } else {
                format!("/{}", p)
            }
        })
        .collect();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_sleep_rejected() {
        let mut config = Config::default();
        config.sleep_between_requests = (-1.0, 1.0);
        assert!(validate_config(&mut config).is_err());
    }

    #[test]
    fn test_min_greater_than_max_is_clamped() {
        let mut config = Config::default();
        config.sleep_between_requests = (2.0, 1.0);
        validate_config(&mut config).unwrap();
        assert_eq!(config.sleep_between_requests, (2.0, 2.0));
    }

    #[test]
    fn test_pages_get_leading_slash() {
        let mut config = Config::default();
        config.common_pages_to_scrape = vec!["team".to_string(), "/".to_string()];
        validate_config(&mut config).unwrap();
        assert_eq!(config.common_pages_to_scrape, vec!["/team", "/"]);
    }

    #[test]
    fn test_invalid_alias_rejected() {
        let mut config = Config::default();
        config
            .domain_aliases
            .insert("vanity.io".to_string(), "nodot".to_string());
        assert!(validate_config(&mut config).is_err());
    }
}
