//! Provides the `ConfigBuilder` for fluent configuration construction.

use super::loading::{apply_file_config, load_config_file};
use super::validation::validate_config;
use super::{Config, ConfigFile, Result};
use crate::AppError;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["./email-enricher.toml", "./config.toml"];

/// Builder pattern for creating `Config` instances fluently.
///
/// Loads an optional TOML file (explicit path, or the first default location
/// that exists), applies programmatic overrides on top and validates.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    config_file_path: Option<String>,
    skip_default_files: bool,
    overrides: ConfigFile,
}

impl ConfigBuilder {
    /// Creates a new builder with default configuration values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify an optional configuration file path to load.
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    /// Do not look for `./email-enricher.toml` or `./config.toml`.
    pub fn skip_default_files(mut self) -> Self {
        self.skip_default_files = true;
        self
    }

    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.overrides.network.request_timeout = Some(duration.as_secs());
        self
    }
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.overrides.network.user_agent = Some(value.into());
        self
    }
    pub fn sleep_between_requests(mut self, min: f32, max: f32) -> Self {
        self.overrides.network.min_sleep = Some(min);
        self.overrides.network.max_sleep = Some(max);
        self
    }
    pub fn max_fetch_attempts(mut self, value: u32) -> Self {
        self.overrides.network.max_fetch_attempts = Some(value);
        self
    }
    pub fn enable_web_search(mut self, enable: bool) -> Self {
        self.overrides.search.enabled = Some(enable);
        self
    }
    pub fn search_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.search.url = Some(url.into());
        self
    }
    pub fn max_search_results(mut self, value: usize) -> Self {
        self.overrides.search.max_results = Some(value);
        self
    }
    pub fn enable_site_scrape(mut self, enable: bool) -> Self {
        self.overrides.scraping.enabled = Some(enable);
        self
    }
    pub fn common_pages_to_scrape(mut self, pages: Vec<String>) -> Self {
        self.overrides.scraping.common_pages = Some(pages);
        self
    }
    pub fn generic_email_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.overrides.scraping.generic_email_prefixes = Some(prefixes);
        self
    }
    pub fn hunter_api_key(mut self, key: Option<impl Into<String>>) -> Self {
        self.overrides.hunter.api_key = key.map(|k| k.into());
        self
    }
    pub fn hunter_api_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.hunter.api_url = Some(url.into());
        self
    }
    /// Adds (or replaces) one vanity → canonical domain alias.
    pub fn domain_alias(mut self, vanity: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.overrides
            .aliases
            .insert(vanity.into(), canonical.into());
        self
    }
    pub fn replace_invalid_emails(mut self, enable: bool) -> Self {
        self.overrides.enrichment.replace_invalid_emails = Some(enable);
        self
    }
    pub fn max_disambiguation_suffix(mut self, value: u32) -> Self {
        self.overrides.enrichment.max_disambiguation_suffix = Some(value);
        self
    }

    /// Builds the final `Config` object, applying defaults, file settings, overrides, and validation.
    pub fn build(mut self) -> Result<Config> {
        let mut loaded_path: Option<String> = None;

        if let Some(ref path) = self.config_file_path {
            match load_config_file(path) {
                Ok(file_config) => {
                    apply_file_config(&mut self.config, &file_config);
                    loaded_path = Some(path.clone());
                    tracing::info!("Loaded base configuration from specified file: {}", path);
                }
                Err(e) => {
                    tracing::error!("Failed to load specified config file '{}': {}", path, e);
                    return Err(AppError::Config(format!(
                        "Failed to load specified configuration file '{}': {}",
                        path, e
                    )));
                }
            }
        } else if !self.skip_default_files {
            tracing::debug!("No config file specified, checking default locations.");
            for path_str in DEFAULT_CONFIG_LOCATIONS {
                if !Path::new(path_str).exists() {
                    continue;
                }
                tracing::debug!("Found potential default config file: {}", path_str);
                match load_config_file(path_str) {
                    Ok(file_config) => {
                        apply_file_config(&mut self.config, &file_config);
                        loaded_path = Some(path_str.to_string());
                        tracing::info!(
                            "Loaded base configuration from default location: {}",
                            path_str
                        );
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Failed to load or parse default config '{}': {}",
                            path_str,
                            e
                        );
                    }
                }
            }
            if loaded_path.is_none() {
                tracing::debug!("No configuration file found. Using default values and overrides.");
            }
        }

        apply_file_config(&mut self.config, &self.overrides);
        self.config.loaded_config_path = loaded_path;
        validate_config(&mut self.config)?;

        tracing::debug!("Final configuration built successfully.");
        Ok(self.config)
    }
}
