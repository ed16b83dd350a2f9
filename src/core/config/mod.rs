//! Runtime configuration.
//!
//! A [`Config`] is only ever produced by [`ConfigBuilder`], which layers
//! defaults, an optional TOML file and programmatic overrides, then validates
//! the result.

mod builder;
mod loading;
mod validation;

pub use builder::ConfigBuilder;

use crate::core::error::Result;
use rand::Rng;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub(crate) const DEFAULT_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
pub(crate) const DEFAULT_HUNTER_API_URL: &str = "https://api.hunter.io/v2";

/// Vanity website domains whose employees use a different mail domain.
pub(crate) const DEFAULT_DOMAIN_ALIASES: &[(&str, &str)] = &[
    ("becn.com", "beaconroofingsupply.com"),
    ("bunzldistribution.com", "bunzlusa.com"),
];

const DEFAULT_GENERIC_PREFIXES: &[&str] = &[
    "info", "contact", "sales", "support", "admin", "office", "hello", "help", "hr", "jobs",
    "careers", "marketing", "media", "press", "billing", "accounts", "service", "team",
    "webmaster", "noreply", "no-reply", "privacy", "legal", "orders", "customerservice",
];

#[derive(Debug, Clone)]
pub struct Config {
    // Network
    pub request_timeout: Duration,
    pub user_agent: String,
    pub sleep_between_requests: (f32, f32),
    pub max_fetch_attempts: u32,

    // Search engine
    pub enable_web_search: bool,
    pub search_url: String,
    pub max_search_results: usize,

    // Company site scraping
    pub enable_site_scrape: bool,
    pub common_pages_to_scrape: Vec<String>,
    pub generic_email_prefixes: HashSet<String>,

    // Domain-search API
    pub hunter_api_key: Option<String>,
    pub hunter_api_url: String,

    // Enrichment
    pub domain_aliases: HashMap<String, String>,
    pub replace_invalid_emails: bool,
    pub max_disambiguation_suffix: u32,

    pub email_regex: Regex,
    pub loaded_config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(8),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sleep_between_requests: (0.5, 1.5),
            max_fetch_attempts: 2,

            enable_web_search: true,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            max_search_results: 8,

            enable_site_scrape: true,
            common_pages_to_scrape: vec![
                "/".to_string(),
                "/contact".to_string(),
                "/contact-us".to_string(),
                "/about".to_string(),
            ],
            generic_email_prefixes: DEFAULT_GENERIC_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),

            hunter_api_key: None,
            hunter_api_url: DEFAULT_HUNTER_API_URL.to_string(),

            domain_aliases: DEFAULT_DOMAIN_ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            replace_invalid_emails: true,
            max_disambiguation_suffix: 999,

            // Literal pattern, always compiles.
            email_regex: Regex::new(
                r"^[a-zA-Z0-9._%+'-]+@[a-zA-Z0-9.-]+\.(?:xn--[a-zA-Z0-9-]+|[a-zA-Z]{2,})$",
            )
            .expect("static email regex"),
            loaded_config_path: None,
        }
    }
}

impl Config {
    /// Whether a raw cell value is a syntactically valid email address.
    pub fn is_valid_email(&self, value: &str) -> bool {
        self.email_regex.is_match(value.trim())
    }

    /// True when the domain-search API adapter can run.
    pub fn domain_search_enabled(&self) -> bool {
        self.hunter_api_key.is_some()
    }
}

/// Random pause between two requests to the same source.
pub(crate) fn get_random_sleep_duration(config: &Config) -> Duration {
    let (min, max) = config.sleep_between_requests;
    if max <= 0.0 {
        return Duration::ZERO;
    }
    let secs = if max > min {
        rand::thread_rng().gen_range(min..max)
    } else {
        min
    };
    Duration::from_secs_f32(secs.max(0.0))
}

/// Shape of the optional TOML configuration file. Every field is optional; a
/// present field overrides the default.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct ConfigFile {
    pub network: NetworkSection,
    pub search: SearchSection,
    pub scraping: ScrapingSection,
    pub hunter: HunterSection,
    pub enrichment: EnrichmentSection,
    pub aliases: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkSection {
    pub request_timeout: Option<u64>,
    pub user_agent: Option<String>,
    pub min_sleep: Option<f32>,
    pub max_sleep: Option<f32>,
    pub max_fetch_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct SearchSection {
    pub enabled: Option<bool>,
    pub url: Option<String>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct ScrapingSection {
    pub enabled: Option<bool>,
    pub common_pages: Option<Vec<String>>,
    pub generic_email_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct HunterSection {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct EnrichmentSection {
    pub replace_invalid_emails: Option<bool>,
    pub max_disambiguation_suffix: Option<u32>,
}

/// Convenience for callers that just want defaults.
pub fn default_config() -> Result<Config> {
    ConfigBuilder::new().skip_default_files().build()
}
