//! External sources of email evidence.
//!
//! Every source implements [`DiscoveryAdapter`]. The orchestrator runs them in
//! the order returned by [`build_adapters`] and stops at the first usable
//! answer. Adapters never return errors: network trouble is reported through
//! [`AdapterOutcome`].

mod http;
mod hunter;
mod scrape;
mod search;

pub use http::{FetchOutcome, HttpFetcher};
pub use hunter::DomainSearchAdapter;
pub use scrape::SiteScrapeAdapter;
pub use search::{DirectMatchAdapter, SearchSampleAdapter};

use crate::core::cache::PatternProvenance;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::utils::domain::NormalizedDomain;
use crate::utils::names::PersonName;
use crate::utils::patterns::EmailPattern;

use async_trait::async_trait;
use std::fmt;

/// Whether an adapter's answer holds for a whole domain or for one contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryScope {
    Domain,
    Contact,
}

/// Evidence produced by a successful attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Pattern(EmailPattern),
    /// A published address for this exact contact.
    DirectMatch(String),
    /// Addresses observed at the domain, input for inference.
    Samples(Vec<String>),
    /// The company's own pages only list personal addresses at another
    /// domain. Addresses should be generated there.
    MailDomain { domain: String, samples: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterOutcome {
    Success(Discovery),
    NotFound,
    TransportError(String),
    RateLimited,
}

impl fmt::Display for AdapterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterOutcome::Success(Discovery::Pattern(p)) => write!(f, "pattern '{}'", p),
            AdapterOutcome::Success(Discovery::DirectMatch(e)) => write!(f, "direct match {}", e),
            AdapterOutcome::Success(Discovery::Samples(s)) => write!(f, "{} samples", s.len()),
            AdapterOutcome::Success(Discovery::MailDomain { domain, samples }) => {
                write!(f, "mail domain {} ({} samples)", domain, samples.len())
            }
            AdapterOutcome::NotFound => f.write_str("not found"),
            AdapterOutcome::TransportError(e) => write!(f, "transport error: {}", e),
            AdapterOutcome::RateLimited => f.write_str("rate limited"),
        }
    }
}

/// Everything an adapter may use to look a contact up.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub name: PersonName,
    /// Names as written in the dataset, for search queries.
    pub first_name: String,
    pub last_name: String,
    pub company_name: Option<String>,
    pub domain: NormalizedDomain,
}

impl DiscoveryRequest {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

#[async_trait]
pub trait DiscoveryAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn scope(&self) -> DiscoveryScope;

    /// Provenance recorded when this adapter's evidence yields a pattern.
    fn provenance(&self) -> PatternProvenance {
        PatternProvenance::Search
    }

    async fn attempt(&self, request: &DiscoveryRequest) -> AdapterOutcome;
}

/// The network adapters enabled by `config`, in priority order.
pub fn build_adapters(config: &Config) -> Result<Vec<Box<dyn DiscoveryAdapter>>> {
    let fetcher = HttpFetcher::new(config)?;
    let mut adapters: Vec<Box<dyn DiscoveryAdapter>> = Vec::new();

    if let Some(key) = &config.hunter_api_key {
        adapters.push(Box::new(DomainSearchAdapter::new(
            fetcher.clone(),
            &config.hunter_api_url,
            key.clone(),
        )?));
    }
    if config.enable_web_search {
        adapters.push(Box::new(DirectMatchAdapter::new(fetcher.clone(), config)?));
    }
    if config.enable_site_scrape {
        adapters.push(Box::new(SiteScrapeAdapter::new(fetcher.clone(), config)));
    }
    if config.enable_web_search {
        adapters.push(Box::new(SearchSampleAdapter::new(fetcher, config)?));
    }

    let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
    tracing::info!(target: "discovery", "Discovery adapters enabled: {:?}", names);
    Ok(adapters)
}
