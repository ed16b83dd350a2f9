//! Domain-search API adapter (Hunter.io `domain-search` endpoint).

use super::http::{FetchOutcome, HttpFetcher};
use super::{AdapterOutcome, Discovery, DiscoveryAdapter, DiscoveryRequest, DiscoveryScope};
use crate::core::cache::PatternProvenance;
use crate::core::error::Result;
use crate::utils::patterns::EmailPattern;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

const SAMPLE_LIMIT: &str = "10";

#[derive(Debug, Deserialize)]
struct DomainSearchResponse {
    data: Option<DomainSearchData>,
}

#[derive(Debug, Deserialize)]
struct DomainSearchData {
    pattern: Option<String>,
    #[serde(default)]
    emails: Vec<DomainSearchEmail>,
}

#[derive(Debug, Deserialize)]
struct DomainSearchEmail {
    value: Option<String>,
}

pub struct DomainSearchAdapter {
    fetcher: HttpFetcher,
    endpoint: Url,
    api_key: String,
}

impl DomainSearchAdapter {
    pub fn new(fetcher: HttpFetcher, api_url: &str, api_key: String) -> Result<Self> {
        let endpoint = Url::parse(&format!(
            "{}/domain-search",
            api_url.trim_end_matches('/')
        ))?;
        Ok(Self {
            fetcher,
            endpoint,
            api_key,
        })
    }

    fn request_url(&self, domain: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("domain", domain)
            .append_pair("api_key", &self.api_key)
            .append_pair("limit", SAMPLE_LIMIT);
        url
    }
}

/// Turns the API payload into an outcome. The pattern wins; listed addresses
/// are the fallback.
fn interpret(body: &str, domain: &str) -> AdapterOutcome {
    let parsed: DomainSearchResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(target: "discovery", "[domain-search] Unparseable response for {}: {}", domain, e);
            return AdapterOutcome::TransportError(format!("invalid JSON: {}", e));
        }
    };
    let Some(data) = parsed.data else {
        return AdapterOutcome::NotFound;
    };

    if let Some(raw) = data.pattern.as_deref().filter(|p| !p.trim().is_empty()) {
        match raw.parse::<EmailPattern>() {
            Ok(pattern) => return AdapterOutcome::Success(Discovery::Pattern(pattern)),
            Err(e) => {
                tracing::debug!(target: "discovery", "[domain-search] {} for {}", e, domain);
            }
        }
    }

    let samples: Vec<String> = data
        .emails
        .into_iter()
        .filter_map(|e| e.value)
        .map(|v| v.trim().to_lowercase())
        .filter(|v| v.contains('@'))
        .collect();
    if samples.is_empty() {
        AdapterOutcome::NotFound
    } else {
        AdapterOutcome::Success(Discovery::Samples(samples))
    }
}

#[async_trait]
impl DiscoveryAdapter for DomainSearchAdapter {
    fn name(&self) -> &'static str {
        "domain-search"
    }

    fn scope(&self) -> DiscoveryScope {
        DiscoveryScope::Domain
    }

    fn provenance(&self) -> PatternProvenance {
        PatternProvenance::Api
    }

    async fn attempt(&self, request: &DiscoveryRequest) -> AdapterOutcome {
        let domain = request.domain.as_str();
        tracing::debug!(target: "discovery", "[domain-search] Querying {}", domain);

        match self.fetcher.get(&self.request_url(domain)).await {
            FetchOutcome::Body(body) => interpret(&body, domain),
            FetchOutcome::NotFound => AdapterOutcome::NotFound,
            FetchOutcome::RateLimited => AdapterOutcome::RateLimited,
            FetchOutcome::Failed(e) => AdapterOutcome::TransportError(e),
        }
    }
}
