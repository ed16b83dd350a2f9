//! Company website scraping for address samples.

use super::http::{FetchOutcome, HttpFetcher};
use super::{AdapterOutcome, Discovery, DiscoveryAdapter, DiscoveryRequest, DiscoveryScope};
use crate::core::cache::PatternProvenance;
use crate::core::config::Config;
use crate::utils::domain::{email_domain_of, normalize_url, NormalizedDomain};
use crate::utils::extract::{
    dominant_mail_domain, extract_emails_from_html, filter_for_domain, is_generic_prefix,
};

use async_trait::async_trait;
use std::collections::HashSet;
use url::Url;

pub struct SiteScrapeAdapter {
    fetcher: HttpFetcher,
    pages: Vec<String>,
    base_url: Option<Url>,
}

impl SiteScrapeAdapter {
    pub fn new(fetcher: HttpFetcher, config: &Config) -> Self {
        Self {
            fetcher,
            pages: config.common_pages_to_scrape.clone(),
            base_url: None,
        }
    }

    /// Scrape a fixed base URL instead of the contact's website.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Site roots tried in order until one answers.
    fn roots(&self, domain: &NormalizedDomain) -> Vec<Url> {
        if let Some(base) = &self.base_url {
            return vec![base.clone()];
        }
        let host = &domain.website_host;
        [
            format!("https://{}", host),
            format!("https://www.{}", host),
            format!("http://{}", host),
        ]
        .iter()
        .filter_map(|raw| match normalize_url(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!(target: "discovery", "[site-scrape] Skipping root {}: {}", raw, e);
                None
            }
        })
        .collect()
    }
}

#[async_trait]
impl DiscoveryAdapter for SiteScrapeAdapter {
    fn name(&self) -> &'static str {
        "site-scrape"
    }

    fn scope(&self) -> DiscoveryScope {
        DiscoveryScope::Domain
    }

    fn provenance(&self) -> PatternProvenance {
        PatternProvenance::Scraped
    }

    async fn attempt(&self, request: &DiscoveryRequest) -> AdapterOutcome {
        let domain = &request.domain;
        let prefixes = &self.fetcher.config().generic_email_prefixes;
        let mut found: Vec<String> = Vec::new();
        let mut foreign: Vec<String> = Vec::new();
        let mut last_error: Option<String> = None;
        let mut rate_limited = false;
        let mut any_reachable = false;
        let mut first_request = true;

        for root in self.roots(domain) {
            let mut reachable = false;

            for page in &self.pages {
                let url = match root.join(page) {
                    Ok(u) => u,
                    Err(e) => {
                        tracing::debug!(target: "discovery", "[site-scrape] Bad page path '{}': {}", page, e);
                        continue;
                    }
                };
                if !first_request {
                    self.fetcher.pause().await;
                }
                first_request = false;

                match self.fetcher.get(&url).await {
                    FetchOutcome::Body(html) => {
                        reachable = true;
                        let all = extract_emails_from_html(&html);
                        let on_page = filter_for_domain(all.iter().cloned(), domain, Some(prefixes));
                        tracing::trace!(target: "discovery", "[site-scrape] {} addresses on {}", on_page.len(), url);
                        foreign.extend(all.into_iter().filter(|e| {
                            !is_generic_prefix(e, prefixes)
                                && email_domain_of(e).is_some_and(|d| !domain.matches(&d))
                        }));
                        found.extend(on_page);
                    }
                    FetchOutcome::NotFound => reachable = true,
                    FetchOutcome::RateLimited => {
                        rate_limited = true;
                        break;
                    }
                    FetchOutcome::Failed(e) => last_error = Some(e),
                }
            }

            if reachable || rate_limited {
                any_reachable |= reachable;
                break;
            }
        }

        let mut seen = HashSet::new();
        found.retain(|e| seen.insert(e.clone()));

        if !found.is_empty() {
            tracing::debug!(target: "discovery", "[site-scrape] {} samples for {}", found.len(), domain);
            return AdapterOutcome::Success(Discovery::Samples(found));
        }
        if let Some((mail_domain, samples)) = dominant_mail_domain(&foreign) {
            tracing::info!(target: "discovery",
                "[site-scrape] {} lists addresses at {} only; treating it as the mail domain",
                domain.website_host, mail_domain);
            return AdapterOutcome::Success(Discovery::MailDomain {
                domain: mail_domain,
                samples,
            });
        }
        if rate_limited {
            return AdapterOutcome::RateLimited;
        }
        match last_error {
            Some(e) if !any_reachable => AdapterOutcome::TransportError(e),
            _ => AdapterOutcome::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConfigBuilder;
    use crate::utils::domain::normalize_domain;
    use crate::utils::names::PersonName;
    use httpmock::prelude::*;
    use std::collections::HashMap;

    fn request() -> DiscoveryRequest {
        DiscoveryRequest {
            name: PersonName::new("John", "Doe").unwrap(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            company_name: None,
            domain: normalize_domain("example.com", &HashMap::new()).unwrap(),
        }
    }

    fn adapter(base: &str) -> SiteScrapeAdapter {
        let config = ConfigBuilder::new()
            .skip_default_files()
            .sleep_between_requests(0.0, 0.0)
            .max_fetch_attempts(1)
            .build()
            .unwrap();
        SiteScrapeAdapter::new(HttpFetcher::new(&config).unwrap(), &config)
            .with_base_url(Url::parse(base).unwrap())
    }

    #[test]
    fn test_default_roots() {
        let config = Config::default();
        let a = SiteScrapeAdapter::new(HttpFetcher::new(&config).unwrap(), &config);
        let roots: Vec<String> = a.roots(&request().domain).iter().map(|u| u.to_string()).collect();
        assert_eq!(
            roots,
            vec![
                "https://example.com/",
                "https://www.example.com/",
                "http://example.com/",
            ]
        );
    }

    #[tokio::test]
    async fn test_collects_domain_samples() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200)
                    .body("<footer>info@example.com</footer>");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/contact");
                then.status(200).body(
                    r#"<ul><li>jdoe@example.com</li><li><a href="mailto:asmith@example.com">Anna</a></li>
                       <li>bob@gmail.com</li></ul>"#,
                );
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/contact-us");
                then.status(404);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/about");
                then.status(500);
            })
            .await;

        let outcome = adapter(&server.base_url()).attempt(&request()).await;
        assert_eq!(
            outcome,
            AdapterOutcome::Success(Discovery::Samples(vec![
                "jdoe@example.com".into(),
                "asmith@example.com".into(),
            ]))
        );
    }

    #[tokio::test]
    async fn test_foreign_mail_domain_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body(
                    r#"<p>Reach our team: jdoe@corp-mail.com, asmith@corp-mail.com,
                       info@corp-mail.com or our agency at pr@agency.net</p>"#,
                );
            })
            .await;

        let outcome = adapter(&server.base_url()).attempt(&request()).await;
        assert_eq!(
            outcome,
            AdapterOutcome::Success(Discovery::MailDomain {
                domain: "corp-mail.com".into(),
                samples: vec!["jdoe@corp-mail.com".into(), "asmith@corp-mail.com".into()],
            })
        );
    }

    #[tokio::test]
    async fn test_single_foreign_address_ignored() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/contact");
                then.status(200).body("<p>Webmaster: jane@designstudio.io</p>");
            })
            .await;

        let outcome = adapter(&server.base_url()).attempt(&request()).await;
        assert_eq!(outcome, AdapterOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_not_found_when_site_has_no_addresses() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(404);
            })
            .await;

        let outcome = adapter(&server.base_url()).attempt(&request()).await;
        assert_eq!(outcome, AdapterOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_rate_limited_site() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(429);
            })
            .await;

        let outcome = adapter(&server.base_url()).attempt(&request()).await;
        assert_eq!(outcome, AdapterOutcome::RateLimited);
    }

    #[tokio::test]
    async fn test_unreachable_site() {
        let outcome = adapter("http://127.0.0.1:9").attempt(&request()).await;
        assert!(matches!(outcome, AdapterOutcome::TransportError(_)));
    }
}
