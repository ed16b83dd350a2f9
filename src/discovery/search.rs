//! Search-engine adapters: direct lookup of a contact's published address, and
//! address samples for a domain.

use super::http::{FetchOutcome, HttpFetcher};
use super::{AdapterOutcome, Discovery, DiscoveryAdapter, DiscoveryRequest, DiscoveryScope};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::utils::domain::email_domain_of;
use crate::utils::extract::{
    extract_emails, extract_emails_from_html, extract_result_links, filter_for_domain,
    is_social_host, page_text,
};

use async_trait::async_trait;
use std::collections::HashSet;
use url::Url;

/// A fetched result page, reduced to what the adapters read.
struct ResultPage {
    text: String,
    links: Vec<Url>,
}

enum SearchOutcome {
    Page(ResultPage),
    NotFound,
    RateLimited,
    Failed(String),
}

/// Runs queries against an HTML search endpoint and follows result links.
#[derive(Clone)]
struct SearchClient {
    fetcher: HttpFetcher,
    search_url: Url,
    max_results: usize,
}

impl SearchClient {
    fn new(fetcher: HttpFetcher, config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher,
            search_url: Url::parse(&config.search_url)?,
            max_results: config.max_search_results,
        })
    }

    async fn query(&self, query: &str) -> SearchOutcome {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().append_pair("q", query);
        tracing::debug!(target: "discovery", "Search query: {}", query);

        match self.fetcher.get(&url).await {
            FetchOutcome::Body(html) => SearchOutcome::Page(ResultPage {
                text: page_text(&html),
                links: extract_result_links(&html, &self.search_url),
            }),
            FetchOutcome::NotFound => SearchOutcome::NotFound,
            FetchOutcome::RateLimited => SearchOutcome::RateLimited,
            FetchOutcome::Failed(e) => SearchOutcome::Failed(e),
        }
    }

    /// Result links worth opening: not social networks, not seen before,
    /// capped at `max_results`.
    fn followable<'a>(
        &self,
        links: &'a [Url],
        visited: &mut HashSet<String>,
    ) -> Vec<&'a Url> {
        links
            .iter()
            .filter(|u| !u.host_str().is_some_and(is_social_host))
            .filter(|u| visited.insert(u.as_str().to_string()))
            .take(self.max_results)
            .collect()
    }
}

/// Queries used to look up one person, most specific first.
fn direct_queries(request: &DiscoveryRequest) -> Vec<String> {
    let full = request.display_name();
    let mut queries = Vec::with_capacity(4);
    if let Some(company) = request
        .company_name
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        queries.push(format!("\"{}\" \"{}\" email", full, company));
    }
    queries.push(format!("\"{}\" \"@{}\"", full, request.domain.as_str()));
    queries.push(format!("\"{}\" email", full));
    queries.push(format!(
        "\"{}\" \"{}\" site:linkedin.com/in email",
        request.first_name.trim(),
        request.last_name.trim()
    ));
    queries
}

/// First address at the contact's domain whose local part carries the last name.
fn pick_direct_match(emails: &[String], request: &DiscoveryRequest) -> Option<String> {
    emails
        .iter()
        .find(|e| {
            let domain_ok = email_domain_of(e).is_some_and(|d| request.domain.matches(&d));
            let local_ok = e
                .split('@')
                .next()
                .is_some_and(|local| local.contains(&request.name.last));
            domain_ok && local_ok
        })
        .cloned()
}

pub struct DirectMatchAdapter {
    client: SearchClient,
}

impl DirectMatchAdapter {
    pub fn new(fetcher: HttpFetcher, config: &Config) -> Result<Self> {
        Ok(Self {
            client: SearchClient::new(fetcher, config)?,
        })
    }
}

#[async_trait]
impl DiscoveryAdapter for DirectMatchAdapter {
    fn name(&self) -> &'static str {
        "direct-match"
    }

    fn scope(&self) -> DiscoveryScope {
        DiscoveryScope::Contact
    }

    async fn attempt(&self, request: &DiscoveryRequest) -> AdapterOutcome {
        let label = format!("{} @ {}", request.display_name(), request.domain);
        let mut visited = HashSet::new();
        let mut last_error: Option<String> = None;

        for (i, query) in direct_queries(request).iter().enumerate() {
            if i > 0 {
                self.client.fetcher.pause().await;
            }
            let page = match self.client.query(query).await {
                SearchOutcome::Page(page) => page,
                SearchOutcome::RateLimited => return AdapterOutcome::RateLimited,
                SearchOutcome::NotFound => continue,
                SearchOutcome::Failed(e) => {
                    last_error = Some(e);
                    continue;
                }
            };

            if let Some(found) = pick_direct_match(&extract_emails(&page.text), request) {
                tracing::info!(target: "discovery", "[{}] Direct match in result snippets: {}", label, found);
                return AdapterOutcome::Success(Discovery::DirectMatch(found));
            }

            for link in self.client.followable(&page.links, &mut visited) {
                if let FetchOutcome::Body(html) = self.client.fetcher.get(link).await {
                    if let Some(found) =
                        pick_direct_match(&extract_emails_from_html(&html), request)
                    {
                        tracing::info!(target: "discovery", "[{}] Direct match on {}: {}", label, link, found);
                        return AdapterOutcome::Success(Discovery::DirectMatch(found));
                    }
                }
            }
        }

        match last_error {
            Some(e) => AdapterOutcome::TransportError(e),
            None => AdapterOutcome::NotFound,
        }
    }
}

/// Collects addresses published anywhere at the domain via an `"@domain"` query.
pub struct SearchSampleAdapter {
    client: SearchClient,
}

impl SearchSampleAdapter {
    pub fn new(fetcher: HttpFetcher, config: &Config) -> Result<Self> {
        Ok(Self {
            client: SearchClient::new(fetcher, config)?,
        })
    }
}

#[async_trait]
impl DiscoveryAdapter for SearchSampleAdapter {
    fn name(&self) -> &'static str {
        "search-samples"
    }

    fn scope(&self) -> DiscoveryScope {
        DiscoveryScope::Domain
    }

    async fn attempt(&self, request: &DiscoveryRequest) -> AdapterOutcome {
        let domain = &request.domain;
        let query = format!("\"@{}\"", domain.as_str());
        let page = match self.client.query(&query).await {
            SearchOutcome::Page(page) => page,
            SearchOutcome::NotFound => return AdapterOutcome::NotFound,
            SearchOutcome::RateLimited => return AdapterOutcome::RateLimited,
            SearchOutcome::Failed(e) => return AdapterOutcome::TransportError(e),
        };

        let mut found = extract_emails(&page.text);
        let mut visited = HashSet::new();
        for link in self.client.followable(&page.links, &mut visited) {
            if let FetchOutcome::Body(html) = self.client.fetcher.get(link).await {
                found.extend(extract_emails_from_html(&html));
            }
        }

        let prefixes = &self.client.fetcher.config().generic_email_prefixes;
        let mut seen = HashSet::new();
        let samples: Vec<String> = filter_for_domain(found, domain, Some(prefixes))
            .into_iter()
            .filter(|e| seen.insert(e.clone()))
            .collect();

        tracing::debug!(target: "discovery", "[search-samples] {} samples for {}", samples.len(), domain);
        if samples.is_empty() {
            AdapterOutcome::NotFound
        } else {
            AdapterOutcome::Success(Discovery::Samples(samples))
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

    fn request(company: Option<&str>) -> DiscoveryRequest {
        DiscoveryRequest {
            name: PersonName::new("John", "Doe").unwrap(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            company_name: company.map(String::from),
            domain: normalize_domain("example.com", &HashMap::new()).unwrap(),
        }
    }

    fn config(server: &MockServer) -> Config {
        ConfigBuilder::new()
            .skip_default_files()
            .sleep_between_requests(0.0, 0.0)
            .max_fetch_attempts(1)
            .search_url(server.url("/html/"))
            .build()
            .unwrap()
    }

    fn redirect_link(target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("/l/?uddg={}", encoded)
    }

    #[test]
    fn test_direct_queries() {
        let queries = direct_queries(&request(Some("Example Inc")));
        assert_eq!(
            queries,
            vec![
                "\"John Doe\" \"Example Inc\" email",
                "\"John Doe\" \"@example.com\"",
                "\"John Doe\" email",
                "\"John\" \"Doe\" site:linkedin.com/in email",
            ]
        );
        assert_eq!(direct_queries(&request(None)).len(), 3);
    }

    #[test]
    fn test_pick_direct_match_requires_domain_and_last_name() {
        let emails = vec![
            "john@example.com".to_string(),
            "jdoe@other.com".to_string(),
            "j.doe@example.com".to_string(),
        ];
        assert_eq!(
            pick_direct_match(&emails, &request(None)).as_deref(),
            Some("j.doe@example.com")
        );
    }

    #[tokio::test]
    async fn test_direct_match_from_snippet() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/html/");
                then.status(200)
                    .body("<div class='result'>John Doe, buyer. Reach jdoe@example.com</div>");
            })
            .await;

        let adapter = DirectMatchAdapter::new(
            HttpFetcher::new(&config(&server)).unwrap(),
            &config(&server),
        )
        .unwrap();
        assert_eq!(
            adapter.attempt(&request(None)).await,
            AdapterOutcome::Success(Discovery::DirectMatch("jdoe@example.com".into()))
        );
    }

    #[tokio::test]
    async fn test_direct_match_from_result_page() {
        let server = MockServer::start_async().await;
        let results = format!(
            r#"<a href="{}">Team</a> <a href="https://www.linkedin.com/in/jdoe">Profile</a>"#,
            redirect_link(&server.url("/team"))
        );
        server
            .mock_async(|when, then| {
                when.method(GET).path("/html/");
                then.status(200).body(results);
            })
            .await;
        let team = server
            .mock_async(|when, then| {
                when.method(GET).path("/team");
                then.status(200)
                    .body(r#"<a href="mailto:John.Doe@example.com">John</a>"#);
            })
            .await;

        let cfg = config(&server);
        let adapter = DirectMatchAdapter::new(HttpFetcher::new(&cfg).unwrap(), &cfg).unwrap();
        assert_eq!(
            adapter.attempt(&request(None)).await,
            AdapterOutcome::Success(Discovery::DirectMatch("john.doe@example.com".into()))
        );
        team.assert_async().await;
    }

    #[tokio::test]
    async fn test_direct_match_not_found() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/html/");
                then.status(200).body("john@example.com jdoe@other.com");
            })
            .await;

        let cfg = config(&server);
        let adapter = DirectMatchAdapter::new(HttpFetcher::new(&cfg).unwrap(), &cfg).unwrap();
        assert_eq!(adapter.attempt(&request(None)).await, AdapterOutcome::NotFound);
        mock.assert_calls_async(3).await;
    }

    #[tokio::test]
    async fn test_direct_match_rate_limited_stops() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/html/");
                then.status(429);
            })
            .await;

        let cfg = config(&server);
        let adapter = DirectMatchAdapter::new(HttpFetcher::new(&cfg).unwrap(), &cfg).unwrap();
        assert_eq!(
            adapter.attempt(&request(Some("Busy Co"))).await,
            AdapterOutcome::RateLimited
        );
        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_search_samples() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/html/")
                    .query_param("q", "\"@example.com\"");
                then.status(200).body(
                    "anna.smith@example.com info@example.com bob@other.org anna.smith@example.com",
                );
            })
            .await;

        let cfg = config(&server);
        let adapter = SearchSampleAdapter::new(HttpFetcher::new(&cfg).unwrap(), &cfg).unwrap();
        assert_eq!(
            adapter.attempt(&request(None)).await,
            AdapterOutcome::Success(Discovery::Samples(vec!["anna.smith@example.com".into()]))
        );
        mock.assert_async().await;
    }
}
