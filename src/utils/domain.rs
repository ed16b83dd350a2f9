//! Utility functions for handling domain names and URLs.

use crate::core::error::{AppError, Result};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// A company domain resolved from a free-form website cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedDomain {
    /// Host of the company website, `www.` stripped. This is what gets scraped.
    pub website_host: String,
    /// Domain used for addresses: `website_host` after alias substitution.
    pub email_domain: String,
}

impl NormalizedDomain {
    pub fn as_str(&self) -> &str {
        &self.email_domain
    }

    /// True if `domain` is either the mail domain or the website host.
    pub fn matches(&self, domain: &str) -> bool {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        domain == self.email_domain || domain == self.website_host
    }

    pub fn is_aliased(&self) -> bool {
        self.website_host != self.email_domain
    }

    /// Same website, addresses generated at `email_domain` instead.
    pub fn with_email_domain(self, email_domain: impl Into<String>) -> Self {
        Self {
            website_host: self.website_host,
            email_domain: email_domain.into(),
        }
    }
}

impl fmt::Display for NormalizedDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email_domain)
    }
}

/// Normalizes a raw website/domain cell and applies the alias table.
///
/// Returns `None` for blank or unparseable input; callers treat that as
/// "no company context" and skip discovery.
pub fn normalize_domain(
    raw: &str,
    aliases: &HashMap<String, String>,
) -> Option<NormalizedDomain> {
    let host = match get_domain_from_url(raw) {
        Ok(host) => host,
        Err(e) => {
            tracing::debug!("No usable domain in '{}': {}", raw.trim(), e);
            return None;
        }
    };
    let email_domain = match aliases.get(&host) {
        Some(canonical) => {
            tracing::debug!("Domain alias applied: {} -> {}", host, canonical);
            canonical.clone()
        }
        None => host.clone(),
    };
    Some(NormalizedDomain {
        website_host: host,
        email_domain,
    })
}

/// Extracts the base domain name (e.g., "example.com") from a given URL or domain string.
///
/// Adds `https://` when the scheme is missing, parses the URL, takes the host,
/// removes a leading `www.` and lower-cases.
///
/// Returns `Err(AppError::DomainExtraction)` if the input is empty or a host cannot be parsed.
pub(crate) fn get_domain_from_url(website_url_or_domain: &str) -> Result<String> {
    let trimmed_input = website_url_or_domain.trim();
    if trimmed_input.is_empty() {
        return Err(AppError::DomainExtraction(
            "Input string is empty".to_string(),
        ));
    }

    let url_str_with_scheme = if !trimmed_input.contains("://") {
        format!("https://{}", trimmed_input)
    } else {
        trimmed_input.to_string()
    };

    let url = match Url::parse(&url_str_with_scheme) {
        Ok(parsed_url) => parsed_url,
        Err(e) => {
            if !trimmed_input.contains('/')
                && !trimmed_input.contains(char::is_whitespace)
                && trimmed_input.contains('.')
                && !trimmed_input.starts_with('.')
                && !trimmed_input.ends_with('.')
            {
                tracing::warn!(
                    "Input '{}' failed URL parsing but looks like a domain, attempting direct use.",
                    trimmed_input
                );
                let lowered = trimmed_input.to_lowercase();
                let host = lowered.strip_prefix("www.").unwrap_or(&lowered);
                return Ok(host.to_string());
            }
            return Err(AppError::UrlParse(e));
        }
    };

    let host = url.host_str().ok_or_else(|| {
        AppError::DomainExtraction(format!("Could not extract host from parsed URL: {}", url))
    })?;

    let lowered = host.to_lowercase();
    let final_domain = lowered.strip_prefix("www.").unwrap_or(&lowered).to_string();

    if !final_domain.contains('.') || final_domain.starts_with('.') || final_domain.ends_with('.') {
        return Err(AppError::DomainExtraction(format!(
            "Extracted domain appears invalid: {}",
            final_domain
        )));
    }

    Ok(final_domain)
}

/// Parses the input website string into a valid `Url` object.
///
/// Adds `https://` scheme if missing. Used as the root for scraping.
pub(crate) fn normalize_url(website_url_str: &str) -> Result<Url> {
    let trimmed_input = website_url_str.trim();
    if trimmed_input.is_empty() {
        return Err(AppError::InsufficientInput(
            "Website URL input is empty".to_string(),
        ));
    }

    let url_str_with_scheme = if !trimmed_input.contains("://") {
        format!("https://{}", trimmed_input)
    } else {
        trimmed_input.to_string()
    };

    let url = Url::parse(&url_str_with_scheme)?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(AppError::UrlParse(url::ParseError::EmptyHost)),
    }
}

/// Domain part of an email address, lower-cased.
pub(crate) fn email_domain_of(email: &str) -> Option<String> {
    let (local, domain) = email.trim().rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(domain.trim_end_matches('.').to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> HashMap<String, String> {
        HashMap::from([(
            "becn.com".to_string(),
            "beaconroofingsupply.com".to_string(),
        )])
    }

    #[test]
    fn test_get_domain_from_url_valid() {
        assert_eq!(
            get_domain_from_url("https://www.example.com").unwrap(),
            "example.com"
        );
        assert_eq!(
            get_domain_from_url("http://example.com").unwrap(),
            "example.com"
        );
        assert_eq!(get_domain_from_url("example.com").unwrap(), "example.com");
        assert_eq!(
            get_domain_from_url("WWW.Example.com").unwrap(),
            "example.com"
        );
        assert_eq!(
            get_domain_from_url("https://EXAMPLE.com/path?query=1").unwrap(),
            "example.com"
        );
        assert_eq!(
            get_domain_from_url("http://example.com:8080").unwrap(),
            "example.com"
        );
        assert_eq!(
            get_domain_from_url(" sub.domain.example.co.uk ").unwrap(),
            "sub.domain.example.co.uk"
        );
    }

    #[test]
    fn test_get_domain_from_url_invalid() {
        assert!(get_domain_from_url("").is_err());
        assert!(get_domain_from_url("   ").is_err());
        assert!(get_domain_from_url("http://").is_err());
        assert!(get_domain_from_url("www.").is_err());
        assert!(get_domain_from_url(".com").is_err());
        assert!(get_domain_from_url("example").is_err());
        assert!(get_domain_from_url("not a website").is_err());
    }

    #[test]
    fn test_normalize_domain_applies_alias() {
        let d = normalize_domain("https://www.becn.com/about", &aliases()).unwrap();
        assert_eq!(d.email_domain, "beaconroofingsupply.com");
        assert_eq!(d.website_host, "becn.com");
        assert!(d.is_aliased());
        assert!(d.matches("BECN.com"));
        assert!(d.matches("beaconroofingsupply.com"));
    }

    #[test]
    fn test_normalize_domain_without_alias() {
        let d = normalize_domain("firstsupply.com", &aliases()).unwrap();
        assert_eq!(d.as_str(), "firstsupply.com");
        assert!(!d.is_aliased());
    }

    #[test]
    fn test_normalize_domain_blank_is_none() {
        assert!(normalize_domain("", &aliases()).is_none());
        assert!(normalize_domain("   ", &aliases()).is_none());
        assert!(normalize_domain("n/a", &aliases()).is_none());
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("example.com").unwrap().as_str(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_url("http://example.com").unwrap().as_str(),
            "http://example.com/"
        );
        assert!(normalize_url("").is_err());
        assert!(normalize_url("https://").is_err());
    }

    #[test]
    fn test_email_domain_of() {
        assert_eq!(
            email_domain_of("Jane@Example.COM").as_deref(),
            Some("example.com")
        );
        assert!(email_domain_of("@example.com").is_none());
        assert!(email_domain_of("nobody").is_none());
    }
}
