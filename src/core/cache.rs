//! Run-scoped memory of discovered domain patterns.

use crate::utils::patterns::EmailPattern;
use std::collections::HashMap;
use std::fmt;

/// Where a cached pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternProvenance {
    /// Returned directly by the domain-search API.
    Api,
    /// Inferred from addresses on the company website.
    Scraped,
    /// Inferred from addresses found through a search engine.
    Search,
    /// Discovery ran and found nothing usable.
    NoneFound,
}

impl fmt::Display for PatternProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatternProvenance::Api => "api",
            PatternProvenance::Scraped => "scraped",
            PatternProvenance::Search => "search",
            PatternProvenance::NoneFound => "none-found",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedPattern {
    pub pattern: Option<EmailPattern>,
    pub provenance: PatternProvenance,
}

/// Domain → pattern. The first discovered pattern for a domain is kept for the
/// rest of the run.
///
/// Also remembers companies whose own pages publish addresses at a different
/// mail domain; patterns for those are stored under the mail domain.
#[derive(Debug, Default, Clone)]
pub struct PatternCache {
    entries: HashMap<String, CachedPattern>,
    mail_domains: HashMap<String, String>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, domain: &str) -> Option<&CachedPattern> {
        self.entries.get(domain)
    }

    /// The cached pattern for `domain`, if one was discovered.
    pub fn pattern(&self, domain: &str) -> Option<&EmailPattern> {
        self.entries.get(domain).and_then(|e| e.pattern.as_ref())
    }

    /// Stores `pattern` unless the domain already has one. A `NoneFound`
    /// marker is replaced. Returns whether the entry was written.
    pub fn put(
        &mut self,
        domain: &str,
        pattern: EmailPattern,
        provenance: PatternProvenance,
    ) -> bool {
        if self.pattern(domain).is_some() {
            tracing::trace!("Pattern for {} already cached; ignoring {}", domain, pattern);
            return false;
        }
        tracing::debug!("Caching pattern '{}' for {} ({})", pattern, domain, provenance);
        self.entries.insert(
            domain.to_string(),
            CachedPattern {
                pattern: Some(pattern),
                provenance,
            },
        );
        true
    }

    /// Remembers that discovery for `domain` came up empty.
    pub fn mark_none_found(&mut self, domain: &str) {
        self.entries
            .entry(domain.to_string())
            .or_insert(CachedPattern {
                pattern: None,
                provenance: PatternProvenance::NoneFound,
            });
    }

    pub fn is_none_found(&self, domain: &str) -> bool {
        matches!(
            self.entries.get(domain),
            Some(CachedPattern {
                pattern: None,
                ..
            })
        )
    }

    /// Records that addresses for `domain` live at `mail_domain`. The first
    /// mapping wins.
    pub fn set_mail_domain(&mut self, domain: &str, mail_domain: &str) {
        if domain == mail_domain {
            return;
        }
        self.mail_domains
            .entry(domain.to_string())
            .or_insert_with(|| {
                tracing::debug!("Mail domain for {} is {}", domain, mail_domain);
                mail_domain.to_string()
            });
    }

    pub fn mail_domain(&self, domain: &str) -> Option<&str> {
        self.mail_domains.get(domain).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_is_idempotent() {
        let mut cache = PatternCache::new();
        assert!(cache.put("example.com", EmailPattern::FLAST, PatternProvenance::Api));
        assert!(!cache.put(
            "example.com",
            EmailPattern::FIRST_DOT_LAST,
            PatternProvenance::Scraped
        ));
        let entry = cache.get("example.com").unwrap();
        assert_eq!(entry.pattern, Some(EmailPattern::FLAST));
        assert_eq!(entry.provenance, PatternProvenance::Api);
    }

    #[test]
    fn test_none_found_can_be_upgraded() {
        let mut cache = PatternCache::new();
        cache.mark_none_found("example.com");
        assert!(cache.is_none_found("example.com"));
        assert!(cache.pattern("example.com").is_none());
        assert!(cache.put(
            "example.com",
            EmailPattern::FIRST_DOT_LAST,
            PatternProvenance::Search
        ));
        assert!(!cache.is_none_found("example.com"));
    }

    #[test]
    fn test_mark_none_found_keeps_pattern() {
        let mut cache = PatternCache::new();
        cache.put("example.com", EmailPattern::FIRST, PatternProvenance::Scraped);
        cache.mark_none_found("example.com");
        assert_eq!(cache.pattern("example.com"), Some(&EmailPattern::FIRST));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_mail_domain_first_mapping_wins() {
        let mut cache = PatternCache::new();
        cache.set_mail_domain("example.com", "example.com");
        assert_eq!(cache.mail_domain("example.com"), None);
        cache.set_mail_domain("example.com", "corp-mail.com");
        cache.set_mail_domain("example.com", "other-mail.com");
        assert_eq!(cache.mail_domain("example.com"), Some("corp-mail.com"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unknown_domain() {
        let cache = PatternCache::new();
        assert!(cache.get("nowhere.org").is_none());
        assert!(!cache.is_none_found("nowhere.org"));
        assert!(cache.is_empty());
    }
}
