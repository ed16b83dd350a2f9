//! Pulling email addresses and result links out of fetched HTML.

use crate::utils::domain::{email_domain_of, NormalizedDomain};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[A-Za-z0-9][A-Za-z0-9._+-]*@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.(?:xn--[A-Za-z0-9-]+|[A-Za-z]{2,})",
    )
    .expect("static email regex")
});

static LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// Suffixes that look like TLDs but belong to asset names such as `logo@2x.png`.
const ASSET_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".css", ".js", ".ico",
];

/// Hosts whose pages never expose addresses and mostly sit behind logins.
const SOCIAL_HOSTS: &[&str] = &[
    "linkedin.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "youtube.com",
    "tiktok.com",
];

/// Consumer mailbox providers; never a company's mail domain.
const FREE_MAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "aol.com",
    "icloud.com",
    "me.com",
    "proton.me",
    "protonmail.com",
    "gmx.com",
    "mail.com",
];

/// Fewest personal addresses at one foreign domain before it is trusted as
/// the company's mail domain.
const MIN_MAIL_DOMAIN_SAMPLES: usize = 2;

fn push_unique(out: &mut Vec<String>, seen: &mut HashSet<String>, raw: &str) {
    let email = raw.trim_matches('.').to_lowercase();
    if ASSET_SUFFIXES.iter().any(|s| email.ends_with(s)) {
        return;
    }
    if seen.insert(email.clone()) {
        out.push(email);
    }
}

/// Email-looking substrings of plain text, lower-cased, first occurrence order.
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for m in EMAIL_RE.find_iter(text) {
        push_unique(&mut out, &mut seen, m.as_str());
    }
    out
}

/// Addresses in an HTML page: raw markup, decoded text and `mailto:` links.
pub fn extract_emails_from_html(html: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for m in EMAIL_RE.find_iter(html) {
        push_unique(&mut out, &mut seen, m.as_str());
    }

    let document = Html::parse_document(html);
    let text = document.root_element().text().collect::<Vec<_>>().join(" ");
    for m in EMAIL_RE.find_iter(&text) {
        push_unique(&mut out, &mut seen, m.as_str());
    }

    for link in document.select(&LINK_SEL) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(rest) = href.trim().strip_prefix("mailto:") else {
            continue;
        };
        let target = rest.split('?').next().unwrap_or_default();
        // Plain percent-decoding: `+` is literal in a mailto address.
        let decoded = percent_decode_str(target).decode_utf8_lossy();
        for m in EMAIL_RE.find_iter(&decoded) {
            push_unique(&mut out, &mut seen, m.as_str());
        }
    }

    out
}

/// Visible text of a page, whitespace-collapsed. Used for search snippets.
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keeps addresses at the target domain, optionally dropping role accounts.
pub fn filter_for_domain(
    emails: impl IntoIterator<Item = String>,
    domain: &NormalizedDomain,
    generic_prefixes: Option<&HashSet<String>>,
) -> Vec<String> {
    emails
        .into_iter()
        .filter(|e| email_domain_of(e).is_some_and(|d| domain.matches(&d)))
        .filter(|e| generic_prefixes.map_or(true, |p| !is_generic_prefix(e, p)))
        .collect()
}

/// True if the local part is a role account such as `info@` or `sales@`.
pub fn is_generic_prefix(email: &str, prefixes: &HashSet<String>) -> bool {
    email
        .split('@')
        .next()
        .is_some_and(|local| prefixes.contains(&local.to_lowercase()))
}

pub fn is_social_host(host: &str) -> bool {
    let host = host.to_lowercase();
    SOCIAL_HOSTS
        .iter()
        .any(|s| host == *s || host.ends_with(&format!(".{}", s)))
}

pub fn is_free_mail_domain(domain: &str) -> bool {
    FREE_MAIL_DOMAINS.contains(&domain.to_lowercase().as_str())
}

/// Finds the domain most of `emails` share, when it clearly dominates.
///
/// Free-mail and social domains are ignored. The winner needs at least
/// `MIN_MAIL_DOMAIN_SAMPLES` addresses and strictly more than any other
/// domain. Returns the domain and its addresses in input order.
pub fn dominant_mail_domain(emails: &[String]) -> Option<(String, Vec<String>)> {
    let mut by_domain: Vec<(String, Vec<String>)> = Vec::new();
    for email in emails {
        let Some(d) = email_domain_of(email) else {
            continue;
        };
        if is_free_mail_domain(&d) || is_social_host(&d) {
            continue;
        }
        match by_domain.iter_mut().find(|(known, _)| *known == d) {
            Some((_, list)) if !list.contains(email) => list.push(email.clone()),
            Some(_) => {}
            None => by_domain.push((d, vec![email.clone()])),
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    by_domain.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    let mut ranked = by_domain.into_iter();
    let (domain, samples) = ranked.next()?;
    let runner_up = ranked.next().map_or(0, |(_, l)| l.len());
    if samples.len() < MIN_MAIL_DOMAIN_SAMPLES || samples.len() == runner_up {
        return None;
    }
    Some((domain, samples))
}

/// Outbound result links from a search-engine result page.
///
/// Understands DuckDuckGo `uddg=` redirects and Google `/url?q=` redirects;
/// otherwise keeps absolute http(s) links that leave the search host.
pub fn extract_result_links(html: &str, search_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let search_host = search_url.host_str().unwrap_or_default().to_lowercase();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for a in document.select(&LINK_SEL) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = search_url.join(href.trim()) else {
            continue;
        };

        let redirect = resolved
            .query_pairs()
            .find(|(k, _)| k == "uddg" || (k == "q" && resolved.path() == "/url"))
            .and_then(|(_, v)| Url::parse(&v).ok());

        let target = match redirect {
            Some(t) => t,
            None => {
                let on_search_host = resolved
                    .host_str()
                    .is_some_and(|h| h.eq_ignore_ascii_case(&search_host));
                if on_search_host {
                    continue;
                }
                resolved
            }
        };

        if !matches!(target.scheme(), "http" | "https") {
            continue;
        }
        if seen.insert(target.as_str().to_string()) {
            links.push(target);
        }
    }
    links
}
