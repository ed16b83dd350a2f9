//! The email pattern catalog and candidate generation.
//!
//! A pattern is a template over the cleaned name parts. The catalog lists the
//! shapes companies actually use, most common first; its order is the final
//! tie-break of pattern inference.

use crate::core::dedup::DedupGuard;
use crate::core::models::{EmailSource, GeneratedEmail};
use crate::utils::names::PersonName;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamePart {
    First,
    Last,
    FirstInitial,
    LastInitial,
}

impl NamePart {
    fn render(self, name: &PersonName) -> String {
        match self {
            NamePart::First => name.first.clone(),
            NamePart::Last => name.last.clone(),
            NamePart::FirstInitial => name.first_initial().to_string(),
            NamePart::LastInitial => name.last_initial().to_string(),
        }
    }

    pub fn is_initial(self) -> bool {
        matches!(self, NamePart::FirstInitial | NamePart::LastInitial)
    }

    fn token(self) -> &'static str {
        match self {
            NamePart::First => "first",
            NamePart::Last => "last",
            NamePart::FirstInitial => "f",
            NamePart::LastInitial => "l",
        }
    }

    fn is_first(self) -> bool {
        matches!(self, NamePart::First | NamePart::FirstInitial)
    }
}

/// A local-part template: `head`, then optionally `separator` and `tail`.
/// Rendered local parts are always lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmailPattern {
    head: NamePart,
    tail: Option<NamePart>,
    separator: Option<char>,
}

const fn pattern(head: NamePart, tail: Option<NamePart>, separator: Option<char>) -> EmailPattern {
    EmailPattern {
        head,
        tail,
        separator,
    }
}

impl EmailPattern {
    pub const FIRST_DOT_LAST: EmailPattern =
        pattern(NamePart::First, Some(NamePart::Last), Some('.'));
    pub const FLAST: EmailPattern = pattern(NamePart::FirstInitial, Some(NamePart::Last), None);
    pub const FIRSTLAST: EmailPattern = pattern(NamePart::First, Some(NamePart::Last), None);
    pub const F_DOT_LAST: EmailPattern =
        pattern(NamePart::FirstInitial, Some(NamePart::Last), Some('.'));
    pub const FIRST_UNDERSCORE_LAST: EmailPattern =
        pattern(NamePart::First, Some(NamePart::Last), Some('_'));
    pub const FIRST: EmailPattern = pattern(NamePart::First, None, None);
    pub const FIRSTL: EmailPattern = pattern(NamePart::First, Some(NamePart::LastInitial), None);
    pub const FIRST_DASH_LAST: EmailPattern =
        pattern(NamePart::First, Some(NamePart::Last), Some('-'));
    pub const LAST_DOT_FIRST: EmailPattern =
        pattern(NamePart::Last, Some(NamePart::First), Some('.'));
    pub const FIRST_DOT_L: EmailPattern =
        pattern(NamePart::First, Some(NamePart::LastInitial), Some('.'));
    pub const LASTFIRST: EmailPattern = pattern(NamePart::Last, Some(NamePart::First), None);
    pub const LASTF: EmailPattern = pattern(NamePart::Last, Some(NamePart::FirstInitial), None);
    pub const LAST: EmailPattern = pattern(NamePart::Last, None, None);
    pub const F_UNDERSCORE_LAST: EmailPattern =
        pattern(NamePart::FirstInitial, Some(NamePart::Last), Some('_'));
    pub const LAST_UNDERSCORE_FIRST: EmailPattern =
        pattern(NamePart::Last, Some(NamePart::First), Some('_'));

    /// Renders the local part for `name`.
    pub fn render(&self, name: &PersonName) -> String {
        let mut local = self.head.render(name);
        if let Some(tail) = self.tail {
            if let Some(sep) = self.separator {
                local.push(sep);
            }
            local.push_str(&tail.render(name));
        }
        local
    }

    /// Renders the full address for `name` at `domain`.
    pub fn render_email(&self, name: &PersonName, domain: &str) -> String {
        format!("{}@{}", self.render(name), domain.to_lowercase())
    }

    pub fn head(&self) -> NamePart {
        self.head
    }

    pub fn tail(&self) -> Option<NamePart> {
        self.tail
    }

    pub fn separator(&self) -> Option<char> {
        self.separator
    }

    pub fn has_separator(&self) -> bool {
        self.separator.is_some()
    }

    /// Position in [`PATTERN_CATALOG`]; patterns outside it sort last.
    pub fn catalog_rank(&self) -> usize {
        PATTERN_CATALOG
            .iter()
            .position(|p| p == self)
            .unwrap_or(PATTERN_CATALOG.len())
    }
}

impl fmt::Display for EmailPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.head.token())?;
        if let Some(tail) = self.tail {
            if let Some(sep) = self.separator {
                write!(f, "{}", sep)?;
            }
            f.write_str(tail.token())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternParseError(pub String);

impl fmt::Display for PatternParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized email pattern '{}'", self.0)
    }
}

impl std::error::Error for PatternParseError {}

impl FromStr for EmailPattern {
    type Err = PatternParseError;

    /// Accepts canonical names (`first.last`, `flast`) and the brace form used
    /// by domain-search APIs (`{first}.{last}`, `{f}{last}`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| *c != '{' && *c != '}')
            .collect();
        all_patterns()
            .find(|p| p.to_string() == canonical)
            .ok_or_else(|| PatternParseError(s.to_string()))
    }
}

static ALL_PARTS: [NamePart; 4] = [
    NamePart::First,
    NamePart::Last,
    NamePart::FirstInitial,
    NamePart::LastInitial,
];

/// Every expressible pattern: one part, or a first-name part and a last-name
/// part in either order with or without a separator.
fn all_patterns() -> impl Iterator<Item = EmailPattern> {
    let singles = ALL_PARTS.iter().map(|&head| pattern(head, None, None));
    let pairs = ALL_PARTS.iter().flat_map(|&head| {
        ALL_PARTS
            .iter()
            .filter(move |&&tail| tail.is_first() != head.is_first())
            .flat_map(move |&tail| {
                [None, Some('.'), Some('_'), Some('-')]
                    .into_iter()
                    .map(move |sep| pattern(head, Some(tail), sep))
            })
    });
    singles.chain(pairs)
}

/// Shapes recognised by inference, most common first.
pub const PATTERN_CATALOG: [EmailPattern; 15] = [
    EmailPattern::FIRST_DOT_LAST,
    EmailPattern::FLAST,
    EmailPattern::FIRSTLAST,
    EmailPattern::F_DOT_LAST,
    EmailPattern::FIRST_UNDERSCORE_LAST,
    EmailPattern::FIRST,
    EmailPattern::FIRSTL,
    EmailPattern::FIRST_DASH_LAST,
    EmailPattern::LAST_DOT_FIRST,
    EmailPattern::FIRST_DOT_L,
    EmailPattern::LASTFIRST,
    EmailPattern::LASTF,
    EmailPattern::LAST,
    EmailPattern::F_UNDERSCORE_LAST,
    EmailPattern::LAST_UNDERSCORE_FIRST,
];

/// Shapes tried, in order, when no company pattern could be discovered.
pub const FALLBACK_PATTERNS: [EmailPattern; 5] = [
    EmailPattern::FIRST_DOT_LAST,
    EmailPattern::FLAST,
    EmailPattern::FIRSTLAST,
    EmailPattern::FIRST,
    EmailPattern::F_DOT_LAST,
];

fn is_usable_domain(domain: &str) -> bool {
    !domain.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Produces exactly one candidate address for `name` at `domain`.
///
/// With a pattern the pattern is rendered as is. Without one, the fallback
/// shapes are walked in order and the first address not already present in
/// the input dataset is chosen. Collisions with addresses assigned earlier in
/// this run are left to [`DedupGuard::reserve`], which keeps the shape and adds
/// a numeric suffix.
pub fn generate_candidate(
    name: &PersonName,
    domain: &str,
    pattern: Option<&EmailPattern>,
    guard: &DedupGuard,
) -> Option<GeneratedEmail> {
    if !is_usable_domain(domain) {
        tracing::warn!(
            "Cannot generate candidate: Invalid domain provided '{}'",
            domain
        );
        return None;
    }

    if let Some(p) = pattern {
        let address = p.render_email(name, domain);
        tracing::debug!("Pattern '{}' rendered as {}", p, address);
        return Some(GeneratedEmail::new(address, EmailSource::PatternApplied));
    }

    let mut candidates: Vec<String> = Vec::with_capacity(FALLBACK_PATTERNS.len());
    for p in FALLBACK_PATTERNS.iter() {
        let address = p.render_email(name, domain);
        if !candidates.contains(&address) {
            candidates.push(address);
        }
    }

    let chosen = candidates
        .iter()
        .find(|c| !guard.is_preexisting(c))
        .or_else(|| candidates.first())?;

    tracing::debug!(
        "Fallback candidate for '{} {}' @ '{}': {}",
        name.first,
        name.last,
        domain,
        chosen
    );
    Some(GeneratedEmail::new(chosen.clone(), EmailSource::Fallback))
}
