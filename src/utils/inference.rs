//! Infers a domain's dominant email pattern from observed addresses.

use crate::utils::names::PersonName;
use crate::utils::patterns::{EmailPattern, NamePart, PATTERN_CATALOG};

const SEPARATORS: [char; 3] = ['.', '_', '-'];

/// An observed local part, with the owner's name when it is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub local_part: String,
    pub name: Option<PersonName>,
}

impl Sample {
    /// Builds a sample from a local part or a full address.
    pub fn new(local_or_email: &str, name: Option<PersonName>) -> Self {
        let local = local_or_email
            .split('@')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        Self {
            local_part: local,
            name,
        }
    }

    /// Local part without a trailing disambiguation number (`john.doe2`).
    fn stem(&self) -> &str {
        self.local_part
            .trim_end_matches(|c: char| c.is_ascii_digit())
    }
}

fn segment_fits(part: NamePart, segment: &str) -> bool {
    if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }
    if part.is_initial() {
        segment.len() == 1
    } else {
        segment.len() >= 2
    }
}

/// Whether `local` has the shape of `pattern` without knowing the owner.
fn matches_structurally(pattern: &EmailPattern, local: &str) -> bool {
    let sep_count = local.chars().filter(|c| SEPARATORS.contains(c)).count();
    match (pattern.tail(), pattern.separator()) {
        (None, _) => sep_count == 0 && segment_fits(pattern.head(), local),
        (Some(tail), Some(sep)) => {
            if sep_count != 1 {
                return false;
            }
            match local.split_once(sep) {
                Some((h, t)) => segment_fits(pattern.head(), h) && segment_fits(tail, t),
                None => false,
            }
        }
        (Some(tail), None) => {
            if sep_count != 0 || !local.chars().all(|c| c.is_ascii_alphabetic()) {
                return false;
            }
            let min_len = |p: NamePart| if p.is_initial() { 1 } else { 2 };
            local.len() >= min_len(pattern.head()) + min_len(tail)
        }
    }
}

fn sample_matches(pattern: &EmailPattern, sample: &Sample) -> bool {
    let stem = sample.stem();
    if stem.is_empty() {
        return false;
    }
    match &sample.name {
        Some(name) => pattern.render(name) == stem,
        None => matches_structurally(pattern, stem),
    }
}

/// Picks the catalog shape matching the most samples.
///
/// Ties prefer shapes with a separator, then catalog order. Returns `None`
/// when no shape matches any sample.
pub fn infer_pattern(samples: &[Sample]) -> Option<EmailPattern> {
    let mut best: Option<(usize, EmailPattern)> = None;

    for pattern in PATTERN_CATALOG.iter() {
        let count = samples.iter().filter(|s| sample_matches(pattern, s)).count();
        if count == 0 {
            continue;
        }
        tracing::trace!("Pattern '{}' matches {} of {} samples", pattern, count, samples.len());

        let better = match &best {
            None => true,
            Some((best_count, best_pattern)) => {
                count > *best_count
                    || (count == *best_count
                        && pattern.has_separator()
                        && !best_pattern.has_separator())
            }
        };
        if better {
            best = Some((count, *pattern));
        }
    }

    best.map(|(_, p)| p)
}

/// Pairs each observed address with a roster name whose rendering under some
/// catalog shape reproduces it exactly.
pub fn attach_names<S: AsRef<str>>(
    addresses: impl IntoIterator<Item = S>,
    roster: &[PersonName],
) -> Vec<Sample> {
    addresses
        .into_iter()
        .map(|a| {
            let mut sample = Sample::new(a.as_ref(), None);
            let stem = sample.stem().to_string();
            sample.name = roster
                .iter()
                .find(|name| PATTERN_CATALOG.iter().any(|p| p.render(name) == stem))
                .cloned();
            sample
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(local: &str, first: &str, last: &str) -> Sample {
        Sample::new(local, PersonName::new(first, last))
    }

    fn unnamed(local: &str) -> Sample {
        Sample::new(local, None)
    }

    #[test]
    fn test_named_samples_render_exactly() {
        let samples = vec![named("jdoe", "John", "Doe"), named("aroe", "Anna", "Roe")];
        assert_eq!(infer_pattern(&samples), Some(EmailPattern::FLAST));
    }

    #[test]
    fn test_named_sample_with_numeric_suffix() {
        let samples = vec![named("john.doe2@example.com", "John", "Doe")];
        assert_eq!(infer_pattern(&samples), Some(EmailPattern::FIRST_DOT_LAST));
    }

    #[test]
    fn test_unnamed_dotted_samples() {
        let samples = vec![unnamed("john.doe"), unnamed("anna.smith")];
        assert_eq!(infer_pattern(&samples), Some(EmailPattern::FIRST_DOT_LAST));

        let samples = vec![unnamed("j.doe"), unnamed("a.smith")];
        assert_eq!(infer_pattern(&samples), Some(EmailPattern::F_DOT_LAST));

        let samples = vec![unnamed("john_doe")];
        assert_eq!(infer_pattern(&samples), Some(EmailPattern::FIRST_UNDERSCORE_LAST));
    }

    #[test]
    fn test_majority_wins() {
        let samples = vec![
            named("jdoe", "John", "Doe"),
            named("asmith", "Anna", "Smith"),
            named("mary.jones", "Mary", "Jones"),
        ];
        assert_eq!(infer_pattern(&samples), Some(EmailPattern::FLAST));
    }

    #[test]
    fn test_tie_prefers_separator_shape() {
        let samples = vec![named("jdoe", "John", "Doe"), named("mary_jones", "Mary", "Jones")];
        assert_eq!(
            infer_pattern(&samples),
            Some(EmailPattern::FIRST_UNDERSCORE_LAST)
        );
    }

    #[test]
    fn test_tie_without_separators_uses_catalog_order() {
        let samples = vec![unnamed("jdoe")];
        assert_eq!(infer_pattern(&samples), Some(EmailPattern::FLAST));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(infer_pattern(&[]), None);
        assert_eq!(infer_pattern(&[unnamed("1234"), unnamed("a.b.c")]), None);
        assert_eq!(infer_pattern(&[named("sales", "John", "Doe")]), None);
    }

    #[test]
    fn test_attach_names() {
        let roster = vec![
            PersonName::new("John", "Doe").unwrap(),
            PersonName::new("Anna", "Smith").unwrap(),
        ];
        let samples = attach_names(
            ["asmith@example.com", "info@example.com", "JDoe@example.com"],
            &roster,
        );
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].name, Some(roster[1].clone()));
        assert_eq!(samples[1].name, None);
        assert_eq!(samples[2].local_part, "jdoe");
        assert_eq!(samples[2].name, Some(roster[0].clone()));
        assert_eq!(infer_pattern(&samples), Some(EmailPattern::FLAST));
    }
}
