//! Data structures shared by the enrichment pipeline.

use serde::Serialize;
use std::fmt;

/// One contact row, as read from the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    /// Zero-based data row index in the source dataset.
    pub row: usize,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub website: Option<String>,
    pub company_name: Option<String>,
}

impl Contact {
    pub fn new(row: usize, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            row,
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company_name = Some(company.into());
        self
    }

    /// The email cell trimmed, `None` when blank.
    pub fn existing_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// How a filled address was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailSource {
    /// Found verbatim on the web for this person.
    DirectMatch,
    /// Rendered from the domain's discovered pattern.
    PatternApplied,
    /// Rendered from the fixed fallback shapes. Low confidence.
    Fallback,
}

impl EmailSource {
    pub fn is_low_confidence(self) -> bool {
        matches!(self, EmailSource::Fallback)
    }
}

impl fmt::Display for EmailSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmailSource::DirectMatch => "direct match",
            EmailSource::PatternApplied => "pattern",
            EmailSource::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedEmail {
    pub address: String,
    pub source: EmailSource,
}

impl GeneratedEmail {
    pub fn new(address: impl Into<String>, source: EmailSource) -> Self {
        Self {
            address: address.into(),
            source,
        }
    }
}

/// A single email cell written by the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub row: usize,
    pub old_value: Option<String>,
    pub new_value: String,
    pub source: EmailSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// First or last name is blank after cleaning.
    MissingName,
    /// The website cell yields no usable domain.
    NoDomain,
    /// Every numeric suffix variant of the candidate is taken.
    DisambiguationExhausted,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnresolvedReason::MissingName => "missing first or last name",
            UnresolvedReason::NoDomain => "no usable company domain",
            UnresolvedReason::DisambiguationExhausted => "no unique address variant left",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RowOutcome {
    /// The row already had a usable email.
    Unchanged,
    Filled(GeneratedEmail),
    Unresolved(UnresolvedReason),
}

/// Result of enriching a whole dataset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    /// `(row, outcome)` for every contact, in input order.
    pub outcomes: Vec<(usize, RowOutcome)>,
    pub changes: Vec<ChangeRecord>,
    pub filled: usize,
    pub low_confidence: usize,
    pub unresolved: usize,
    pub unchanged: usize,
}

impl EnrichmentReport {
    pub(crate) fn record(&mut self, row: usize, outcome: RowOutcome) {
        match &outcome {
            RowOutcome::Unchanged => self.unchanged += 1,
            RowOutcome::Filled(generated) => {
                self.filled += 1;
                if generated.source.is_low_confidence() {
                    self.low_confidence += 1;
                }
            }
            RowOutcome::Unresolved(_) => self.unresolved += 1,
        }
        self.outcomes.push((row, outcome));
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Rows whose email cell was written, ascending.
    pub fn changed_rows(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = self.changes.iter().map(|c| c.row).collect();
        rows.sort_unstable();
        rows.dedup();
        rows
    }
}
