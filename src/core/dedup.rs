//! Dataset-wide uniqueness of assigned email addresses.

use std::collections::HashSet;

/// Tracks every address present in the output, case-insensitively.
///
/// Addresses that came with the input are remembered separately so the
/// candidate generator can steer around them.
#[derive(Debug, Clone, Default)]
pub struct DedupGuard {
    preexisting: HashSet<String>,
    assigned: HashSet<String>,
    max_suffix: u32,
}

fn key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl DedupGuard {
    pub fn new(max_suffix: u32) -> Self {
        Self {
            preexisting: HashSet::new(),
            assigned: HashSet::new(),
            max_suffix,
        }
    }

    /// Guard pre-loaded with the addresses already in the input dataset.
    pub fn seeded<'a>(max_suffix: u32, existing: impl IntoIterator<Item = &'a str>) -> Self {
        let mut guard = Self::new(max_suffix);
        for email in existing {
            guard.add_existing(email);
        }
        guard
    }

    /// Records an address that is already in the dataset. Returns `false` if
    /// it was seen before (a duplicate in the input).
    pub fn add_existing(&mut self, email: &str) -> bool {
        let k = key(email);
        if k.is_empty() {
            return true;
        }
        self.preexisting.insert(k)
    }

    pub fn is_preexisting(&self, email: &str) -> bool {
        self.preexisting.contains(&key(email))
    }

    pub fn is_taken(&self, email: &str) -> bool {
        let k = key(email);
        self.preexisting.contains(&k) || self.assigned.contains(&k)
    }

    /// Claims `candidate`, or the first free `local{n}@domain` variant.
    ///
    /// Returns the claimed lower-cased address, or `None` if every suffix up to
    /// the configured limit is taken (or the candidate has no `@`).
    pub fn reserve(&mut self, candidate: &str) -> Option<String> {
        let candidate = key(candidate);
        if !self.is_taken(&candidate) {
            self.assigned.insert(candidate.clone());
            return Some(candidate);
        }

        let (local, domain) = candidate.rsplit_once('@')?;
        for n in 1..=self.max_suffix {
            let variant = format!("{}{}@{}", local, n, domain);
            if !self.is_taken(&variant) {
                tracing::debug!("Disambiguated {} -> {}", candidate, variant);
                self.assigned.insert(variant.clone());
                return Some(variant);
            }
        }
        tracing::warn!(
            "No free variant of {} within {} suffixes",
            candidate,
            self.max_suffix
        );
        None
    }

    /// Claims `email` only if nobody has it yet.
    pub fn reserve_exact(&mut self, email: &str) -> Option<String> {
        let k = key(email);
        if k.is_empty() || self.is_taken(&k) {
            return None;
        }
        self.assigned.insert(k.clone());
        Some(k)
    }

    pub fn len(&self) -> usize {
        self.preexisting.len() + self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
