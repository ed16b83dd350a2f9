//! Row enrichment: decides, per contact, whether and how to fill the email.

use crate::core::cache::PatternCache;
use crate::core::config::Config;
use crate::core::dedup::DedupGuard;
use crate::core::error::Result;
use crate::core::models::{
    ChangeRecord, Contact, EmailSource, EnrichmentReport, GeneratedEmail, RowOutcome,
    UnresolvedReason,
};
use crate::discovery::{
    build_adapters, AdapterOutcome, Discovery, DiscoveryAdapter, DiscoveryRequest, DiscoveryScope,
};
use crate::utils::domain::{normalize_domain, NormalizedDomain};
use crate::utils::inference::{attach_names, infer_pattern};
use crate::utils::names::PersonName;
use crate::utils::patterns::{generate_candidate, EmailPattern};

use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Mutable state of one enrichment run.
#[derive(Debug, Default)]
pub struct RunState {
    pub cache: PatternCache,
    pub guard: DedupGuard,
    rate_limited: HashSet<(&'static str, String)>,
    /// Names of every contact at each mail domain, for naming samples.
    roster: HashMap<String, Vec<PersonName>>,
}

impl RunState {
    /// Seeds the guard with the dataset's well-formed emails and indexes the
    /// contacts by domain.
    pub fn new(config: &Config, contacts: &[Contact]) -> Self {
        let mut guard = DedupGuard::new(config.max_disambiguation_suffix);
        let mut roster: HashMap<String, Vec<PersonName>> = HashMap::new();

        for contact in contacts {
            if let Some(email) = contact.existing_email() {
                if config.is_valid_email(email) && !guard.add_existing(email) {
                    tracing::warn!(target: "enrich_task",
                        "Row {}: email {} already appears earlier in the input; leaving it as is.",
                        contact.row, email);
                }
            }

            let name = PersonName::new(&contact.first_name, &contact.last_name);
            let domain = contact
                .website
                .as_deref()
                .and_then(|w| normalize_domain(w, &config.domain_aliases));
            if let (Some(name), Some(domain)) = (name, domain) {
                let names = roster.entry(domain.email_domain).or_default();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        Self {
            cache: PatternCache::new(),
            guard,
            rate_limited: HashSet::new(),
            roster,
        }
    }

    fn roster_for(&self, domain: &str) -> &[PersonName] {
        self.roster.get(domain).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_rate_limited(&self, adapter: &'static str, domain: &str) -> bool {
        self.rate_limited.contains(&(adapter, domain.to_string()))
    }
}

/// Fills missing emails using cached patterns, the discovery adapters and the
/// fallback shapes, in that order.
pub struct EmailEnricher {
    config: Config,
    adapters: Vec<Box<dyn DiscoveryAdapter>>,
}

impl EmailEnricher {
    /// Enricher with the network adapters enabled by `config`.
    pub fn new(config: Config) -> Result<Self> {
        let adapters = build_adapters(&config)?;
        tracing::info!("EmailEnricher initialized with {} adapters.", adapters.len());
        Ok(Self { config, adapters })
    }

    /// Enricher that never touches the network: cache and fallback only.
    pub fn offline(config: Config) -> Self {
        tracing::info!("EmailEnricher initialized in offline mode.");
        Self::with_adapters(config, Vec::new())
    }

    pub fn with_adapters(config: Config, adapters: Vec<Box<dyn DiscoveryAdapter>>) -> Self {
        Self { config, adapters }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn enrich(&self, contacts: &mut [Contact]) -> EnrichmentReport {
        self.enrich_with_progress(contacts, |_, _| {}).await
    }

    /// Enriches every contact in order, calling `on_row` after each one.
    pub async fn enrich_with_progress<F>(
        &self,
        contacts: &mut [Contact],
        mut on_row: F,
    ) -> EnrichmentReport
    where
        F: FnMut(usize, &RowOutcome),
    {
        let start = Instant::now();
        let mut state = RunState::new(&self.config, contacts);
        let mut report = EnrichmentReport::default();

        for contact in contacts.iter_mut() {
            let (outcome, change) = self.enrich_contact(contact, &mut state).await;
            on_row(contact.row, &outcome);
            if let Some(change) = change {
                report.changes.push(change);
            }
            report.record(contact.row, outcome);
        }

        tracing::info!(target: "enrich_task",
            "Enrichment finished in {:.2?}: {} filled ({} fallback), {} unresolved, {} unchanged. {} domain patterns cached.",
            start.elapsed(), report.filled, report.low_confidence, report.unresolved, report.unchanged, state.cache.len());
        report
    }

    /// Processes one contact, writing the email in place when it is filled.
    pub async fn enrich_contact(
        &self,
        contact: &mut Contact,
        state: &mut RunState,
    ) -> (RowOutcome, Option<ChangeRecord>) {
        let label = format!("row {}: {}", contact.row, contact.full_name());

        let old_value = match contact.existing_email() {
            Some(email) if self.config.is_valid_email(email) => {
                tracing::trace!(target: "enrich_task", "[{}] Has email, skipping.", label);
                return (RowOutcome::Unchanged, None);
            }
            Some(email) if !self.config.replace_invalid_emails => {
                tracing::debug!(target: "enrich_task", "[{}] Keeping malformed email '{}'.", label, email);
                return (RowOutcome::Unchanged, None);
            }
            Some(email) => {
                tracing::info!(target: "enrich_task", "[{}] Replacing malformed email '{}'.", label, email);
                Some(email.to_string())
            }
            None => None,
        };

        let Some(name) = PersonName::new(&contact.first_name, &contact.last_name) else {
            tracing::warn!(target: "enrich_task", "[{}] Missing first or last name.", label);
            return (RowOutcome::Unresolved(UnresolvedReason::MissingName), None);
        };

        let Some(domain) = contact
            .website
            .as_deref()
            .and_then(|w| normalize_domain(w, &self.config.domain_aliases))
        else {
            tracing::warn!(target: "enrich_task", "[{}] No usable website; skipping discovery.", label);
            return (RowOutcome::Unresolved(UnresolvedReason::NoDomain), None);
        };
        let domain = relocate(&state.cache, domain);

        let generated = match state.cache.pattern(domain.as_str()).copied() {
            Some(pattern) => {
                tracing::debug!(target: "enrich_task", "[{}] Cached pattern '{}' for {}.", label, pattern, domain);
                self.apply_pattern(&name, &domain, &pattern, state)
            }
            None => {
                let request = DiscoveryRequest {
                    name: name.clone(),
                    first_name: contact.first_name.clone(),
                    last_name: contact.last_name.clone(),
                    company_name: contact.company_name.clone(),
                    domain: domain.clone(),
                };
                match self.discover(&request, state, &label).await {
                    Some(found) => Some(found),
                    None => {
                        let domain = relocate(&state.cache, domain);
                        state.cache.mark_none_found(domain.as_str());
                        tracing::info!(target: "enrich_task", "[{}] Discovery failed for {}; using fallback shapes.", label, domain);
                        self.apply_fallback(&name, &domain, state)
                    }
                }
            }
        };

        let Some(generated) = generated else {
            return (
                RowOutcome::Unresolved(UnresolvedReason::DisambiguationExhausted),
                None,
            );
        };

        tracing::info!(target: "enrich_task", "[{}] Filled {} ({}).", label, generated.address, generated.source);
        contact.email = Some(generated.address.clone());
        let change = ChangeRecord {
            row: contact.row,
            old_value,
            new_value: generated.address.clone(),
            source: generated.source,
        };
        (RowOutcome::Filled(generated), Some(change))
    }

    /// Runs the adapters in priority order until one yields a usable address.
    async fn discover(
        &self,
        request: &DiscoveryRequest,
        state: &mut RunState,
        label: &str,
    ) -> Option<GeneratedEmail> {
        let domain = &request.domain;
        let key = domain.as_str();

        for adapter in &self.adapters {
            let adapter_name = adapter.name();
            if adapter.scope() == DiscoveryScope::Domain && state.cache.is_none_found(key) {
                tracing::trace!(target: "enrich_task", "[{}] {} skipped: nothing found earlier for {}.", label, adapter_name, key);
                continue;
            }
            if state.is_rate_limited(adapter_name, key) {
                tracing::debug!(target: "enrich_task", "[{}] {} skipped: rate limited for {}.", label, adapter_name, key);
                continue;
            }

            let outcome = adapter.attempt(request).await;
            tracing::debug!(target: "enrich_task", "[{}] {} -> {}", label, adapter_name, outcome);

            match outcome {
                AdapterOutcome::Success(Discovery::Pattern(pattern)) => {
                    state.cache.put(key, pattern, adapter.provenance());
                    return self.apply_pattern(&request.name, domain, &pattern, state);
                }
                AdapterOutcome::Success(Discovery::DirectMatch(email)) => {
                    if !self.config.is_valid_email(&email) {
                        tracing::debug!(target: "enrich_task", "[{}] Ignoring malformed direct match '{}'.", label, email);
                        continue;
                    }
                    match state.guard.reserve_exact(&email) {
                        Some(address) => {
                            return Some(GeneratedEmail::new(address, EmailSource::DirectMatch));
                        }
                        None => {
                            tracing::info!(target: "enrich_task", "[{}] Direct match {} already used by another row; continuing.", label, email);
                        }
                    }
                }
                AdapterOutcome::Success(Discovery::Samples(addresses)) => {
                    let samples = attach_names(&addresses, state.roster_for(key));
                    match infer_pattern(&samples) {
                        Some(pattern) => {
                            tracing::info!(target: "enrich_task", "[{}] Inferred '{}' for {} from {} samples.", label, pattern, key, samples.len());
                            state.cache.put(key, pattern, adapter.provenance());
                            return self.apply_pattern(&request.name, domain, &pattern, state);
                        }
                        None => {
                            tracing::debug!(target: "enrich_task", "[{}] No pattern fits samples {:?}.", label, addresses);
                        }
                    }
                }
                AdapterOutcome::Success(Discovery::MailDomain {
                    domain: mail_domain,
                    samples: addresses,
                }) => {
                    tracing::info!(target: "enrich_task", "[{}] Addresses for {} live at {}.", label, key, mail_domain);
                    state.cache.set_mail_domain(key, &mail_domain);
                    let relocated = domain.clone().with_email_domain(mail_domain);
                    let samples = attach_names(&addresses, state.roster_for(key));
                    match infer_pattern(&samples) {
                        Some(pattern) => {
                            tracing::info!(target: "enrich_task", "[{}] Inferred '{}' for {} from {} samples.", label, pattern, relocated, samples.len());
                            state.cache.put(relocated.as_str(), pattern, adapter.provenance());
                            return self.apply_pattern(&request.name, &relocated, &pattern, state);
                        }
                        None => {
                            tracing::debug!(target: "enrich_task", "[{}] No pattern fits samples {:?}.", label, addresses);
                        }
                    }
                }
                AdapterOutcome::NotFound => {}
                AdapterOutcome::TransportError(e) => {
                    tracing::warn!(target: "enrich_task", "[{}] {} failed: {}", label, adapter_name, e);
                }
                AdapterOutcome::RateLimited => {
                    tracing::warn!(target: "enrich_task", "[{}] {} rate limited for {}; not asking again this run.", label, adapter_name, key);
                    state.rate_limited.insert((adapter_name, key.to_string()));
                }
            }
        }
        None
    }

    fn apply_pattern(
        &self,
        name: &PersonName,
        domain: &NormalizedDomain,
        pattern: &EmailPattern,
        state: &mut RunState,
    ) -> Option<GeneratedEmail> {
        let candidate = generate_candidate(name, domain.as_str(), Some(pattern), &state.guard)?;
        let address = state.guard.reserve(&candidate.address)?;
        Some(GeneratedEmail::new(address, candidate.source))
    }

    fn apply_fallback(
        &self,
        name: &PersonName,
        domain: &NormalizedDomain,
        state: &mut RunState,
    ) -> Option<GeneratedEmail> {
        let candidate = generate_candidate(name, domain.as_str(), None, &state.guard)?;
        let address = state.guard.reserve(&candidate.address)?;
        Some(GeneratedEmail::new(address, candidate.source))
    }
}

/// Swaps in the mail domain discovered for `domain` earlier in the run.
fn relocate(cache: &PatternCache, domain: NormalizedDomain) -> NormalizedDomain {
    match cache.mail_domain(domain.as_str()) {
        Some(mail_domain) => domain.with_email_domain(mail_domain),
        None => domain,
    }
}
