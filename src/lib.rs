//! # Email Enricher Core Library
//!
//! This crate fills in missing contact emails in tabular datasets (CSV or
//! spreadsheet) from each contact's name and company website.
//!
//! For every domain it tries to learn the company's address convention once,
//! from a domain search API, web search results or the company's own pages,
//! and then applies that convention to every contact at the domain. When
//! nothing can be learned, a short list of common fallback shapes is used and
//! the row is reported as low confidence.
//!
//! It is designed to be used either directly as a library or via the
//! `email-enricher` command-line tool (which uses this library).

mod core;
mod dataset;
mod discovery;
mod utils;

pub use crate::core::cache::{CachedPattern, PatternCache, PatternProvenance};
pub use crate::core::config::{default_config, Config, ConfigBuilder, ConfigFile};
pub use crate::core::dedup::DedupGuard;
pub use crate::core::enricher::{EmailEnricher, RunState};
pub use crate::core::error::{AppError, Result};
pub use crate::core::models::{
    ChangeRecord, Contact, EmailSource, EnrichmentReport, GeneratedEmail, RowOutcome,
    UnresolvedReason,
};
pub use crate::dataset::{
    default_changes_path, default_output_path, Cell, DataFormat, Dataset, COMPANY_COLUMN,
    EMAIL_COLUMN, FIRST_NAME_COLUMN, LAST_NAME_COLUMN, WEBSITE_COLUMN,
};
pub use crate::discovery::{
    build_adapters, AdapterOutcome, DirectMatchAdapter, Discovery, DiscoveryAdapter, FetchOutcome,
    DiscoveryRequest, DiscoveryScope, DomainSearchAdapter, HttpFetcher, SearchSampleAdapter,
    SiteScrapeAdapter,
};
pub use crate::utils::domain::{normalize_domain, NormalizedDomain};
pub use crate::utils::inference::{infer_pattern, Sample};
pub use crate::utils::names::PersonName;
pub use crate::utils::patterns::{
    generate_candidate, EmailPattern, FALLBACK_PATTERNS, PATTERN_CATALOG,
};

use std::path::Path;

/// Loads `input`, enriches every row and returns the updated dataset along
/// with the run report. Nothing is written to disk.
pub async fn enrich_dataset(
    enricher: &EmailEnricher,
    input: &Path,
) -> Result<(Dataset, EnrichmentReport)> {
    let mut dataset = Dataset::load(input)?;
    let mut contacts = dataset.contacts();
    let report = enricher.enrich(&mut contacts).await;
    dataset.apply_changes(&report.changes);
    Ok((dataset, report))
}
