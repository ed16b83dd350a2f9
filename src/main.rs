//! # Email Enricher CLI
//!
//! Command-line interface for the Email Enricher library (`email_enricher_core`).
//! This binary parses arguments, sets up configuration, loads the dataset,
//! fills missing emails and writes the enriched dataset (and optionally a
//! changes report) back to disk.

use email_enricher_core::{
    default_changes_path, default_output_path, Config, ConfigBuilder, DataFormat, Dataset,
    EmailEnricher, EnrichmentReport, RowOutcome,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Fills missing contact emails in CSV and spreadsheet datasets.",
    long_about = "Email Enricher learns each company's email address pattern once (domain search API, web search, company website) and applies it to every contact at that company. Rows that already have a valid email are never touched."
)]
struct AppArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enrich a dataset and write the result next to it (or to OUTPUT_FILE).
    Enrich(EnrichArgs),
}

#[derive(Args, Debug)]
struct EnrichArgs {
    /// Input dataset (.csv, .xlsx, .xls, .xlsm or .ods).
    input_file: PathBuf,

    /// Output dataset. Defaults to `<stem>_enriched.<ext>` next to the input.
    output_file: Option<PathBuf>,

    /// Also write only the changed rows. Without a path, `<stem>_changes.<ext>` is used.
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    changes: Option<Option<PathBuf>>,

    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// Path to a configuration file (TOML format). CLI args override file settings.
    #[arg(long, env = "EMAIL_ENRICHER_CONFIG")]
    config_file: Option<String>,

    /// Hunter.io API key enabling the domain search adapter.
    #[arg(long, env = "HUNTER_API_KEY", hide_env_values = true)]
    hunter_api_key: Option<String>,

    /// Do not use any network source: cached patterns and fallback shapes only.
    #[arg(long)]
    offline: bool,

    /// Disable web search (direct matches and search samples).
    #[arg(long)]
    no_search: bool,

    /// Disable scraping of company websites.
    #[arg(long)]
    no_scrape: bool,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "EMAIL_ENRICHER_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// User agent string for HTTP requests.
    #[arg(long, env = "EMAIL_ENRICHER_USER_AGENT")]
    user_agent: Option<String>,

    /// HTML search endpoint queried with a `q` parameter.
    #[arg(long, env = "EMAIL_ENRICHER_SEARCH_URL")]
    search_url: Option<String>,

    /// Leave malformed emails in place instead of replacing them.
    #[arg(long)]
    keep_invalid: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    let args = AppArgs::parse();
    tracing::debug!("Parsed CLI arguments: {:?}", args);

    tracing::info!(
        "Email Enricher CLI v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let execution_result = match args.command {
        Command::Enrich(ref enrich_args) => run_enrich(enrich_args).await,
    };

    if let Err(e) = execution_result {
        tracing::error!("Execution failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

fn build_config(settings: &SettingsArgs) -> Result<Config> {
    let mut config_builder = ConfigBuilder::new();

    if let Some(ref path) = settings.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(ref key) = settings.hunter_api_key {
        config_builder = config_builder.hunter_api_key(Some(key));
    }
    if settings.no_search {
        config_builder = config_builder.enable_web_search(false);
    }
    if settings.no_scrape {
        config_builder = config_builder.enable_site_scrape(false);
    }
    if let Some(t) = settings.request_timeout {
        config_builder = config_builder.request_timeout(Duration::from_secs(t));
    }
    if let Some(ref ua) = settings.user_agent {
        config_builder = config_builder.user_agent(ua);
    }
    if let Some(ref url) = settings.search_url {
        config_builder = config_builder.search_url(url);
    }
    if settings.keep_invalid {
        config_builder = config_builder.replace_invalid_emails(false);
    }

    let config = config_builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build configuration: {}", e))?;
    tracing::debug!("Effective configuration loaded: {:?}", config);
    Ok(config)
}

/// Output paths must be writable formats; checked before any work is done.
fn check_writable(path: &Path) -> Result<()> {
    let format = DataFormat::from_path(path)
        .with_context(|| format!("Cannot write output '{}'", path.display()))?;
    if format == DataFormat::LegacySpreadsheet {
        return Err(anyhow::anyhow!(
            "Cannot write output '{}': only .csv and .xlsx outputs are supported",
            path.display()
        ));
    }
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            tracing::debug!("Creating output directory: {}", parent_dir.display());
            std::fs::create_dir_all(parent_dir).with_context(|| {
                format!(
                    "Failed to create output directory '{}'",
                    parent_dir.display()
                )
            })?;
        }
    }
    Ok(())
}

async fn run_enrich(args: &EnrichArgs) -> Result<()> {
    let start_time = Instant::now();
    let input_path = args.input_file.as_path();

    if !input_path.is_file() {
        return Err(anyhow::anyhow!(
            "Input file not found or is not a file: {}",
            input_path.display()
        ));
    }

    let output_path = match args.output_file {
        Some(ref p) => p.clone(),
        None => default_output_path(input_path)
            .with_context(|| format!("Unsupported input '{}'", input_path.display()))?,
    };
    check_writable(&output_path)?;

    let changes_path = match args.changes {
        Some(Some(ref p)) => Some(p.clone()),
        Some(None) => Some(default_changes_path(input_path)?),
        None => None,
    };
    if let Some(ref p) = changes_path {
        check_writable(p)?;
    }

    tracing::info!(
        "Input: '{}', Output: '{}'{}",
        input_path.display(),
        output_path.display(),
        changes_path
            .as_ref()
            .map(|p| format!(", Changes: '{}'", p.display()))
            .unwrap_or_default()
    );

    let config = build_config(&args.settings)?;
    let enricher = if args.settings.offline {
        EmailEnricher::offline(config)
    } else {
        EmailEnricher::new(config).context("Failed to initialize discovery adapters")?
    };

    let mut dataset = Dataset::load(input_path)
        .with_context(|| format!("Failed to load dataset '{}'", input_path.display()))?;
    let mut contacts = dataset.contacts();
    let total_records_loaded = contacts.len();
    if total_records_loaded == 0 {
        tracing::warn!(
            "Input file '{}' contains no data rows. Writing it back unchanged.",
            input_path.display()
        );
    }

    let pb = ProgressBar::new(total_records_loaded as u64);
    pb.set_style(ProgressStyle::default_bar()
         .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | ETA: {eta} | {msg}")
         .context("Failed to set progress bar template")?
         .progress_chars("=> "));
    pb.set_message("Enriching contacts...");

    let report = enricher
        .enrich_with_progress(&mut contacts, |_, outcome| {
            if let RowOutcome::Filled(email) = outcome {
                pb.set_message(email.address.clone());
            }
            pb.inc(1);
        })
        .await;
    pb.finish_with_message(format!("Processed {} records", report.total()));

    dataset.apply_changes(&report.changes);

    tracing::info!("Saving results to '{}'...", output_path.display());
    dataset
        .save(&output_path)
        .with_context(|| format!("Failed to write '{}'", output_path.display()))?;

    if let Some(ref p) = changes_path {
        let changed = dataset.subset(&report.changed_rows());
        tracing::info!(
            "Saving {} changed rows to '{}'...",
            changed.len(),
            p.display()
        );
        changed
            .save(p)
            .with_context(|| format!("Failed to write changes report '{}'", p.display()))?;
    }

    log_summary(&report, total_records_loaded, start_time.elapsed());
    Ok(())
}

/// Logs a summary of the run to the console using `tracing::info`.
fn log_summary(report: &EnrichmentReport, original_total: usize, duration: Duration) {
    tracing::info!("-------------------- Enrichment Summary --------------------");
    tracing::info!("Total Rows in Input File    : {}", original_total);
    tracing::info!("  - Already Had Email       : {}", report.unchanged);
    tracing::info!("  - Emails Filled           : {}", report.filled);
    tracing::info!("    (fallback, low confidence): {}", report.low_confidence);
    tracing::info!("  - Left Blank              : {}", report.unresolved);
    tracing::info!("Total Time Taken            : {:.2?}", duration);
    if duration.as_secs_f64() > 0.01 && original_total > 0 {
        let rate = (original_total as f64) / duration.as_secs_f64();
        tracing::info!("Processing Rate             : {:.2} rows/sec", rate);
    }
    tracing::info!("------------------------------------------------------------");

    let review: Vec<String> = report
        .changes
        .iter()
        .filter(|c| c.source.is_low_confidence())
        .map(|c| format!("row {} ({})", c.row + 1, c.new_value))
        .collect();
    if !review.is_empty() {
        tracing::info!("Fallback emails worth reviewing: {}", review.join(", "));
    }
    for (row, outcome) in &report.outcomes {
        if let RowOutcome::Unresolved(reason) = outcome {
            tracing::info!("Row {} left blank: {}", row + 1, reason);
        }
    }
}
