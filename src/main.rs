//! Commissioning rollup CLI
//!
//! Reads a project snapshot, rolls it up for one fiscal year and writes
//! a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success (or data-quality findings without --fail-on-quality)
//!   1 - Runtime error (bad arguments, unreadable input or config, write failure)
//!   2 - Data-quality findings while --fail-on-quality is set

use anyhow::{Context, Result};
use commissioning_rollup::cli::{Args, OutputFormat};
use commissioning_rollup::config::{Config, CONFIG_FILE};
use commissioning_rollup::input::load_snapshot;
use commissioning_rollup::report::{
    build_report, generate_json_report, generate_markdown_report, QualityGate, ReportSettings,
    Rounding,
};
use commissioning_rollup::store::ProjectStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if args.init_config {
        return handle_init_config();
    }

    // The config file can raise the log level, so it is read before logging starts.
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(args.quiet));

    info!("commissioning-rollup v{}", env!("CARGO_PKG_VERSION"));
    match config_source {
        ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
        ConfigSource::Defaults => debug!("No config file found, using defaults"),
        ConfigSource::Fallback(e) => warn!("Failed to load config, using defaults: {:#}", e),
    }
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Rollup failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: write a default .rollup.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging. `RUST_LOG` refines the level picked by --verbose/--quiet
/// and the config file.
fn init_logging(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the rollup. Returns the exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let input = args.input.clone().context("--input is required")?;
    println!("📥 Loading snapshot: {}", input.display());
    let loaded = load_snapshot(&input).await?;
    let mut load_rejections = loaded.rejected;

    // Command line, then the snapshot's own year, then the config file.
    let declared = loaded.fiscal_year;
    let fiscal_year = match (&args.fiscal_year, &declared) {
        (None, Some(declared)) => declared.clone(),
        _ => config.fiscal_year(),
    };
    info!("Fiscal year scope: {}", fiscal_year);

    // A document declaring the year being rolled up is a replacement batch.
    let mut store = ProjectStore::new();
    if declared.as_ref() == Some(&fiscal_year) {
        debug!("Importing {} as a batch for {}", input.display(), fiscal_year);
        let outcome = store
            .replace_fiscal_year(&fiscal_year, loaded.records)
            .with_context(|| format!("Failed to import {}", input.display()))?;
        load_rejections.extend(outcome.rejected);
    } else {
        store.load(loaded.records);
    }

    let snapshot = store.snapshot(&fiscal_year);
    if snapshot.is_empty() {
        warn!("No records for {} in {}", fiscal_year, input.display());
    }

    let settings = ReportSettings {
        fiscal_year: fiscal_year.clone(),
        filter: args.record_filter(),
        window: args.window,
        rounding: Rounding::from(&config.reporting),
        critical_limit: config.reporting.critical_projects,
        include_series: config.reporting.include_series,
        include_summary_tables: config.reporting.include_summary_tables,
        source: Some(input.display().to_string()),
    };

    println!("🧮 Rolling up {} records for {}...", snapshot.len(), fiscal_year);
    let mut report = build_report(Arc::new(snapshot), &settings).await?;
    report.absorb_load_rejections(load_rejections);

    let output = match args.format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Markdown => generate_markdown_report(&report),
    };

    let output_path = output_path(&args, &config);
    tokio::fs::write(&output_path, &output)
        .await
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!("\n📊 Rollup Summary:");
    if let Some(overall) = report.overall() {
        println!(
            "   {}: plan {} | rephase {} | actual {} | achievement {}% | {} projects",
            overall.label,
            overall.kpi.plan_total,
            overall.kpi.rephase_total,
            overall.kpi.actual_total,
            overall.kpi.achievement,
            overall.kpi.project_count
        );
    }
    let quality = &report.data_quality;
    println!(
        "   Data quality: {} duplicate group(s), {} incomplete, {} rejected, {} undecodable",
        quality.duplicates.len(),
        quality.incomplete.len(),
        quality.rejected.len(),
        quality.undecodable.len()
    );
    println!("   Duration: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Report saved to: {}", output_path.display());

    if args.fail_on_quality {
        let failures = quality.failures(&QualityGate::from(&config.quality));
        if !failures.is_empty() {
            eprintln!(
                "\n⛔ Data-quality checks failed: {}. Failing (exit code 2).",
                failures.join(", ")
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Explicit --output wins; JSON reports swap the configured extension.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    if let Some(ref output) = args.output {
        return output.clone();
    }
    let configured = PathBuf::from(&config.general.output);
    match args.format {
        OutputFormat::Json => configured.with_extension("json"),
        OutputFormat::Markdown => configured,
    }
}

/// Where the configuration came from, reported once logging is up.
enum ConfigSource {
    File(PathBuf),
    Defaults,
    /// The default file exists but could not be read or parsed.
    Fallback(anyhow::Error),
}

/// Load configuration from file or use defaults. An explicit --config
/// that fails is an error; a broken default file falls back to defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::File(PathBuf::from(CONFIG_FILE)))),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => Ok((Config::default(), ConfigSource::Fallback(e))),
    }
}
