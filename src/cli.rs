//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::engine::aggregate::{RecordFilter, TimeWindow};
use crate::models::{ProjectType, Technology};
use clap::Parser;
use std::path::PathBuf;

/// Commissioning rollup: plan vs actual for a renewable-energy portfolio
///
/// Reads a project snapshot (JSON), rolls it up for one fiscal year and
/// writes a Markdown or JSON report with KPIs, period comparisons, trend
/// series, summary tables and data-quality findings.
///
/// Examples:
///   rollup --input projects.json
///   rollup --input projects.json --fiscal-year FY_24-25 --format json
///   rollup --input projects.json --technology wind --window q3
///   rollup --input projects.json --fail-on-quality
///   rollup --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Project snapshot to roll up (JSON array or {fiscalYear, projects})
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Fiscal year scope, e.g. FY_25-26
    ///
    /// Falls back to the snapshot's own fiscalYear, then to the config file.
    #[arg(short = 'y', long, value_name = "FY", env = "ROLLUP_FISCAL_YEAR")]
    pub fiscal_year: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .rollup.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Only include projects of this technology
    #[arg(long, value_name = "TECH")]
    pub technology: Option<TechnologyArg>,

    /// Only include projects in this section (e.g. A, B, D1)
    #[arg(long, value_name = "SECTION")]
    pub section: Option<String>,

    /// Only include projects with this business model (PPA, Merchant, Group, ...)
    #[arg(long, value_name = "MODEL")]
    pub business_model: Option<String>,

    /// Only include projects with exactly this category (e.g. "Khavda Solar")
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,

    /// Only include the project with this name
    #[arg(long, value_name = "NAME")]
    pub project: Option<String>,

    /// Only include projects of this special purpose vehicle
    #[arg(long, value_name = "SPV")]
    pub spv: Option<String>,

    /// Time window for the headline comparison
    ///
    /// Values: yearly, h1, h2, q1..q4, apr..mar, cumulative
    #[arg(long, default_value = "yearly", value_name = "WINDOW", value_parser = parse_window)]
    pub window: TimeWindow,

    /// Number of critical projects to list
    #[arg(long, value_name = "COUNT")]
    pub critical: Option<usize>,

    /// Exit with code 2 when data-quality checks fail
    ///
    /// Which findings count is configured in the [quality] section.
    #[arg(long)]
    pub fail_on_quality: bool,

    /// Generate a default .rollup.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

fn parse_window(s: &str) -> Result<TimeWindow, String> {
    s.parse()
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Technology filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TechnologyArg {
    Solar,
    Wind,
    Other,
}

impl From<TechnologyArg> for Technology {
    fn from(arg: TechnologyArg) -> Self {
        match arg {
            TechnologyArg::Solar => Technology::Solar,
            TechnologyArg::Wind => Technology::Wind,
            TechnologyArg::Other => Technology::Other,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        match self.input {
            Some(ref input) if !input.is_file() => {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            None => return Err("--input is required".to_string()),
            _ => {}
        }

        if let Some(ref fiscal_year) = self.fiscal_year {
            if fiscal_year.trim().is_empty() {
                return Err("Fiscal year must not be empty".to_string());
            }
        }

        if self.critical == Some(0) {
            return Err("Critical project count must be at least 1".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Build the record filter from the filter flags.
    pub fn record_filter(&self) -> RecordFilter {
        RecordFilter {
            technology: self.technology.map(Technology::from),
            section: self.section.clone(),
            business_model: self.business_model.as_deref().map(ProjectType::from),
            category: self.category.clone(),
            project_name: self.project.clone(),
            spv: self.spv.clone(),
        }
    }
}
