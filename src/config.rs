//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.rollup.toml` files.

use crate::models::FiscalYear;
use crate::report::{QualityGate, Rounding};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".rollup.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub reporting: ReportingConfig,

    #[serde(default)]
    pub quality: QualityConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Fiscal year rolled up when none is given on the command line.
    #[serde(default = "default_fiscal_year")]
    pub fiscal_year: String,

    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            fiscal_year: default_fiscal_year(),
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_fiscal_year() -> String {
    "FY_25-26".to_string()
}

fn default_output() -> String {
    "rollup_report.md".to_string()
}

/// Report content and precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Decimal places for published sums.
    #[serde(default = "default_sum_decimals")]
    pub sum_decimals: u32,

    /// Decimal places for published ratios.
    #[serde(default = "default_ratio_decimals")]
    pub ratio_decimals: u32,

    /// Length of the critical projects list.
    #[serde(default = "default_critical_projects")]
    pub critical_projects: usize,

    #[serde(default = "default_true")]
    pub include_series: bool,

    #[serde(default = "default_true")]
    pub include_summary_tables: bool,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            sum_decimals: default_sum_decimals(),
            ratio_decimals: default_ratio_decimals(),
            critical_projects: default_critical_projects(),
            include_series: true,
            include_summary_tables: true,
        }
    }
}

fn default_sum_decimals() -> u32 {
    1
}

fn default_ratio_decimals() -> u32 {
    2
}

fn default_critical_projects() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// Which findings fail a run under `--fail-on-quality`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_true")]
    pub fail_on_duplicates: bool,

    #[serde(default)]
    pub fail_on_incomplete: bool,

    #[serde(default = "default_true")]
    pub fail_on_rejected: bool,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            fail_on_duplicates: true,
            fail_on_incomplete: false,
            fail_on_rejected: true,
        }
    }
}

impl From<&QualityConfig> for QualityGate {
    fn from(config: &QualityConfig) -> Self {
        Self {
            fail_on_duplicates: config.fail_on_duplicates,
            fail_on_incomplete: config.fail_on_incomplete,
            fail_on_rejected: config.fail_on_rejected,
        }
    }
}

impl From<&ReportingConfig> for Rounding {
    fn from(config: &ReportingConfig) -> Self {
        Self::new(config.sum_decimals, config.ratio_decimals)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref fiscal_year) = args.fiscal_year {
            self.general.fiscal_year = fiscal_year.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(critical) = args.critical {
            self.reporting.critical_projects = critical;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level after merging: `quiet` wins, then `[general] verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    pub fn fiscal_year(&self) -> FiscalYear {
        FiscalYear::new(self.general.fiscal_year.as_str())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.fiscal_year, "FY_25-26");
        assert_eq!(config.general.output, "rollup_report.md");
        assert_eq!(config.reporting.sum_decimals, 1);
        assert_eq!(config.reporting.ratio_decimals, 2);
        assert_eq!(config.reporting.critical_projects, 5);
        assert!(config.quality.fail_on_duplicates);
        assert!(!config.quality.fail_on_incomplete);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
fiscal_year = "FY_24-25"
verbose = true

[reporting]
ratio_decimals = 1
include_series = false

[quality]
fail_on_incomplete = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.fiscal_year(), FiscalYear::new("FY_24-25"));
        assert!(config.general.verbose);
        assert_eq!(config.general.output, "rollup_report.md");
        assert_eq!(config.reporting.ratio_decimals, 1);
        assert_eq!(config.reporting.sum_decimals, 1);
        assert!(!config.reporting.include_series);
        assert!(config.reporting.include_summary_tables);

        let gate = QualityGate::from(&config.quality);
        assert!(gate.fail_on_incomplete);
        assert!(gate.fail_on_duplicates);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[reporting]\nsum_decimals = 3").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(Rounding::from(&config.reporting).sum_decimals, 3);

        let mut broken = NamedTempFile::new().unwrap();
        writeln!(broken, "[reporting\nsum_decimals = ").unwrap();
        let err = Config::load(broken.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_verbose_setting_drives_log_level() {
        let mut config = Config::default();
        assert_eq!(config.log_level(false), tracing::Level::INFO);

        config.general.verbose = true;
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
        assert_eq!(config.log_level(true), tracing::Level::ERROR);

        let from_file: Config = toml::from_str("[general]\nverbose = true").unwrap();
        assert_eq!(from_file.log_level(false), tracing::Level::DEBUG);

        use clap::Parser;
        let args = crate::cli::Args::try_parse_from(["rollup", "--input", "p.json", "--verbose"]).unwrap();
        let mut merged = Config::default();
        merged.merge_with_args(&args);
        assert_eq!(merged.log_level(args.quiet), tracing::Level::DEBUG);
    }

    #[test]
    fn test_oversized_precision_is_capped() {
        let config: Config = toml::from_str("[reporting]\nsum_decimals = 400\nratio_decimals = 4000").unwrap();
        let rounding = Rounding::from(&config.reporting);
        assert_eq!(rounding.sum_decimals, 15);
        assert_eq!(rounding.ratio_decimals, 15);
        assert_eq!(rounding.ratio(87.5), 87.5);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[reporting]"));
        assert!(toml_str.contains("[quality]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.general.fiscal_year, "FY_25-26");
    }
}
