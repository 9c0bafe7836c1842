//! Report assembly.
//!
//! Builds a [`RollupReport`] from a snapshot. This is the only place values
//! are rounded: the engine hands over full-precision sums and the builder
//! rounds each figure once, on the way out.

use crate::engine::aggregate::{compare, RecordFilter, TimeWindow, WindowComparison};
use crate::engine::breakdown::{
    business_model_split, critical_projects, section_subtotals, technology_split,
    ProjectDeviation, SectionSubtotal, Share,
};
use crate::engine::identity::{
    find_duplicates, find_incomplete_projects, DuplicateGroup, IdentityScope, IncompleteProject,
};
use crate::engine::kpi::{kpi_summary, status_counts, KpiSummary, StatusCounts};
use crate::engine::series::{
    cumulative_series, period_series, CumulativePoint, Granularity, SeriesPoint,
};
use crate::engine::summary_table::{summary_table, PeriodColumns, SummaryTable};
use crate::engine::validate::{rejected_records, RejectedRecord};
use crate::models::{FiscalYear, ProjectRecord, Technology};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Largest precision `round_to` honours. Beyond this an f64 has no digits left.
pub const MAX_DECIMALS: u32 = 15;

/// Round half away from zero. Non-finite input becomes 0 and -0.0 is
/// folded onto 0.0. Precision is capped at [`MAX_DECIMALS`].
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Output precision for sums and ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rounding {
    pub sum_decimals: u32,
    pub ratio_decimals: u32,
}

impl Default for Rounding {
    fn default() -> Self {
        Self {
            sum_decimals: 1,
            ratio_decimals: 2,
        }
    }
}

impl Rounding {
    /// Precision for sums and ratios, each capped at [`MAX_DECIMALS`].
    pub fn new(sum_decimals: u32, ratio_decimals: u32) -> Self {
        Self {
            sum_decimals: sum_decimals.min(MAX_DECIMALS),
            ratio_decimals: ratio_decimals.min(MAX_DECIMALS),
        }
    }

    pub fn sum(&self, value: f64) -> f64 {
        round_to(value, self.sum_decimals)
    }

    pub fn ratio(&self, value: f64) -> f64 {
        round_to(value, self.ratio_decimals)
    }
}

/// Values that can be rounded for output.
trait Rounded {
    fn rounded(self, rounding: &Rounding) -> Self;
}

impl Rounded for KpiSummary {
    fn rounded(self, r: &Rounding) -> Self {
        Self {
            plan_total: r.sum(self.plan_total),
            rephase_total: r.sum(self.rephase_total),
            actual_total: r.sum(self.actual_total),
            achievement: r.ratio(self.achievement),
            ..self
        }
    }
}

impl Rounded for WindowComparison {
    fn rounded(self, r: &Rounding) -> Self {
        Self {
            plan: r.sum(self.plan),
            rephase: r.sum(self.rephase),
            actual: r.sum(self.actual),
            deviation: r.sum(self.deviation),
            achievement: r.ratio(self.achievement),
            ..self
        }
    }
}

impl Rounded for SeriesPoint {
    fn rounded(self, r: &Rounding) -> Self {
        Self {
            plan: r.sum(self.plan),
            rephase: r.sum(self.rephase),
            actual: r.sum(self.actual),
            deviation: r.sum(self.deviation),
            ..self
        }
    }
}

impl Rounded for CumulativePoint {
    fn rounded(self, r: &Rounding) -> Self {
        Self {
            plan: r.sum(self.plan),
            actual: r.sum(self.actual),
            ..self
        }
    }
}

impl Rounded for Share {
    fn rounded(self, r: &Rounding) -> Self {
        Self {
            value: r.sum(self.value),
            percent: r.ratio(self.percent),
            ..self
        }
    }
}

impl Rounded for SectionSubtotal {
    fn rounded(self, r: &Rounding) -> Self {
        Self {
            plan: r.sum(self.plan),
            rephase: r.sum(self.rephase),
            actual: r.sum(self.actual),
            achievement: r.ratio(self.achievement),
            ..self
        }
    }
}

impl Rounded for ProjectDeviation {
    fn rounded(self, r: &Rounding) -> Self {
        Self {
            plan: r.sum(self.plan),
            actual: r.sum(self.actual),
            deviation: r.sum(self.deviation),
            ..self
        }
    }
}

impl Rounded for PeriodColumns {
    fn rounded(self, r: &Rounding) -> Self {
        Self {
            months: self.months.map(|v| r.sum(v)),
            quarters: self.quarters.map(|v| r.sum(v)),
            halves: self.halves.map(|v| r.sum(v)),
            cumulative_to_date: r.sum(self.cumulative_to_date),
            total: r.sum(self.total),
        }
    }
}

impl Rounded for SummaryTable {
    fn rounded(mut self, r: &Rounding) -> Self {
        for row in &mut self.rows {
            row.columns = std::mem::take(&mut row.columns).rounded(r);
        }
        self
    }
}

fn round_all<T: Rounded>(items: Vec<T>, rounding: &Rounding) -> Vec<T> {
    items.into_iter().map(|item| item.rounded(rounding)).collect()
}

/// Which data-quality findings fail a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGate {
    pub fail_on_duplicates: bool,
    pub fail_on_incomplete: bool,
    pub fail_on_rejected: bool,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            fail_on_duplicates: true,
            fail_on_incomplete: false,
            fail_on_rejected: true,
        }
    }
}

/// Everything needed to build one report.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub fiscal_year: FiscalYear,
    pub filter: RecordFilter,
    pub window: TimeWindow,
    pub rounding: Rounding,
    pub critical_limit: usize,
    pub include_series: bool,
    pub include_summary_tables: bool,
    /// Where the snapshot came from, for the metadata block.
    pub source: Option<String>,
}

impl ReportSettings {
    pub fn new(fiscal_year: FiscalYear) -> Self {
        Self {
            fiscal_year,
            filter: RecordFilter::all(),
            window: TimeWindow::Yearly,
            rounding: Rounding::default(),
            critical_limit: 5,
            include_series: true,
            include_summary_tables: true,
            source: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub fiscal_year: String,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub filter: String,
    pub rounding: Rounding,
    pub status_counts: StatusCounts,
}

/// KPIs and summary table for one technology scope.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeRollup {
    pub label: String,
    pub kpi: KpiSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_table: Option<SummaryTable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendSeries {
    pub monthly: Vec<SeriesPoint>,
    pub quarterly: Vec<SeriesPoint>,
    pub half_yearly: Vec<SeriesPoint>,
    /// Running monthly totals.
    pub cumulative: Vec<CumulativePoint>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DataQuality {
    pub duplicates: Vec<DuplicateGroup>,
    pub incomplete: Vec<IncompleteProject>,
    /// Decoded records excluded for missing fields or bad numbers.
    pub rejected: Vec<RejectedRecord>,
    /// Input rows that could not be decoded at all.
    pub undecodable: Vec<RejectedRecord>,
}

impl DataQuality {
    pub fn is_clean(&self) -> bool {
        self.duplicates.is_empty()
            && self.incomplete.is_empty()
            && self.rejected.is_empty()
            && self.undecodable.is_empty()
    }

    /// Findings the gate treats as failures, one line each.
    pub fn failures(&self, gate: &QualityGate) -> Vec<String> {
        let mut failures = Vec::new();
        if gate.fail_on_duplicates && !self.duplicates.is_empty() {
            failures.push(format!("{} duplicate group(s)", self.duplicates.len()));
        }
        if gate.fail_on_incomplete && !self.incomplete.is_empty() {
            failures.push(format!("{} incomplete project(s)", self.incomplete.len()));
        }
        let rejected = self.rejected.len() + self.undecodable.len();
        if gate.fail_on_rejected && rejected > 0 {
            failures.push(format!("{} rejected row(s)", rejected));
        }
        failures
    }
}

/// The assembled rollup, rounded and ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct RollupReport {
    pub metadata: ReportMetadata,
    pub scopes: Vec<ScopeRollup>,
    /// Plan, rephase and actual for the requested filter and window.
    pub selection: WindowComparison,
    pub windows: Vec<WindowComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<TrendSeries>,
    pub technology_split: Vec<Share>,
    pub business_model_split: Vec<Share>,
    /// Per-section subtotals within each technology.
    pub section_subtotals: Vec<SectionSubtotal>,
    pub critical_projects: Vec<ProjectDeviation>,
    pub data_quality: DataQuality,
}

impl RollupReport {
    /// Merge rows the loader could not decode into the quality section.
    pub fn absorb_load_rejections(&mut self, rejected: Vec<RejectedRecord>) {
        self.data_quality.undecodable.extend(rejected);
    }

    pub fn overall(&self) -> Option<&ScopeRollup> {
        self.scopes.first()
    }
}

/// Technology scopes to roll up. A technology filter narrows this to one.
fn technology_scopes(filter: &RecordFilter) -> Vec<Option<Technology>> {
    match filter.technology {
        Some(technology) => vec![Some(technology)],
        None => vec![None, Some(Technology::Solar), Some(Technology::Wind)],
    }
}

fn rollup_scope(
    records: &[ProjectRecord],
    settings: &ReportSettings,
    technology: Option<Technology>,
) -> ScopeRollup {
    let filter = RecordFilter {
        technology,
        ..settings.filter.clone()
    };
    let label = technology
        .map(|t| t.to_string())
        .unwrap_or_else(|| "Overall".to_string());

    let kpi = kpi_summary(records, &settings.fiscal_year, &filter).rounded(&settings.rounding);
    let table = settings.include_summary_tables.then(|| {
        summary_table(records, &settings.fiscal_year, &filter).rounded(&settings.rounding)
    });

    debug!("Rolled up scope {}", label);
    ScopeRollup {
        label,
        kpi,
        summary_table: table,
    }
}

/// Build a report from a snapshot.
///
/// Technology scopes are independent and run on the blocking pool.
pub async fn build_report(
    records: Arc<Vec<ProjectRecord>>,
    settings: &ReportSettings,
) -> Result<RollupReport> {
    let scope = &settings.fiscal_year;
    let filter = &settings.filter;
    let rounding = &settings.rounding;

    info!("Building rollup for {} ({})", scope, filter);

    let handles = technology_scopes(filter).into_iter().map(|technology| {
        let records = Arc::clone(&records);
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || rollup_scope(&records, &settings, technology))
    });
    let scopes = try_join_all(handles)
        .await
        .context("Scope rollup task failed")?;

    let selection = compare(&records, scope, filter, settings.window).rounded(rounding);
    let windows: Vec<WindowComparison> = TimeWindow::standard()
        .into_iter()
        .map(|window| compare(&records, scope, filter, window))
        .collect();

    let series = settings.include_series.then(|| {
        let monthly = period_series(&records, scope, filter, Granularity::Monthly);
        let cumulative = cumulative_series(&monthly);
        TrendSeries {
            cumulative: round_all(cumulative, rounding),
            monthly: round_all(monthly, rounding),
            quarterly: round_all(
                period_series(&records, scope, filter, Granularity::Quarterly),
                rounding,
            ),
            half_yearly: round_all(
                period_series(&records, scope, filter, Granularity::HalfYearly),
                rounding,
            ),
        }
    });

    let data_quality = DataQuality {
        duplicates: find_duplicates(&records),
        incomplete: find_incomplete_projects(&records, scope, IdentityScope::CrossImport),
        rejected: rejected_records(&records, scope),
        undecodable: Vec::new(),
    };

    let report = RollupReport {
        metadata: ReportMetadata {
            fiscal_year: scope.to_string(),
            generated_at: Utc::now(),
            source: settings.source.clone(),
            filter: filter.to_string(),
            rounding: *rounding,
            status_counts: status_counts(&records, scope),
        },
        scopes,
        selection,
        windows: round_all(windows, rounding),
        series,
        technology_split: round_all(technology_split(&records, scope, filter), rounding),
        business_model_split: round_all(business_model_split(&records, scope, filter), rounding),
        section_subtotals: round_all(section_subtotals(&records, scope, filter), rounding),
        critical_projects: round_all(
            critical_projects(&records, scope, filter, settings.critical_limit),
            rounding,
        ),
        data_quality,
    };

    info!(
        "Rollup complete: {} scope(s), {} critical project(s)",
        report.scopes.len(),
        report.critical_projects.len()
    );
    Ok(report)
}
