//! Headline KPI figures.
//!
//! Totals are taken from the same `aggregate` path the dimensional views
//! use, so the headline numbers cannot drift from the detailed ones.

use crate::engine::aggregate::{achievement, aggregate, RecordFilter, TimeWindow};
use crate::engine::identity::{distinct_identities, IdentityScope};
use crate::engine::validate::{is_aggregatable, is_live};
use crate::models::{FiscalYear, ProjectRecord, StatusVariant};
use serde::Serialize;
use tracing::debug;

/// Headline numbers for one fiscal year and filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub fiscal_year: String,
    pub plan_total: f64,
    pub rephase_total: f64,
    pub actual_total: f64,
    pub achievement: f64,
    /// Distinct projects among live, included Plan rows.
    pub project_count: usize,
}

pub fn kpi_summary(
    records: &[ProjectRecord],
    scope: &FiscalYear,
    filter: &RecordFilter,
) -> KpiSummary {
    let yearly = |variant| aggregate(records, scope, filter, TimeWindow::Yearly, variant);
    let plan_total = yearly(StatusVariant::Plan);
    let rephase_total = yearly(StatusVariant::Rephase);
    let actual_total = yearly(StatusVariant::Actual);

    // Plan rows only: counting every variant would triple-count.
    let project_count = distinct_identities(
        records
            .iter()
            .filter(|r| r.status == StatusVariant::Plan)
            .filter(|r| is_aggregatable(r, scope) && filter.matches(r)),
        IdentityScope::CrossImport,
    )
    .len();

    debug!(
        "KPI {} [{}]: plan={} actual={} projects={}",
        scope, filter, plan_total, actual_total, project_count
    );

    KpiSummary {
        fiscal_year: scope.to_string(),
        plan_total,
        rephase_total,
        actual_total,
        achievement: achievement(plan_total, actual_total),
        project_count,
    }
}

/// Live row counts per variant, regardless of the inclusion flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub plan: usize,
    pub rephase: usize,
    pub actual: usize,
}

pub fn status_counts(records: &[ProjectRecord], scope: &FiscalYear) -> StatusCounts {
    let mut counts = StatusCounts::default();

    for record in records.iter().filter(|r| is_live(r, scope)) {
        counts.total += 1;
        match record.status {
            StatusVariant::Plan => counts.plan += 1,
            StatusVariant::Rephase => counts.rephase += 1,
            StatusVariant::Actual => counts.actual += 1,
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Month, ProjectType, Technology};

    fn scope() -> FiscalYear {
        FiscalYear::new("FY_25-26")
    }

    fn records() -> Vec<ProjectRecord> {
        let khavda = ProjectRecord::new(
            "FY_25-26",
            "Khavda Phase 1",
            "AGE23L",
            "A",
            "Khavda Solar",
            ProjectType::Ppa,
            StatusVariant::Plan,
            Some(425.0),
        )
        .with_month(Month::Nov, 425.0);
        let wind = ProjectRecord::new(
            "FY_25-26",
            "Khavda Wind 1",
            "AWE5L",
            "B",
            "Khavda Wind",
            ProjectType::Group,
            StatusVariant::Plan,
            Some(100.0),
        )
        .with_month(Month::Jul, 100.0);
        let mut excluded = ProjectRecord::new(
            "FY_25-26",
            "Mundra Wind 76MW",
            "MWL",
            "C",
            "Mundra Wind",
            ProjectType::Ppa,
            StatusVariant::Plan,
            Some(76.0),
        );
        excluded.included_in_total = false;

        vec![
            khavda.clone(),
            khavda
                .as_variant(StatusVariant::Rephase)
                .with_month(Month::Dec, 425.0),
            khavda
                .as_variant(StatusVariant::Actual)
                .with_month(Month::Dec, 100.0)
                .with_month(Month::Jan, 150.0)
                .with_month(Month::Feb, 175.0),
            wind.clone(),
            wind.as_variant(StatusVariant::Actual).with_month(Month::Aug, 30.0),
            excluded,
        ]
    }

    #[test]
    fn test_kpi_summary_overall() {
        let kpi = kpi_summary(&records(), &scope(), &RecordFilter::all());
        assert_eq!(kpi.fiscal_year, "FY_25-26");
        assert_eq!(kpi.plan_total, 525.0);
        assert_eq!(kpi.rephase_total, 425.0);
        assert_eq!(kpi.actual_total, 455.0);
        assert_eq!(kpi.project_count, 2);
        assert!((kpi.achievement - 455.0 / 525.0 * 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_kpi_matches_dimensional_aggregate() {
        let records = records();
        for filter in [
            RecordFilter::all(),
            RecordFilter::technology(Technology::Solar),
            RecordFilter::technology(Technology::Wind),
        ] {
            let kpi = kpi_summary(&records, &scope(), &filter);
            assert_eq!(
                kpi.plan_total,
                aggregate(&records, &scope(), &filter, TimeWindow::Yearly, StatusVariant::Plan)
            );
            assert_eq!(
                kpi.actual_total,
                aggregate(&records, &scope(), &filter, TimeWindow::Yearly, StatusVariant::Actual)
            );
        }
    }

    #[test]
    fn test_project_count_ignores_serial_reassignment() {
        let mut records = records();
        let mut renumbered = records[0].clone().with_serial(7);
        renumbered.rated_capacity = Some(0.0);
        records[0] = records[0].clone().with_serial(1);
        records.push(renumbered);

        let kpi = kpi_summary(&records, &scope(), &RecordFilter::all());
        assert_eq!(kpi.project_count, 2);
    }

    #[test]
    fn test_empty_scope_is_all_zero() {
        let kpi = kpi_summary(&records(), &FiscalYear::new("FY_30-31"), &RecordFilter::all());
        assert_eq!(kpi.plan_total, 0.0);
        assert_eq!(kpi.achievement, 0.0);
        assert_eq!(kpi.project_count, 0);
    }

    #[test]
    fn test_status_counts_include_excluded_rows() {
        let counts = status_counts(&records(), &scope());
        assert_eq!(counts.total, 6);
        assert_eq!(counts.plan, 3);
        assert_eq!(counts.rephase, 1);
        assert_eq!(counts.actual, 2);
    }
}
