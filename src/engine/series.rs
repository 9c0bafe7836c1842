//! Trend series across the fiscal year.

use crate::engine::aggregate::{compare, RecordFilter, TimeWindow};
use crate::models::{FiscalYear, Half, Month, ProjectRecord, Quarter};
use serde::Serialize;

/// Period granularity of a trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Granularity {
    Monthly,
    Quarterly,
    HalfYearly,
}

impl Granularity {
    pub fn windows(&self) -> Vec<TimeWindow> {
        match self {
            Granularity::Monthly => Month::ALL.into_iter().map(TimeWindow::Month).collect(),
            Granularity::Quarterly => Quarter::ALL.into_iter().map(TimeWindow::Quarter).collect(),
            Granularity::HalfYearly => Half::ALL.into_iter().map(TimeWindow::Half).collect(),
        }
    }
}

/// One period of a trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub window: TimeWindow,
    pub plan: f64,
    pub rephase: f64,
    pub actual: f64,
    /// Actual minus plan.
    pub deviation: f64,
}

/// Running totals up to and including a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativePoint {
    pub label: String,
    pub plan: f64,
    pub actual: f64,
}

pub fn period_series(
    records: &[ProjectRecord],
    scope: &FiscalYear,
    filter: &RecordFilter,
    granularity: Granularity,
) -> Vec<SeriesPoint> {
    granularity
        .windows()
        .into_iter()
        .map(|window| {
            let comparison = compare(records, scope, filter, window);
            let label = match window {
                TimeWindow::Month(month) => scope.month_label(month),
                other => other.to_string(),
            };
            SeriesPoint {
                label,
                window,
                plan: comparison.plan,
                rephase: comparison.rephase,
                actual: comparison.actual,
                deviation: comparison.deviation,
            }
        })
        .collect()
}

pub fn cumulative_series(points: &[SeriesPoint]) -> Vec<CumulativePoint> {
    let mut plan = 0.0;
    let mut actual = 0.0;

    points
        .iter()
        .map(|point| {
            plan += point.plan;
            actual += point.actual;
            CumulativePoint {
                label: point.label.clone(),
                plan,
                actual,
            }
        })
        .collect()
}
