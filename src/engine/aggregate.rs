//! Dimensional aggregation.
//!
//! Every aggregate is a single scan over the snapshot: select the live,
//! included records of one variant that match a filter, derive each row,
//! and sum the value the time window selects. Sums keep full precision;
//! rounding is left to the report layer.

use crate::engine::derive::{derive_row, DerivedRow};
use crate::engine::validate::is_aggregatable;
use crate::models::{FiscalYear, Half, Month, ProjectRecord, ProjectType, Quarter, StatusVariant, Technology};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Composable record filter. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub technology: Option<Technology>,
    pub section: Option<String>,
    pub business_model: Option<ProjectType>,
    /// Exact category label, e.g. "Khavda Solar".
    pub category: Option<String>,
    pub project_name: Option<String>,
    pub spv: Option<String>,
}

impl RecordFilter {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn technology(technology: Technology) -> Self {
        Self {
            technology: Some(technology),
            ..Self::default()
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_business_model(mut self, model: ProjectType) -> Self {
        self.business_model = Some(model);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_project(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = Some(project_name.into());
        self
    }

    pub fn with_spv(mut self, spv: impl Into<String>) -> Self {
        self.spv = Some(spv.into());
        self
    }

    pub fn matches(&self, record: &ProjectRecord) -> bool {
        if let Some(technology) = self.technology {
            if record.technology() != technology {
                return false;
            }
        }
        if let Some(ref section) = self.section {
            if record.section.trim() != section.trim() {
                return false;
            }
        }
        if let Some(ref model) = self.business_model {
            if &record.project_type != model {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if record.category.trim() != category.trim() {
                return false;
            }
        }
        if let Some(ref name) = self.project_name {
            if record.project_name.trim() != name.trim() {
                return false;
            }
        }
        if let Some(ref spv) = self.spv {
            if record.special_purpose_vehicle.trim() != spv.trim() {
                return false;
            }
        }
        true
    }

    pub fn is_unfiltered(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for RecordFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(technology) = self.technology {
            parts.push(format!("technology={}", technology));
        }
        if let Some(ref section) = self.section {
            parts.push(format!("section={}", section));
        }
        if let Some(ref model) = self.business_model {
            parts.push(format!("model={}", model));
        }
        if let Some(ref category) = self.category {
            parts.push(format!("category={}", category));
        }
        if let Some(ref name) = self.project_name {
            parts.push(format!("project={}", name));
        }
        if let Some(ref spv) = self.spv {
            parts.push(format!("spv={}", spv));
        }

        if parts.is_empty() {
            write!(f, "all projects")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Time window selector, from the whole year down to a single month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    Yearly,
    Half(Half),
    Quarter(Quarter),
    Month(Month),
    /// Apr..Nov reporting cutoff.
    CumulativeToDate,
}

impl TimeWindow {
    /// Year, halves, quarters and months in reporting order.
    pub fn standard() -> Vec<TimeWindow> {
        let mut windows = vec![TimeWindow::Yearly];
        windows.extend(Half::ALL.into_iter().map(TimeWindow::Half));
        windows.extend(Quarter::ALL.into_iter().map(TimeWindow::Quarter));
        windows.push(TimeWindow::CumulativeToDate);
        windows
    }

    /// The value a window selects from one derived record.
    pub fn select(&self, record: &ProjectRecord, derived: &DerivedRow) -> f64 {
        match self {
            TimeWindow::Yearly => derived.row_total,
            TimeWindow::Half(half) => derived.half(*half),
            TimeWindow::Quarter(quarter) => derived.quarter(*quarter),
            TimeWindow::Month(month) => record.months.value(*month),
            TimeWindow::CumulativeToDate => derived.cumulative_to_date,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeWindow::Yearly => write!(f, "Full FY"),
            TimeWindow::Half(half) => write!(f, "{}", half),
            TimeWindow::Quarter(quarter) => write!(f, "{}", quarter),
            TimeWindow::Month(month) => write!(f, "{}", month),
            TimeWindow::CumulativeToDate => write!(f, "Cumulative (Apr-Nov)"),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "yearly" | "year" | "fy" | "full" => Ok(TimeWindow::Yearly),
            "h1" => Ok(TimeWindow::Half(Half::H1)),
            "h2" => Ok(TimeWindow::Half(Half::H2)),
            "q1" => Ok(TimeWindow::Quarter(Quarter::Q1)),
            "q2" => Ok(TimeWindow::Quarter(Quarter::Q2)),
            "q3" => Ok(TimeWindow::Quarter(Quarter::Q3)),
            "q4" => Ok(TimeWindow::Quarter(Quarter::Q4)),
            "cumulative" | "ytd" | "to-date" => Ok(TimeWindow::CumulativeToDate),
            other => other
                .parse::<Month>()
                .map(TimeWindow::Month)
                .map_err(|_| format!("unknown time window: {:?}", s)),
        }
    }
}

/// Sum of one variant over one window for the records matching `filter`.
///
/// Yearly sums rated capacity for Plan/Rephase and the energized monthly
/// total for Actual; every other window sums phased monthly values.
pub fn aggregate(
    records: &[ProjectRecord],
    scope: &FiscalYear,
    filter: &RecordFilter,
    window: TimeWindow,
    variant: StatusVariant,
) -> f64 {
    records
        .iter()
        .filter(|r| r.status == variant)
        .filter(|r| is_aggregatable(r, scope) && filter.matches(r))
        .map(|r| window.select(r, &derive_row(r)))
        .sum()
}

/// Actual as a percentage of plan; zero when there is no plan.
pub fn achievement(plan_sum: f64, actual_sum: f64) -> f64 {
    if plan_sum == 0.0 || !plan_sum.is_finite() {
        return 0.0;
    }
    let ratio = actual_sum / plan_sum * 100.0;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// Plan, rephase and actual side by side for one filter and window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowComparison {
    pub window: TimeWindow,
    pub plan: f64,
    pub rephase: f64,
    pub actual: f64,
    /// Actual minus plan.
    pub deviation: f64,
    pub achievement: f64,
}

pub fn compare(
    records: &[ProjectRecord],
    scope: &FiscalYear,
    filter: &RecordFilter,
    window: TimeWindow,
) -> WindowComparison {
    let plan = aggregate(records, scope, filter, window, StatusVariant::Plan);
    let rephase = aggregate(records, scope, filter, window, StatusVariant::Rephase);
    let actual = aggregate(records, scope, filter, window, StatusVariant::Actual);

    WindowComparison {
        window,
        plan,
        rephase,
        actual,
        deviation: actual - plan,
        achievement: achievement(plan, actual),
    }
}
