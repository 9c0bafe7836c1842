//! Portfolio breakdowns: capacity shares, section subtotals and the most
//! critical projects.

use crate::engine::aggregate::{achievement, aggregate, RecordFilter, TimeWindow};
use crate::engine::derive::derive_row;
use crate::engine::identity::{IdentityKey, IdentityScope};
use crate::engine::validate::is_aggregatable;
use crate::models::{FiscalYear, ProjectRecord, ProjectType, StatusVariant, Technology};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// One labelled slice of planned capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub label: String,
    pub value: f64,
    /// Percentage of the split's total.
    pub percent: f64,
}

fn shares(slices: Vec<(String, f64)>) -> Vec<Share> {
    let total: f64 = slices.iter().map(|(_, value)| value).sum();
    slices
        .into_iter()
        .map(|(label, value)| Share {
            percent: if total == 0.0 { 0.0 } else { value / total * 100.0 },
            label,
            value,
        })
        .collect()
}

/// Planned capacity by technology. Empty slices are omitted.
pub fn technology_split(
    records: &[ProjectRecord],
    scope: &FiscalYear,
    filter: &RecordFilter,
) -> Vec<Share> {
    let slices = [Technology::Solar, Technology::Wind, Technology::Other]
        .into_iter()
        .filter(|t| filter.technology.map_or(true, |wanted| wanted == *t))
        .filter_map(|technology| {
            let narrowed = RecordFilter {
                technology: Some(technology),
                ..filter.clone()
            };
            let value = aggregate(records, scope, &narrowed, TimeWindow::Yearly, StatusVariant::Plan);
            (value != 0.0).then(|| (technology.to_string(), value))
        })
        .collect();
    shares(slices)
}

/// Planned capacity by business model. Non-standard models are grouped
/// under their own label.
pub fn business_model_split(
    records: &[ProjectRecord],
    scope: &FiscalYear,
    filter: &RecordFilter,
) -> Vec<Share> {
    let mut totals: BTreeMap<ProjectType, f64> = BTreeMap::new();

    for record in records
        .iter()
        .filter(|r| r.status == StatusVariant::Plan)
        .filter(|r| is_aggregatable(r, scope) && filter.matches(r))
    {
        *totals.entry(record.project_type.clone()).or_default() += derive_row(record).row_total;
    }

    let slices = totals
        .into_iter()
        .filter(|(_, value)| *value != 0.0)
        .map(|(model, value)| {
            let label = match model {
                ProjectType::Other(ref s) if s.is_empty() => "Unspecified".to_string(),
                other => other.to_string(),
            };
            (label, value)
        })
        .collect();
    shares(slices)
}

/// Yearly plan, rephase and actual for one section of one technology.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSubtotal {
    pub technology: Technology,
    pub section: String,
    pub plan: f64,
    pub rephase: f64,
    pub actual: f64,
    pub achievement: f64,
}

/// Per-section subtotals, ordered by technology then section.
///
/// Only included records count, so a section whose projects are all
/// excluded from totals does not appear. The subtotals of one technology
/// add up to its yearly aggregate.
pub fn section_subtotals(
    records: &[ProjectRecord],
    scope: &FiscalYear,
    filter: &RecordFilter,
) -> Vec<SectionSubtotal> {
    let mut totals: BTreeMap<(Technology, String), [f64; 3]> = BTreeMap::new();

    for record in records
        .iter()
        .filter(|r| is_aggregatable(r, scope) && filter.matches(r))
    {
        let key = (record.technology(), record.section.trim().to_string());
        let slot = match record.status {
            StatusVariant::Plan => 0,
            StatusVariant::Rephase => 1,
            StatusVariant::Actual => 2,
        };
        totals.entry(key).or_default()[slot] += derive_row(record).row_total;
    }

    totals
        .into_iter()
        .map(|((technology, section), [plan, rephase, actual])| SectionSubtotal {
            technology,
            section,
            plan,
            rephase,
            actual,
            achievement: achievement(plan, actual),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeliveryStatus {
    Ahead,
    Behind,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Ahead => write!(f, "Ahead"),
            DeliveryStatus::Behind => write!(f, "Behind"),
        }
    }
}

/// Yearly plan against yearly actual for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectDeviation {
    pub key: IdentityKey,
    pub plan: f64,
    pub actual: f64,
    /// Actual minus plan.
    pub deviation: f64,
    pub status: DeliveryStatus,
}

/// Planned projects ordered from furthest behind, at most `limit` of them.
pub fn critical_projects(
    records: &[ProjectRecord],
    scope: &FiscalYear,
    filter: &RecordFilter,
    limit: usize,
) -> Vec<ProjectDeviation> {
    let mut totals: BTreeMap<IdentityKey, (Option<f64>, f64)> = BTreeMap::new();

    for record in records
        .iter()
        .filter(|r| is_aggregatable(r, scope) && filter.matches(r))
    {
        let key = IdentityKey::of(record, IdentityScope::CrossImport);
        let row_total = derive_row(record).row_total;
        let entry = totals.entry(key).or_insert((None, 0.0));
        match record.status {
            StatusVariant::Plan => *entry.0.get_or_insert(0.0) += row_total,
            StatusVariant::Actual => entry.1 += row_total,
            StatusVariant::Rephase => {}
        }
    }

    let mut deviations: Vec<ProjectDeviation> = totals
        .into_iter()
        .filter_map(|(key, (plan, actual))| plan.map(|plan| (key, plan, actual)))
        .map(|(key, plan, actual)| {
            let deviation = actual - plan;
            ProjectDeviation {
                key,
                plan,
                actual,
                deviation,
                status: if deviation >= 0.0 {
                    DeliveryStatus::Ahead
                } else {
                    DeliveryStatus::Behind
                },
            }
        })
        .collect();

    // Stable sort keeps identity order among equal deviations.
    deviations.sort_by(|a, b| a.deviation.total_cmp(&b.deviation));
    deviations.truncate(limit);
    deviations
}
