//! Variant by business model summary table.
//!
//! Each variant gets one row per standard business model (PPA, Merchant,
//! Group) and a total row. The total row covers every included record of
//! the variant that passes the filter, so non-standard models show up
//! there only.

use crate::engine::aggregate::RecordFilter;
use crate::engine::derive::{derive_row, DerivedRow};
use crate::engine::validate::is_aggregatable;
use crate::models::{FiscalYear, Month, ProjectRecord, ProjectType, StatusVariant};
use serde::Serialize;

/// Every period column of one summary row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodColumns {
    pub months: [f64; 12],
    pub quarters: [f64; 4],
    pub halves: [f64; 2],
    pub cumulative_to_date: f64,
    /// Yearly total, capacity for Plan/Rephase and energized sum for Actual.
    pub total: f64,
}

impl PeriodColumns {
    fn add(&mut self, record: &ProjectRecord, derived: &DerivedRow) {
        for month in Month::ALL {
            self.months[month.index()] += record.months.value(month);
        }
        for (slot, value) in self.quarters.iter_mut().zip(derived.quarter_sums) {
            *slot += value;
        }
        self.halves[0] += derived.quarter_sums[0] + derived.quarter_sums[1];
        self.halves[1] += derived.quarter_sums[2] + derived.quarter_sums[3];
        self.cumulative_to_date += derived.cumulative_to_date;
        self.total += derived.row_total;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub variant: StatusVariant,
    /// `None` on the variant's total row.
    pub business_model: Option<ProjectType>,
    pub columns: PeriodColumns,
}

impl SummaryRow {
    pub fn label(&self) -> String {
        match &self.business_model {
            Some(model) => format!("{} {}", self.variant, model),
            None => format!("{} Total", self.variant),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub scope_label: String,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn total_row(&self, variant: StatusVariant) -> Option<&SummaryRow> {
        self.rows
            .iter()
            .find(|row| row.variant == variant && row.business_model.is_none())
    }
}

/// Build the summary table for the records a filter selects. The table is
/// labelled by the filter's technology, or "Overall" without one.
pub fn summary_table(
    records: &[ProjectRecord],
    scope: &FiscalYear,
    filter: &RecordFilter,
) -> SummaryTable {
    let scope_label = filter
        .technology
        .map(|t| t.to_string())
        .unwrap_or_else(|| "Overall".to_string());

    let selected: Vec<(&ProjectRecord, DerivedRow)> = records
        .iter()
        .filter(|r| is_aggregatable(r, scope) && filter.matches(r))
        .map(|r| (r, derive_row(r)))
        .collect();

    let mut rows = Vec::with_capacity(StatusVariant::ALL.len() * (ProjectType::STANDARD.len() + 1));

    for variant in StatusVariant::ALL {
        let mut total = PeriodColumns::default();
        let mut by_model: Vec<PeriodColumns> = vec![PeriodColumns::default(); ProjectType::STANDARD.len()];

        for (record, derived) in selected.iter().filter(|(r, _)| r.status == variant) {
            total.add(record, derived);
            if let Some(pos) = ProjectType::STANDARD
                .iter()
                .position(|model| *model == record.project_type)
            {
                by_model[pos].add(record, derived);
            }
        }

        for (model, columns) in ProjectType::STANDARD.into_iter().zip(by_model) {
            rows.push(SummaryRow {
                variant,
                business_model: Some(model),
                columns,
            });
        }
        rows.push(SummaryRow {
            variant,
            business_model: None,
            columns: total,
        });
    }

    SummaryTable { scope_label, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::kpi::kpi_summary;
    use crate::models::Technology;

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
        );
        let merchant = ProjectRecord::new(
            "FY_25-26",
            "AGEL Merchant",
            "AGE24L",
            "A",
            "Khavda Solar",
            ProjectType::Merchant,
            StatusVariant::Plan,
            Some(50.0),
        );
        let captive = ProjectRecord::new(
            "FY_25-26",
            "Captive Wind",
            "AGE30L",
            "C",
            "Gujarat Wind",
            ProjectType::from("Captive"),
            StatusVariant::Plan,
            Some(30.0),
        );
        vec![
            khavda.clone().with_month(Month::Nov, 425.0),
            khavda
                .as_variant(StatusVariant::Actual)
                .with_month(Month::Dec, 100.0)
                .with_month(Month::Jan, 150.0),
            merchant.clone().with_month(Month::May, 50.0),
            merchant.as_variant(StatusVariant::Actual).with_month(Month::May, 50.0),
            captive.clone().with_month(Month::Oct, 30.0),
        ]
    }

    #[test]
    fn test_row_layout() {
        let table = summary_table(&records(), &scope(), &RecordFilter::all());
        assert_eq!(table.scope_label, "Overall");
        assert_eq!(table.rows.len(), 12);
        assert_eq!(table.rows[0].label(), "Plan PPA");
        assert_eq!(table.rows[3].label(), "Plan Total");
        assert_eq!(table.rows[11].label(), "Actual Total");
    }

    #[test]
    fn test_columns_for_plan_rows() {
        let table = summary_table(&records(), &scope(), &RecordFilter::all());
        let ppa = &table.rows[0].columns;
        assert_eq!(ppa.months[Month::Nov.index()], 425.0);
        assert_eq!(ppa.quarters, [0.0, 0.0, 425.0, 0.0]);
        assert_eq!(ppa.halves, [0.0, 425.0]);
        assert_eq!(ppa.cumulative_to_date, 425.0);
        assert_eq!(ppa.total, 425.0);

        let merchant = &table.rows[1].columns;
        assert_eq!(merchant.quarters[0], 50.0);
        assert_eq!(merchant.cumulative_to_date, 50.0);

        let group = &table.rows[2].columns;
        assert_eq!(*group, PeriodColumns::default());

        // Non-standard models land only in the total row.
        let total = table.total_row(StatusVariant::Plan).unwrap();
        assert_eq!(total.columns.total, 505.0);
        assert_eq!(total.columns.months[Month::Oct.index()], 30.0);
    }

    #[test]
    fn test_total_row_matches_kpi() {
        let records = records();
        let table = summary_table(&records, &scope(), &RecordFilter::all());
        let kpi = kpi_summary(&records, &scope(), &RecordFilter::all());

        assert_eq!(table.total_row(StatusVariant::Plan).unwrap().columns.total, kpi.plan_total);
        assert_eq!(table.total_row(StatusVariant::Actual).unwrap().columns.total, kpi.actual_total);
        assert_eq!(table.total_row(StatusVariant::Rephase).unwrap().columns.total, 0.0);
    }

    #[test]
    fn test_technology_scoped_table() {
        let table = summary_table(&records(), &scope(), &RecordFilter::technology(Technology::Wind));
        assert_eq!(table.scope_label, "Wind");
        let plan = table.total_row(StatusVariant::Plan).unwrap();
        assert_eq!(plan.columns.total, 30.0);
        let actual = table.total_row(StatusVariant::Actual).unwrap();
        assert_eq!(actual.columns.total, 0.0);
    }

    #[test]
    fn test_narrow_filter_applies_to_every_row() {
        let records = records();
        let filter = RecordFilter::all().with_section("C");
        let table = summary_table(&records, &scope(), &filter);
        let kpi = kpi_summary(&records, &scope(), &filter);

        assert_eq!(table.scope_label, "Overall");
        let plan = table.total_row(StatusVariant::Plan).unwrap();
        assert_eq!(plan.columns.total, 30.0);
        assert_eq!(plan.columns.total, kpi.plan_total);
        assert_eq!(table.rows[0].columns, PeriodColumns::default());

        let merchant = RecordFilter::all().with_business_model(ProjectType::Merchant);
        let table = summary_table(&records, &scope(), &merchant);
        let actual = table.total_row(StatusVariant::Actual).unwrap();
        assert_eq!(actual.columns.total, 50.0);
        assert_eq!(table.rows[8].columns.total, 0.0);
        assert_eq!(table.rows[9].label(), "Actual Merchant");
        assert_eq!(table.rows[9].columns.total, 50.0);
    }
}
