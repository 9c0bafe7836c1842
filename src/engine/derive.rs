//! Per-record derivation.
//!
//! Derived figures are never stored: they are recomputed from the twelve
//! monthly values every time a record is read, so a partial edit can never
//! leave a stale quarter or total behind.

use crate::models::{Half, Month, ProjectRecord, Quarter, StatusVariant};
use serde::Serialize;

/// Months counted into `cumulative_to_date` (Apr..Nov).
pub const CUMULATIVE_CUTOFF_MONTHS: usize = 8;

/// Figures derived from a single record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedRow {
    /// Q1..Q4 sums of the monthly values.
    pub quarter_sums: [f64; 4],
    /// Sum of the first eight fiscal months.
    pub cumulative_to_date: f64,
    /// Rated capacity for Plan/Rephase, energized total for Actual.
    pub row_total: f64,
}

impl DerivedRow {
    pub fn quarter(&self, quarter: Quarter) -> f64 {
        self.quarter_sums[quarter.index()]
    }

    pub fn half(&self, half: Half) -> f64 {
        let [first, second] = half.quarters();
        self.quarter(first) + self.quarter(second)
    }

    /// Sum of all four quarters, independent of the variant.
    pub fn phased_total(&self) -> f64 {
        self.quarter_sums.iter().sum()
    }
}

/// Derive quarter sums, the cumulative figure and the row total.
pub fn derive_row(record: &ProjectRecord) -> DerivedRow {
    let mut quarter_sums = [0.0; 4];
    let mut cumulative_to_date = 0.0;

    for month in Month::ALL {
        let value = record.months.value(month);
        quarter_sums[month.quarter().index()] += value;
        if month.index() < CUMULATIVE_CUTOFF_MONTHS {
            cumulative_to_date += value;
        }
    }

    let row_total = match record.status {
        StatusVariant::Plan | StatusVariant::Rephase => record.rated_capacity.unwrap_or(0.0),
        StatusVariant::Actual => record.months.total(),
    };

    DerivedRow {
        quarter_sums,
        cumulative_to_date,
        row_total,
    }
}
