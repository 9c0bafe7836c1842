//! Rollup engine: per-record derivation, identity and deduplication,
//! dimensional aggregation and the summaries built on top of them.
//!
//! Every entry point takes the fiscal-year scope explicitly and works on a
//! borrowed snapshot of records. Nothing here mutates or rounds.

pub mod aggregate;
pub mod breakdown;
pub mod derive;
pub mod identity;
pub mod kpi;
pub mod series;
pub mod summary_table;
pub mod validate;

pub use aggregate::{achievement, aggregate, compare, RecordFilter, TimeWindow, WindowComparison};
pub use breakdown::{
    business_model_split, critical_projects, section_subtotals, technology_split, DeliveryStatus,
    ProjectDeviation, SectionSubtotal, Share,
};
pub use derive::{derive_row, DerivedRow, CUMULATIVE_CUTOFF_MONTHS};
pub use identity::{
    distinct_identities, find_duplicates, find_incomplete_projects, DuplicateGroup, DuplicateKey,
    IdentityKey, IdentityScope, IncompleteProject,
};
pub use kpi::{kpi_summary, status_counts, KpiSummary, StatusCounts};
pub use series::{cumulative_series, period_series, CumulativePoint, Granularity, SeriesPoint};
pub use summary_table::{summary_table, PeriodColumns, SummaryRow, SummaryTable};
pub use validate::{is_aggregatable, is_live, rejected_records, validate_record, RejectedRecord};
