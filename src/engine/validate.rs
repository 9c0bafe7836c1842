//! Record validation and eligibility.
//!
//! A malformed record is dropped from every aggregate and reported; it
//! never aborts the computation for the rest of the snapshot.

use crate::error::RecordError;
use crate::models::{FiscalYear, ProjectRecord};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A record the engine refused to aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position in the input snapshot.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub project_name: String,
    pub reason: String,
}

/// Check that a record has its identity fields and only finite numbers.
pub fn validate_record(record: &ProjectRecord) -> Result<(), RecordError> {
    let required = [
        ("fiscalYear", &record.fiscal_year),
        ("projectName", &record.project_name),
        ("specialPurposeVehicle", &record.special_purpose_vehicle),
        ("section", &record.section),
        ("category", &record.category),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(RecordError::MissingField(field));
        }
    }

    if matches!(record.rated_capacity, Some(c) if !c.is_finite()) {
        return Err(RecordError::NonFiniteValue("ratedCapacity"));
    }

    for (month, value) in record.months.iter() {
        if matches!(value, Some(v) if !v.is_finite()) {
            return Err(RecordError::non_finite_month(month));
        }
    }

    Ok(())
}

/// Live (not soft-deleted), in scope and well-formed.
pub fn is_live(record: &ProjectRecord, scope: &FiscalYear) -> bool {
    !record.is_deleted && scope.contains(record) && validate_record(record).is_ok()
}

/// Live and flagged for inclusion in totals.
pub fn is_aggregatable(record: &ProjectRecord, scope: &FiscalYear) -> bool {
    record.included_in_total && is_live(record, scope)
}

/// Collect every non-deleted record of the scope that fails validation.
///
/// Records with an empty fiscal year cannot be attributed to a scope, so
/// they are reported under every scope that asks.
pub fn rejected_records(records: &[ProjectRecord], scope: &FiscalYear) -> Vec<RejectedRecord> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_deleted)
        .filter(|(_, r)| scope.contains(r) || r.fiscal_year.trim().is_empty())
        .filter_map(|(index, record)| {
            validate_record(record).err().map(|e| {
                warn!(
                    "Rejecting record {} ({}): {}",
                    index,
                    display_name(record),
                    e
                );
                RejectedRecord {
                    index,
                    id: record.id,
                    project_name: record.project_name.clone(),
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

fn display_name(record: &ProjectRecord) -> &str {
    if record.project_name.trim().is_empty() {
        "<unnamed>"
    } else {
        &record.project_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Month, ProjectType, StatusVariant};

    fn valid() -> ProjectRecord {
        ProjectRecord::new(
            "FY_25-26",
            "Khavda Wind 1",
            "AWE5L",
            "B",
            "Khavda Wind",
            ProjectType::Group,
            StatusVariant::Plan,
            Some(100.0),
        )
    }

    #[test]
    fn test_valid_record_passes() {
        assert_eq!(validate_record(&valid()), Ok(()));
    }

    #[test]
    fn test_missing_identity_fields() {
        let mut record = valid();
        record.project_name = "   ".to_string();
        assert_eq!(
            validate_record(&record),
            Err(RecordError::MissingField("projectName"))
        );

        let mut record = valid();
        record.special_purpose_vehicle.clear();
        assert_eq!(
            validate_record(&record),
            Err(RecordError::MissingField("specialPurposeVehicle"))
        );
    }

    #[test]
    fn test_non_finite_values() {
        let mut record = valid();
        record.rated_capacity = Some(f64::NAN);
        assert_eq!(
            validate_record(&record),
            Err(RecordError::NonFiniteValue("ratedCapacity"))
        );

        let record = valid().with_month(Month::Sep, f64::INFINITY);
        assert_eq!(
            validate_record(&record),
            Err(RecordError::NonFiniteValue("sep"))
        );
    }

    #[test]
    fn test_eligibility_flags() {
        let scope = FiscalYear::new("FY_25-26");
        let record = valid();
        assert!(is_aggregatable(&record, &scope));

        let mut excluded = valid();
        excluded.included_in_total = false;
        assert!(is_live(&excluded, &scope));
        assert!(!is_aggregatable(&excluded, &scope));

        let mut deleted = valid();
        deleted.is_deleted = true;
        assert!(!is_live(&deleted, &scope));

        assert!(!is_live(&record, &FiscalYear::new("FY_24-25")));
    }

    #[test]
    fn test_rejected_records_report_position() {
        let scope = FiscalYear::new("FY_25-26");
        let mut broken = valid();
        broken.category.clear();
        let mut deleted_broken = broken.clone();
        deleted_broken.is_deleted = true;

        let rejected = rejected_records(&[valid(), broken, deleted_broken], &scope);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].index, 1);
        assert!(rejected[0].reason.contains("category"));
    }
}
