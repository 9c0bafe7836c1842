//! In-memory record store.
//!
//! Holds every record the surrounding application has imported, including
//! soft-deleted generations, and hands the engine live snapshots.

use crate::engine::derive::{derive_row, DerivedRow};
use crate::engine::identity::{IdentityKey, IdentityScope};
use crate::engine::validate::{is_live, RejectedRecord};
use crate::error::StoreError;
use crate::models::{FiscalYear, Month, ProjectRecord, ProjectType, StatusVariant};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Result of a bulk replacement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    /// Previously live rows that were soft-deleted.
    pub superseded: usize,
    /// Ids assigned to the new rows.
    pub inserted: Vec<u64>,
    /// Rows refused before anything was written.
    pub rejected: Vec<RejectedRecord>,
}

/// A single-field edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordEdit {
    /// Set or clear one phased month.
    Month(Month, Option<f64>),
    RatedCapacity(Option<f64>),
    IncludedInTotal(bool),
}

#[derive(Debug, Default)]
pub struct ProjectStore {
    records: Vec<ProjectRecord>,
    next_id: u64,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rows as they are, assigning ids to rows that have none.
    pub fn load(&mut self, records: impl IntoIterator<Item = ProjectRecord>) -> usize {
        let before = self.records.len();
        for mut record in records {
            match record.id {
                Some(id) => self.next_id = self.next_id.max(id),
                None => record.id = Some(self.allocate_id()),
            }
            self.records.push(record);
        }
        let loaded = self.records.len() - before;
        debug!("Loaded {} records into store", loaded);
        loaded
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Replace every live row of a fiscal year with a new batch.
    ///
    /// The batch is checked in full before anything changes. Rows without
    /// a fiscal year are stamped with `fiscal_year`; rows naming another
    /// year are refused. If nothing would remain, the store is untouched.
    pub fn replace_fiscal_year(
        &mut self,
        fiscal_year: &FiscalYear,
        batch: Vec<ProjectRecord>,
    ) -> Result<ImportOutcome, StoreError> {
        let mut accepted = Vec::with_capacity(batch.len());
        let mut rejected = Vec::new();

        for (index, mut record) in batch.into_iter().enumerate() {
            if record.fiscal_year.trim().is_empty() {
                record.fiscal_year = fiscal_year.to_string();
            }
            if !fiscal_year.contains(&record) {
                warn!(
                    "Refusing row {} ({}): belongs to {}, not {}",
                    index,
                    record.project_name,
                    record.fiscal_year.trim(),
                    fiscal_year
                );
                rejected.push(RejectedRecord {
                    index,
                    id: record.id,
                    project_name: record.project_name.clone(),
                    reason: format!("fiscal year {} does not match {}", record.fiscal_year.trim(), fiscal_year),
                });
                continue;
            }
            accepted.push(record);
        }

        if accepted.is_empty() {
            return Err(StoreError::EmptyReplacement(fiscal_year.to_string()));
        }

        let mut superseded = 0;
        for record in self
            .records
            .iter_mut()
            .filter(|r| !r.is_deleted && fiscal_year.contains(r))
        {
            record.is_deleted = true;
            superseded += 1;
        }

        let mut inserted = Vec::with_capacity(accepted.len());
        for mut record in accepted {
            let id = self.allocate_id();
            record.id = Some(id);
            record.is_deleted = false;
            self.records.push(record);
            inserted.push(id);
        }

        info!(
            "Replaced {}: {} rows superseded, {} inserted, {} refused",
            fiscal_year,
            superseded,
            inserted.len(),
            rejected.len()
        );

        Ok(ImportOutcome {
            superseded,
            inserted,
            rejected,
        })
    }

    /// Add a project by hand: one unphased row per status variant.
    pub fn manual_insert(
        &mut self,
        fiscal_year: &FiscalYear,
        identity: &IdentityKey,
        project_type: ProjectType,
        rated_capacity: Option<f64>,
    ) -> Result<Vec<u64>, StoreError> {
        if matches!(rated_capacity, Some(c) if !c.is_finite()) {
            return Err(StoreError::InvalidEdit("rated capacity must be finite".to_string()));
        }

        let wanted = IdentityKey {
            serial_number: None,
            ..identity.clone()
        };
        let already_live = self
            .records
            .iter()
            .filter(|r| is_live(r, fiscal_year))
            .any(|r| IdentityKey::of(r, IdentityScope::CrossImport) == wanted);
        if already_live {
            return Err(StoreError::AlreadyExists(identity.to_string()));
        }

        let serial_number = identity.serial_number.unwrap_or_else(|| {
            self.records
                .iter()
                .filter(|r| !r.is_deleted && fiscal_year.contains(r))
                .filter_map(|r| r.serial_number)
                .max()
                .unwrap_or(0)
                + 1
        });

        let template = ProjectRecord::new(
            fiscal_year.as_str(),
            identity.project_name.as_str(),
            identity.spv.as_str(),
            identity.section.as_str(),
            identity.category.as_str(),
            project_type,
            StatusVariant::Plan,
            rated_capacity,
        )
        .with_serial(serial_number);

        let mut ids = Vec::with_capacity(StatusVariant::ALL.len());
        for variant in StatusVariant::ALL {
            let mut record = template.as_variant(variant);
            let id = self.allocate_id();
            record.id = Some(id);
            self.records.push(record);
            ids.push(id);
        }

        info!("Added {} to {} as records {:?}", identity, fiscal_year, ids);
        Ok(ids)
    }

    /// Apply one edit to a live record and return its fresh derivation.
    pub fn apply_edit(&mut self, id: u64, edit: RecordEdit) -> Result<DerivedRow, StoreError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == Some(id) && !r.is_deleted)
            .ok_or(StoreError::NotFound(id))?;

        match edit {
            RecordEdit::Month(month, value) => {
                if matches!(value, Some(v) if !v.is_finite()) {
                    return Err(StoreError::InvalidEdit(format!("{} must be finite", month)));
                }
                record.months.set(month, value);
            }
            RecordEdit::RatedCapacity(value) => {
                if matches!(value, Some(v) if !v.is_finite()) {
                    return Err(StoreError::InvalidEdit("rated capacity must be finite".to_string()));
                }
                record.rated_capacity = value;
            }
            RecordEdit::IncludedInTotal(included) => record.included_in_total = included,
        }

        debug!("Edited record {}: {:?}", id, edit);
        Ok(derive_row(record))
    }

    pub fn get(&self, id: u64) -> Option<&ProjectRecord> {
        self.records.iter().find(|r| r.id == Some(id))
    }

    /// Non-deleted rows of one fiscal year, including malformed ones so the
    /// engine can report them.
    pub fn snapshot(&self, fiscal_year: &FiscalYear) -> Vec<ProjectRecord> {
        self.records
            .iter()
            .filter(|r| !r.is_deleted)
            .filter(|r| fiscal_year.contains(r) || r.fiscal_year.trim().is_empty())
            .cloned()
            .collect()
    }

    /// Fiscal years that have live rows.
    pub fn fiscal_years(&self) -> BTreeSet<FiscalYear> {
        self.records
            .iter()
            .filter(|r| !r.is_deleted && !r.fiscal_year.trim().is_empty())
            .map(|r| FiscalYear::new(r.fiscal_year.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::aggregate::{aggregate, RecordFilter, TimeWindow};
    use crate::engine::kpi::kpi_summary;

    fn fy() -> FiscalYear {
        FiscalYear::new("FY_25-26")
    }

    fn plan(name: &str, capacity: f64) -> ProjectRecord {
        ProjectRecord::new(
            "FY_25-26",
            name,
            "AGE24L",
            "A",
            "Khavda Solar",
            ProjectType::Ppa,
            StatusVariant::Plan,
            Some(capacity),
        )
    }

    fn identity(name: &str) -> IdentityKey {
        IdentityKey {
            project_name: name.to_string(),
            spv: "AGE24L".to_string(),
            section: "A".to_string(),
            category: "Khavda Solar".to_string(),
            serial_number: None,
        }
    }

    #[test]
    fn test_replace_supersedes_previous_generation() {
        let mut store = ProjectStore::new();
        store
            .replace_fiscal_year(&fy(), vec![plan("Old", 100.0), plan("Older", 50.0)])
            .unwrap();

        let outcome = store
            .replace_fiscal_year(&fy(), vec![plan("New", 300.0)])
            .unwrap();

        assert_eq!(outcome.superseded, 2);
        assert_eq!(outcome.inserted.len(), 1);
        assert_eq!(store.len(), 3);

        let snapshot = store.snapshot(&fy());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].project_name, "New");
    }

    #[test]
    fn test_empty_replacement_is_refused() {
        let mut store = ProjectStore::new();
        store.replace_fiscal_year(&fy(), vec![plan("Khavda", 425.0)]).unwrap();

        let err = store.replace_fiscal_year(&fy(), Vec::new()).unwrap_err();
        assert_eq!(err, StoreError::EmptyReplacement("FY_25-26".to_string()));

        let mut foreign = plan("Elsewhere", 10.0);
        foreign.fiscal_year = "FY_24-25".to_string();
        assert!(store.replace_fiscal_year(&fy(), vec![foreign]).is_err());

        // Still live after both refusals.
        assert_eq!(store.snapshot(&fy()).len(), 1);
    }

    #[test]
    fn test_replace_stamps_and_refuses_fiscal_years() {
        let mut store = ProjectStore::new();
        let mut unstamped = plan("Unstamped", 10.0);
        unstamped.fiscal_year.clear();
        let mut foreign = plan("Elsewhere", 20.0);
        foreign.fiscal_year = "FY_24-25".to_string();

        let outcome = store
            .replace_fiscal_year(&fy(), vec![unstamped, foreign, plan("Khavda", 30.0)])
            .unwrap();

        assert_eq!(outcome.inserted.len(), 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].index, 1);
        assert_eq!(outcome.rejected[0].project_name, "Elsewhere");

        let snapshot = store.snapshot(&fy());
        assert!(snapshot.iter().all(|r| r.fiscal_year == "FY_25-26"));
    }

    #[test]
    fn test_replace_leaves_other_years_alone() {
        let mut store = ProjectStore::new();
        let mut last_year = plan("Last Year", 10.0);
        last_year.fiscal_year = "FY_24-25".to_string();
        store.load(vec![last_year]);

        store.replace_fiscal_year(&fy(), vec![plan("Khavda", 30.0)]).unwrap();

        let years: Vec<String> = store.fiscal_years().iter().map(|f| f.to_string()).collect();
        assert_eq!(years, vec!["FY_24-25", "FY_25-26"]);
        assert_eq!(store.snapshot(&FiscalYear::new("FY_24-25")).len(), 1);
    }

    #[test]
    fn test_manual_insert_creates_all_variants() {
        let mut store = ProjectStore::new();
        store.replace_fiscal_year(&fy(), vec![plan("Existing", 10.0).with_serial(7)]).unwrap();

        let ids = store
            .manual_insert(&fy(), &identity("Khavda Phase 9"), ProjectType::Merchant, Some(120.0))
            .unwrap();
        assert_eq!(ids.len(), 3);

        let variants: Vec<StatusVariant> = ids
            .iter()
            .filter_map(|id| store.get(*id))
            .map(|r| r.status)
            .collect();
        assert_eq!(variants, StatusVariant::ALL.to_vec());

        let added = store.get(ids[0]).unwrap();
        assert_eq!(added.serial_number, Some(8));
        assert_eq!(added.months.total(), 0.0);

        let kpi = kpi_summary(&store.snapshot(&fy()), &fy(), &RecordFilter::all());
        assert_eq!(kpi.plan_total, 130.0);
        assert_eq!(kpi.rephase_total, 120.0);
        assert_eq!(kpi.actual_total, 0.0);
        assert_eq!(kpi.project_count, 2);
    }

    #[test]
    fn test_manual_insert_refuses_live_identity() {
        let mut store = ProjectStore::new();
        store
            .manual_insert(&fy(), &identity("Khavda Phase 9"), ProjectType::Ppa, Some(120.0))
            .unwrap();

        let mut renumbered = identity("Khavda Phase 9");
        renumbered.serial_number = Some(42);
        let err = store
            .manual_insert(&fy(), &renumbered, ProjectType::Ppa, Some(120.0))
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_edit_month_rederives_row() {
        let mut store = ProjectStore::new();
        let outcome = store
            .replace_fiscal_year(&fy(), vec![plan("Khavda", 425.0).with_month(Month::Nov, 425.0)])
            .unwrap();
        let id = outcome.inserted[0];

        let derived = store
            .apply_edit(id, RecordEdit::Month(Month::Oct, Some(100.0)))
            .unwrap();
        assert_eq!(derived.quarter_sums[2], 525.0);
        assert_eq!(derived.cumulative_to_date, 525.0);
        // Plan total stays on capacity.
        assert_eq!(derived.row_total, 425.0);

        let derived = store.apply_edit(id, RecordEdit::RatedCapacity(Some(525.0))).unwrap();
        assert_eq!(derived.row_total, 525.0);
    }

    #[test]
    fn test_edit_included_flag_changes_aggregates() {
        let mut store = ProjectStore::new();
        let outcome = store
            .replace_fiscal_year(&fy(), vec![plan("Khavda", 425.0), plan("Mundra", 76.0)])
            .unwrap();

        store
            .apply_edit(outcome.inserted[1], RecordEdit::IncludedInTotal(false))
            .unwrap();

        let snapshot = store.snapshot(&fy());
        let total = aggregate(&snapshot, &fy(), &RecordFilter::all(), TimeWindow::Yearly, StatusVariant::Plan);
        assert_eq!(total, 425.0);
    }

    #[test]
    fn test_edit_errors() {
        let mut store = ProjectStore::new();
        let outcome = store.replace_fiscal_year(&fy(), vec![plan("Khavda", 425.0)]).unwrap();
        let id = outcome.inserted[0];

        assert_eq!(
            store.apply_edit(999, RecordEdit::IncludedInTotal(false)),
            Err(StoreError::NotFound(999))
        );
        assert!(matches!(
            store.apply_edit(id, RecordEdit::Month(Month::Apr, Some(f64::NAN))),
            Err(StoreError::InvalidEdit(_))
        ));

        // Superseded rows cannot be edited.
        store.replace_fiscal_year(&fy(), vec![plan("Khavda", 425.0)]).unwrap();
        assert_eq!(
            store.apply_edit(id, RecordEdit::IncludedInTotal(false)),
            Err(StoreError::NotFound(id))
        );
    }

    #[test]
    fn test_load_keeps_existing_ids() {
        let mut store = ProjectStore::new();
        let mut with_id = plan("Khavda", 425.0);
        with_id.id = Some(40);
        store.load(vec![with_id, plan("Mundra", 76.0)]);

        assert!(store.get(40).is_some());
        assert!(store.get(41).is_some());
    }
}
