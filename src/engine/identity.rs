//! Project identity and data-quality checks.
//!
//! Three records (Plan, Rephase, Actual) describe one physical project.
//! Counting projects rather than rows means collapsing them onto an
//! identity key; this module also detects exact duplicates and projects
//! missing one of their variants. Neither check corrects anything.

use crate::engine::validate::{is_live, validate_record};
use crate::models::{FiscalYear, ProjectRecord, StatusVariant};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};

/// How strictly records are matched to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityScope {
    /// Within one import batch, where serial numbers are stable.
    Batch,
    /// Across re-imports, where serial numbers may have been reassigned.
    CrossImport,
}

/// Key identifying one physical project across its status variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IdentityKey {
    pub project_name: String,
    pub spv: String,
    pub section: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<u32>,
}

impl IdentityKey {
    pub fn of(record: &ProjectRecord, scope: IdentityScope) -> Self {
        Self {
            project_name: record.project_name.trim().to_string(),
            spv: record.special_purpose_vehicle.trim().to_string(),
            section: record.section.trim().to_string(),
            category: record.category.trim().to_string(),
            serial_number: match scope {
                IdentityScope::Batch => record.serial_number,
                IdentityScope::CrossImport => None,
            },
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} [{} · {}]",
            self.project_name, self.spv, self.section, self.category
        )?;
        if let Some(sno) = self.serial_number {
            write!(f, " #{}", sno)?;
        }
        Ok(())
    }
}

/// The stored tuple two rows must share to count as duplicates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateKey {
    pub fiscal_year: String,
    pub serial_number: Option<u32>,
    pub project_name: String,
    pub spv: String,
    pub category: String,
    pub section: String,
    pub status: StatusVariant,
    pub rated_capacity: Option<f64>,
}

impl DuplicateKey {
    pub fn of(record: &ProjectRecord) -> Self {
        Self {
            fiscal_year: record.fiscal_year.clone(),
            serial_number: record.serial_number,
            project_name: record.project_name.clone(),
            spv: record.special_purpose_vehicle.clone(),
            category: record.category.clone(),
            section: record.section.clone(),
            status: record.status,
            rated_capacity: record.rated_capacity,
        }
    }

    /// Capacity compared bit-wise, with -0.0 folded onto 0.0.
    fn capacity_bits(&self) -> Option<u64> {
        self.rated_capacity
            .map(|c| if c == 0.0 { 0.0f64.to_bits() } else { c.to_bits() })
    }

    fn fields(&self) -> (&str, Option<u32>, &str, &str, &str, &str, StatusVariant) {
        (
            self.fiscal_year.as_str(),
            self.serial_number,
            self.project_name.as_str(),
            self.spv.as_str(),
            self.category.as_str(),
            self.section.as_str(),
            self.status,
        )
    }
}

impl PartialEq for DuplicateKey {
    fn eq(&self, other: &Self) -> bool {
        self.fields() == other.fields() && self.capacity_bits() == other.capacity_bits()
    }
}

impl Eq for DuplicateKey {}

impl Hash for DuplicateKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fields().hash(state);
        self.capacity_bits().hash(state);
    }
}

/// Rows sharing one duplicate key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub key: DuplicateKey,
    /// Positions in the input snapshot, ascending.
    pub indices: Vec<usize>,
    /// Surrogate ids of the colliding rows, where known.
    pub ids: Vec<u64>,
}

/// A project identity lacking at least one live status variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncompleteProject {
    pub key: IdentityKey,
    pub present: Vec<StatusVariant>,
    pub missing: Vec<StatusVariant>,
}

/// Report every set of live, well-formed rows colliding on the duplicate key.
pub fn find_duplicates(records: &[ProjectRecord]) -> Vec<DuplicateGroup> {
    let mut seen: HashMap<DuplicateKey, Vec<usize>> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        if record.is_deleted || validate_record(record).is_err() {
            continue;
        }
        seen.entry(DuplicateKey::of(record)).or_default().push(index);
    }

    let mut groups: Vec<DuplicateGroup> = seen
        .into_iter()
        .filter(|(_, indices)| indices.len() > 1)
        .map(|(key, indices)| {
            let ids = indices.iter().filter_map(|&i| records[i].id).collect();
            DuplicateGroup { key, indices, ids }
        })
        .collect();

    groups.sort_by_key(|g| g.indices[0]);

    for group in &groups {
        warn!(
            "Duplicate rows {:?} for {} ({})",
            group.indices, group.key.project_name, group.key.status
        );
    }

    groups
}

/// Report identities of the scope that lack a live Plan, Rephase or Actual.
///
/// Incomplete projects still contribute whatever variants they have to the
/// aggregates; this list is for data-quality reporting only.
pub fn find_incomplete_projects(
    records: &[ProjectRecord],
    scope: &FiscalYear,
    identity_scope: IdentityScope,
) -> Vec<IncompleteProject> {
    let mut variants: BTreeMap<IdentityKey, BTreeSet<StatusVariant>> = BTreeMap::new();

    for record in records.iter().filter(|r| is_live(r, scope)) {
        variants
            .entry(IdentityKey::of(record, identity_scope))
            .or_default()
            .insert(record.status);
    }

    debug!("{} project identities in {}", variants.len(), scope);

    variants
        .into_iter()
        .filter_map(|(key, present)| {
            let missing: Vec<StatusVariant> = StatusVariant::ALL
                .into_iter()
                .filter(|v| !present.contains(v))
                .collect();
            if missing.is_empty() {
                return None;
            }
            warn!("Incomplete project {}: missing {:?}", key, missing);
            Some(IncompleteProject {
                key,
                present: present.into_iter().collect(),
                missing,
            })
        })
        .collect()
}

/// Distinct identity keys among the given records.
pub fn distinct_identities<'a>(
    records: impl IntoIterator<Item = &'a ProjectRecord>,
    identity_scope: IdentityScope,
) -> BTreeSet<IdentityKey> {
    records
        .into_iter()
        .map(|r| IdentityKey::of(r, identity_scope))
        .collect()
}
