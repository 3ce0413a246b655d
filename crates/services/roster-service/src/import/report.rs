//! Batch counters and the import report.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use domain::Role;

use super::descriptor::EntityDescriptor;

/// One problem with one spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RowFailure {
    /// Spreadsheet row number (the header is row 1)
    pub row: usize,
    /// Column the errors refer to; `None` when saving the row failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub errors: Vec<String>,
    /// The row as it was read, column by column
    pub values: BTreeMap<String, String>,
}

/// Result of one import call, returned to the caller and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImportReport {
    pub kind: Role,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub guardians_created: usize,
    pub guardians_linked: usize,
    pub failures: Vec<RowFailure>,
    /// Human-readable summary, e.g. "3 santri baru, 1 diperbarui, 2 relasi ditambahkan"
    pub message: String,
}

impl ImportReport {
    /// Number of distinct rows with at least one failure.
    pub fn failed_rows(&self) -> usize {
        self.failures.iter().map(|f| f.row).collect::<BTreeSet<_>>().len()
    }
}

/// What reconciling one row did, applied only after its transaction commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOutcome {
    pub status: RowStatus,
    pub guardians_created: usize,
    pub guardians_linked: usize,
}

/// Accumulates row outcomes across one import invocation.
#[derive(Debug)]
pub struct BatchCounter {
    descriptor: &'static EntityDescriptor,
    created: usize,
    updated: usize,
    unchanged: usize,
    guardians_created: usize,
    guardians_linked: usize,
    failures: Vec<RowFailure>,
}

impl BatchCounter {
    pub fn new(descriptor: &'static EntityDescriptor) -> Self {
        Self {
            descriptor,
            created: 0,
            updated: 0,
            unchanged: 0,
            guardians_created: 0,
            guardians_linked: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome.status {
            RowStatus::Created => self.created += 1,
            RowStatus::Updated => self.updated += 1,
            RowStatus::Unchanged => self.unchanged += 1,
        }
        self.guardians_created += outcome.guardians_created;
        self.guardians_linked += outcome.guardians_linked;
    }

    pub fn fail(&mut self, failures: impl IntoIterator<Item = RowFailure>) {
        self.failures.extend(failures);
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn updated(&self) -> usize {
        self.updated
    }

    pub fn unchanged(&self) -> usize {
        self.unchanged
    }

    pub fn guardians_created(&self) -> usize {
        self.guardians_created
    }

    pub fn guardians_linked(&self) -> usize {
        self.guardians_linked
    }

    pub fn failures(&self) -> &[RowFailure] {
        &self.failures
    }

    /// Indonesian summary sentence shown to the admin.
    pub fn summary(&self) -> String {
        let failed_rows = self
            .failures
            .iter()
            .map(|f| f.row)
            .collect::<BTreeSet<_>>()
            .len();

        if self.created + self.updated + self.unchanged + failed_rows == 0 {
            return "Tidak ada data yang diimpor".to_string();
        }

        let mut message = format!(
            "{} {} baru, {} diperbarui",
            self.created, self.descriptor.noun, self.updated
        );
        if self.descriptor.links_guardians {
            message.push_str(&format!(", {} relasi ditambahkan", self.guardians_linked));
        }
        if self.guardians_created > 0 {
            message.push_str(&format!(", {} wali baru", self.guardians_created));
        }
        if failed_rows > 0 {
            message.push_str(&format!("; {} baris gagal", failed_rows));
        }
        message
    }

    pub fn into_report(self) -> ImportReport {
        let message = self.summary();
        ImportReport {
            kind: self.descriptor.role,
            created: self.created,
            updated: self.updated,
            unchanged: self.unchanged,
            guardians_created: self.guardians_created,
            guardians_linked: self.guardians_linked,
            failures: self.failures,
            message,
        }
    }
}
