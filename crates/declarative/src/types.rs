//! States, results and run summaries

use serde::{Deserialize, Serialize};

/// What the caller wants to be true about a resource
///
/// Omission never implies removal: a resource is only deleted when
/// `Absent` is requested explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Exists and matches the desired definition
    #[default]
    Present,
    /// Does not exist
    Absent,
}

/// Where a resource stands, or should stand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Exists; `details` summarises the definition
    Present { details: Option<String> },
    Absent,
    /// Exists with a different definition; `from` and `to` are renderings
    /// suitable for a line diff
    Modified { from: String, to: String },
    /// Cannot be decided before earlier resources are applied
    Unknown,
}

impl ResourceState {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// Outcome of one [`crate::Resource::apply`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    NoChange,
    Created,
    Modified,
    Removed,
    Failed { error: String },
    Skipped { reason: String },
}

impl ApplyResult {
    /// Anything but `Failed`
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// The managed system was written to
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

/// Tally of a plan run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
    /// `"<id>: <error>"` per failure, in run order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ExecuteSummary {
    /// Created, modified and removed together
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Every resource accounted for, whatever its outcome
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
        self.errors.extend(other.errors.iter().cloned());
    }

    /// Count one result; the caller records the error text
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Flags for [`crate::execute`]
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Diff only; nothing is applied
    pub dry_run: bool,
    pub verbose: bool,
    /// Skip every remaining resource after the first failure
    pub fail_fast: bool,
}
