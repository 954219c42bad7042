//! Diff computation for resources
//!
//! Two layers live here. [`diff`] compares a desired definition with the
//! current one and yields the primitive [`Change`]s needed to converge.
//! [`ResourceDiff`] is the reporting view over a list of [`Resource`]s.

use crate::resource::Resource;
use crate::types::{Intent, ResourceState};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A definition that can be compared structurally with another of its kind
pub trait Diffable {
    /// Identifier the definition is stored under
    fn id(&self) -> String;

    /// Structural equality, ignoring ordering the target treats as unordered
    fn same_as(&self, other: &Self) -> bool;

    /// Whether `desired` may overwrite `self` in place
    ///
    /// Return `false` for immutable properties (e.g. a resource's agent).
    /// The differ then deletes the current definition and creates the new one.
    fn replaceable_by(&self, desired: &Self) -> bool {
        let _ = desired;
        true
    }
}

/// A primitive operation against the managed store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<F> {
    /// Insert a new fragment
    Create(F),
    /// Overwrite the fragment stored under `id`
    Replace { id: String, fragment: F },
    /// Remove the fragment stored under `id`
    Delete { id: String },
    /// Nothing to do
    NoOp,
}

impl<F> Change<F> {
    /// Whether applying this change modifies anything
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }

    /// Short verb for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Replace { .. } => "replace",
            Self::Delete { .. } => "delete",
            Self::NoOp => "no-op",
        }
    }

    /// The fragment carried by this change, if any
    pub fn fragment(&self) -> Option<&F> {
        match self {
            Self::Create(fragment) | Self::Replace { fragment, .. } => Some(fragment),
            Self::Delete { .. } | Self::NoOp => None,
        }
    }

    /// Transform the carried fragment
    pub fn map<G>(self, f: impl FnOnce(F) -> G) -> Change<G> {
        match self {
            Self::Create(fragment) => Change::Create(f(fragment)),
            Self::Replace { id, fragment } => Change::Replace {
                id,
                fragment: f(fragment),
            },
            Self::Delete { id } => Change::Delete { id },
            Self::NoOp => Change::NoOp,
        }
    }
}

impl<F> fmt::Display for Change<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(_) => write!(f, "create"),
            Self::Replace { id, .. } => write!(f, "replace {id}"),
            Self::Delete { id } => write!(f, "delete {id}"),
            Self::NoOp => write!(f, "no-op"),
        }
    }
}

/// Options controlling [`diff`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Requested end state
    pub intent: Intent,
    /// Replace even when structurally equal
    pub force: bool,
}

/// Compare a desired definition against the current one
///
/// Always returns at least one change. Removal is only produced for
/// [`Intent::Absent`].
///
/// | current | intent  | result                     |
/// |---------|---------|----------------------------|
/// | none    | present | `Create`                   |
/// | none    | absent  | `NoOp`                     |
/// | some    | absent  | `Delete`                   |
/// | equal   | present | `NoOp` (unless forced)     |
/// | differs | present | `Replace`, or `Delete` + `Create` when not replaceable |
pub fn diff<F>(desired: &F, current: Option<&F>, opts: DiffOptions) -> Vec<Change<F>>
where
    F: Diffable + Clone,
{
    match (opts.intent, current) {
        (Intent::Absent, None) => vec![Change::NoOp],
        (Intent::Absent, Some(current)) => vec![Change::Delete { id: current.id() }],
        (Intent::Present, None) => vec![Change::Create(desired.clone())],
        (Intent::Present, Some(current)) => {
            if !opts.force && current.same_as(desired) {
                return vec![Change::NoOp];
            }
            if current.id() != desired.id() || !current.replaceable_by(desired) {
                return vec![
                    Change::Delete { id: current.id() },
                    Change::Create(desired.clone()),
                ];
            }
            vec![Change::Replace {
                id: desired.id(),
                fragment: desired.clone(),
            }]
        }
    }
}

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource
    pub resource_id: String,
    /// Type of the resource
    pub resource_type: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
}

impl ResourceDiff {
    /// Create a diff from a resource, returning None if no changes needed
    pub fn from_resource(resource: &dyn Resource) -> Result<Option<Self>> {
        let current = resource.current_state()?;
        let desired = resource.desired_state();

        if current == desired {
            return Ok(None);
        }

        Ok(Some(Self {
            resource_id: resource.id(),
            resource_type: resource.resource_type().to_string(),
            description: resource.description(),
            current,
            desired,
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Present { .. }, ResourceState::Absent)
        )
    }

    /// Check if this diff represents a modification
    pub fn is_modification(&self) -> bool {
        !self.is_addition() && !self.is_removal()
    }
}

/// Compute diffs for a list of resources
///
/// Returns only resources that have differences between current and desired state.
/// Resources whose state cannot be read are reported as errors alongside.
pub fn compute_diffs(resources: &[Box<dyn Resource>]) -> (Vec<ResourceDiff>, Vec<String>) {
    let mut diffs = Vec::new();
    let mut errors = Vec::new();
    for resource in resources {
        match ResourceDiff::from_resource(resource.as_ref()) {
            Ok(Some(diff)) => diffs.push(diff),
            Ok(None) => {}
            Err(e) => errors.push(format!("{}: {e:#}", resource.id())),
        }
    }
    (diffs, errors)
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type, keeping first-seen type order
pub fn group_by_type(diffs: &[ResourceDiff]) -> Vec<(String, Vec<&ResourceDiff>)> {
    let mut groups: Vec<(String, Vec<&ResourceDiff>)> = Vec::new();
    for diff in diffs {
        match groups.iter_mut().find(|(t, _)| *t == diff.resource_type) {
            Some((_, items)) => items.push(diff),
            None => groups.push((diff.resource_type.clone(), vec![diff])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        kind: &'static str,
        value: u32,
    }

    impl Item {
        fn new(id: &str, kind: &'static str, value: u32) -> Self {
            Self {
                id: id.to_string(),
                kind,
                value,
            }
        }
    }

    impl Diffable for Item {
        fn id(&self) -> String {
            self.id.clone()
        }

        fn same_as(&self, other: &Self) -> bool {
            self == other
        }

        fn replaceable_by(&self, desired: &Self) -> bool {
            self.kind == desired.kind
        }
    }

    fn present() -> DiffOptions {
        DiffOptions::default()
    }

    #[test]
    fn test_missing_is_created() {
        let desired = Item::new("a", "x", 1);
        let changes = diff(&desired, None, present());
        assert_eq!(changes, vec![Change::Create(desired)]);
    }

    #[test]
    fn test_equal_is_noop() {
        let desired = Item::new("a", "x", 1);
        let changes = diff(&desired, Some(&desired.clone()), present());
        assert_eq!(changes, vec![Change::NoOp]);
    }

    #[test]
    fn test_force_replaces_equal() {
        let desired = Item::new("a", "x", 1);
        let opts = DiffOptions {
            force: true,
            ..present()
        };
        let changes = diff(&desired, Some(&desired.clone()), opts);
        assert!(matches!(&changes[..], [Change::Replace { id, .. }] if id == "a"));
    }

    #[test]
    fn test_changed_value_is_replaced() {
        let desired = Item::new("a", "x", 2);
        let current = Item::new("a", "x", 1);
        let changes = diff(&desired, Some(&current), present());
        assert_eq!(
            changes,
            vec![Change::Replace {
                id: "a".into(),
                fragment: desired
            }]
        );
    }

    #[test]
    fn test_immutable_change_recreates() {
        let desired = Item::new("a", "y", 1);
        let current = Item::new("a", "x", 1);
        let changes = diff(&desired, Some(&current), present());
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], Change::Delete { id: "a".into() });
        assert_eq!(changes[1], Change::Create(desired));
    }

    #[test]
    fn test_absent_only_deletes_existing() {
        let opts = DiffOptions {
            intent: Intent::Absent,
            force: false,
        };
        let desired = Item::new("a", "x", 1);
        assert_eq!(diff(&desired, None, opts), vec![Change::NoOp]);
        assert_eq!(
            diff(&desired, Some(&desired.clone()), opts),
            vec![Change::Delete { id: "a".into() }]
        );
    }

    #[test]
    fn test_change_map_keeps_variant() {
        let change = Change::Replace {
            id: "a".to_string(),
            fragment: 1,
        };
        assert_eq!(
            change.map(|n| n + 1),
            Change::Replace {
                id: "a".to_string(),
                fragment: 2
            }
        );
        assert!(!Change::<u8>::NoOp.is_change());
    }
}
