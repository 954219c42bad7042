//! Descriptor Builder: raw user parameters to validated desired state.
//!
//! Each descriptor kind has a `*Params` struct holding the fields exactly as
//! a user writes them (CLI flags or a manifest table) and a `build` step that
//! validates them into model values. Building never touches the cluster.

mod constraint;
mod property;
mod resource;

pub use constraint::{ColocationParams, LocationParams, OrderParams, OrderSetParams, ResourceSets};
pub use property::PropertyParams;
pub use resource::{GroupParams, PrimitiveParams};

use crate::error::Result;
use crate::model::{
    Attributes, ColocationConstraint, LocationConstraint, OrderConstraint, OrderSet,
    PropertyScope, ResourceEntry,
};
use declarative::Intent;
use serde::{Deserialize, Serialize};

/// Requested end state of a resource or group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
    /// Present, and allowed to run
    Enabled,
    /// Present, with `target-role=Stopped`
    Disabled,
}

impl State {
    pub fn intent(&self) -> Intent {
        match self {
            Self::Absent => Intent::Absent,
            _ => Intent::Present,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

/// Desired state of a primitive, possibly wrapped in a clone or master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveSpec {
    pub id: String,
    /// `None` when only toggling or removing an existing resource
    pub definition: Option<ResourceEntry>,
    pub state: State,
    pub force: bool,
}

/// Desired state of a group, with members referenced by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub id: String,
    pub members: Vec<String>,
    pub meta: Attributes,
    pub state: State,
    pub force: bool,
}

/// Desired state of a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSpec<T> {
    pub constraint: T,
    /// Whether the id was given rather than derived
    pub explicit_id: bool,
    pub intent: Intent,
    pub force: bool,
}

/// Pairs to set (present) or names to remove (absent) in a singleton set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    pub scope: PropertyScope,
    pub values: Attributes,
    pub intent: Intent,
}

/// A validated descriptor, ready to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Primitive(PrimitiveSpec),
    Group(GroupSpec),
    Location(ConstraintSpec<LocationConstraint>),
    Colocation(ConstraintSpec<ColocationConstraint>),
    Order(ConstraintSpec<OrderConstraint>),
    OrderSet(ConstraintSpec<OrderSet>),
    Property(PropertySpec),
}

impl Descriptor {
    /// Descriptor kind, as used in messages and manifest tables.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Group(_) => "group",
            Self::Location(_) => "location",
            Self::Colocation(_) => "colocation",
            Self::Order(_) => "order",
            Self::OrderSet(_) => "order_set",
            Self::Property(p) => p.scope.kind(),
        }
    }

    pub fn id(&self) -> String {
        match self {
            Self::Primitive(p) => p.id.clone(),
            Self::Group(g) => g.id.clone(),
            Self::Location(c) => c.constraint.id.clone(),
            Self::Colocation(c) => c.constraint.id.clone(),
            Self::Order(c) => c.constraint.id.clone(),
            Self::OrderSet(c) => c.constraint.id.clone(),
            Self::Property(p) => p.scope.set_id().to_string(),
        }
    }

    pub fn intent(&self) -> Intent {
        match self {
            Self::Primitive(p) => p.state.intent(),
            Self::Group(g) => g.state.intent(),
            Self::Location(c) => c.intent,
            Self::Colocation(c) => c.intent,
            Self::Order(c) => c.intent,
            Self::OrderSet(c) => c.intent,
            Self::Property(p) => p.intent,
        }
    }

    /// Whether the descriptor manages something the resource monitor reports on.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Primitive(_) | Self::Group(_))
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        match self {
            Self::Primitive(p) => match &p.definition {
                Some(ResourceEntry::Wrapped(w)) => format!(
                    "{} {} ({} {})",
                    p.state.as_str(),
                    p.id,
                    w.kind.tag(),
                    w.primitive.agent
                ),
                Some(ResourceEntry::Primitive(prim)) => {
                    format!("{} {} ({})", p.state.as_str(), p.id, prim.agent)
                }
                _ => format!("{} {}", p.state.as_str(), p.id),
            },
            Self::Group(g) => format!("{} {} [{}]", g.state.as_str(), g.id, g.members.join(", ")),
            Self::Location(c) => format!(
                "{} on {} ({})",
                c.constraint.rsc, c.constraint.node, c.constraint.score
            ),
            Self::Colocation(c) => format!(
                "{} with {} ({})",
                c.constraint.rsc, c.constraint.with, c.constraint.score
            ),
            Self::Order(c) => format!(
                "{} {} then {} {}",
                c.constraint.first_action.as_str(),
                c.constraint.first,
                c.constraint.then_action.as_str(),
                c.constraint.then
            ),
            Self::OrderSet(c) => c
                .constraint
                .sets
                .iter()
                .map(|s| format!("({})", s.resources.join(" ")))
                .collect::<Vec<_>>()
                .join(" then "),
            Self::Property(p) => p
                .values
                .iter()
                .map(|(k, v)| match p.intent {
                    Intent::Present => format!("{k}={v}"),
                    Intent::Absent => format!("-{k}"),
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Raw parameters of any descriptor kind.
#[derive(Debug, Clone)]
pub enum RawDescriptor {
    Primitive(PrimitiveParams),
    Group(GroupParams),
    Location(LocationParams),
    Colocation(ColocationParams),
    Order(OrderParams),
    OrderSet(OrderSetParams),
    Property(PropertyParams),
    ResourceDefaults(PropertyParams),
}

impl RawDescriptor {
    /// Kind of descriptor the parameters describe.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Group(_) => "group",
            Self::Location(_) => "location",
            Self::Colocation(_) => "colocation",
            Self::Order(_) => "order",
            Self::OrderSet(_) => "order_set",
            Self::Property(_) => PropertyScope::ClusterProperties.kind(),
            Self::ResourceDefaults(_) => PropertyScope::ResourceDefaults.kind(),
        }
    }

    /// Validate into a [`Descriptor`].
    pub fn build(&self) -> Result<Descriptor> {
        match self {
            Self::Primitive(p) => p.build(),
            Self::Group(p) => p.build(),
            Self::Location(p) => p.build(),
            Self::Colocation(p) => p.build(),
            Self::Order(p) => p.build(),
            Self::OrderSet(p) => p.build(),
            Self::Property(p) => p.build(PropertyScope::ClusterProperties),
            Self::ResourceDefaults(p) => p.build(PropertyScope::ResourceDefaults),
        }
    }
}

/// Reject an empty required field.
fn required<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(crate::error::Error::validation(field, "is required")),
    }
}

/// Parse an optional `key=value` block.
fn pairs(field: &str, value: Option<&str>) -> Result<Vec<(String, String)>> {
    value.map_or_else(|| Ok(Vec::new()), |v| crate::params::parse_pairs(field, v))
}
