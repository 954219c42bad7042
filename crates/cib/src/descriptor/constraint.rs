//! Location, colocation, order and order-set descriptors.

use super::{ConstraintSpec, Descriptor, pairs, required};
use crate::error::{Error, Result};
use crate::model::{
    Attributes, ColocationConstraint, LocationConstraint, OrderAction, OrderConstraint,
    OrderOptions, OrderSet, ResourceRef, ResourceSet, Role, Score,
};
use crate::params::{validate_id, validate_node};
use declarative::Intent;
use serde::{Deserialize, Serialize};

/// Use the given id, or derive one.
fn constraint_id(id: Option<&str>, derive: impl FnOnce() -> String) -> Result<(String, bool)> {
    match id.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => {
            validate_id("id", id)?;
            Ok((id.to_string(), true))
        }
        None => Ok((derive(), false)),
    }
}

fn score(value: Option<&str>) -> Result<Score> {
    value.map_or_else(|| Ok(Score::infinity()), |s| Score::parse("score", s.trim()))
}

/// Parameters of a location constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationParams {
    pub id: Option<String>,
    pub resource: Option<String>,
    pub node: Option<String>,
    /// Defaults to `INFINITY`
    pub score: Option<String>,
    pub state: Intent,
    pub force: bool,
}

impl LocationParams {
    pub fn build(&self) -> Result<Descriptor> {
        let rsc = required("resource", self.resource.as_deref())?;
        validate_id("resource", rsc)?;
        let node = required("node", self.node.as_deref())?;
        validate_node("node", node)?;
        let (id, explicit_id) = constraint_id(self.id.as_deref(), || {
            LocationConstraint::default_id(rsc, node)
        })?;

        Ok(Descriptor::Location(ConstraintSpec {
            constraint: LocationConstraint {
                id,
                rsc: rsc.to_string(),
                node: node.to_string(),
                score: score(self.score.as_deref())?,
            },
            explicit_id,
            intent: self.state,
            force: self.force,
        }))
    }
}

/// Parameters of a colocation constraint.
///
/// Either `resource1`/`resource2` (each optionally `id=Role`) or the
/// `master`/`slave` shorthand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColocationParams {
    pub id: Option<String>,
    pub resource1: Option<String>,
    pub resource2: Option<String>,
    pub master: Option<String>,
    pub slave: Option<String>,
    /// Defaults to `INFINITY`
    pub score: Option<String>,
    /// Extra `rsc_colocation` attributes, e.g. `node-attribute=rack`
    pub params: Option<String>,
    pub state: Intent,
    pub force: bool,
}

impl ColocationParams {
    pub fn build(&self) -> Result<Descriptor> {
        let pair_form = self.resource1.is_some() || self.resource2.is_some();
        let role_form = self.master.is_some() || self.slave.is_some();

        let (rsc, with) = match (pair_form, role_form) {
            (true, true) => {
                return Err(Error::validation(
                    "resource1",
                    "cannot combine resource1/resource2 with master/slave",
                ));
            }
            (false, true) => {
                let master = required("master", self.master.as_deref())?;
                let slave = required("slave", self.slave.as_deref())?;
                let mut rsc = ResourceRef::parse("master", master)?;
                let mut with = ResourceRef::parse("slave", slave)?;
                rsc.role = Some(Role::Master);
                with.role = Some(Role::Slave);
                (rsc, with)
            }
            _ => (
                ResourceRef::parse("resource1", required("resource1", self.resource1.as_deref())?)?,
                ResourceRef::parse("resource2", required("resource2", self.resource2.as_deref())?)?,
            ),
        };
        if rsc.id == with.id {
            return Err(Error::validation(
                "resource2",
                format!("'{}' cannot be colocated with itself", rsc.id),
            ));
        }

        let mut extra = Attributes::from_pairs(pairs("params", self.params.as_deref())?);
        for reserved in ["id", "rsc", "with-rsc", "rsc-role", "with-rsc-role", "score"] {
            if extra.remove(reserved).is_some() {
                return Err(Error::validation(
                    "params",
                    format!("'{reserved}' has its own field"),
                ));
            }
        }

        let (id, explicit_id) = constraint_id(self.id.as_deref(), || {
            ColocationConstraint::default_id(&rsc, &with)
        })?;

        Ok(Descriptor::Colocation(ConstraintSpec {
            constraint: ColocationConstraint {
                id,
                rsc,
                with,
                score: score(self.score.as_deref())?,
                extra,
            },
            explicit_id,
            intent: self.state,
            force: self.force,
        }))
    }
}

/// Parameters of an order constraint between two resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderParams {
    pub id: Option<String>,
    pub resource1: Option<String>,
    /// Defaults to `start`
    pub resource1_action: Option<String>,
    pub resource2: Option<String>,
    /// Defaults to `start`
    pub resource2_action: Option<String>,
    /// `kind=`, `score=`, `symmetrical=`; anything else passes through
    pub params: Option<String>,
    pub state: Intent,
    pub force: bool,
}

impl OrderParams {
    pub fn build(&self) -> Result<Descriptor> {
        let first = required("resource1", self.resource1.as_deref())?;
        validate_id("resource1", first)?;
        let then = required("resource2", self.resource2.as_deref())?;
        validate_id("resource2", then)?;
        if first == then {
            return Err(Error::validation(
                "resource2",
                format!("'{first}' cannot be ordered against itself"),
            ));
        }

        let action = |field: &str, value: Option<&str>| {
            value.map_or(Ok(OrderAction::Start), |a| OrderAction::parse(field, a.trim()))
        };
        let first_action = action("resource1_action", self.resource1_action.as_deref())?;
        let then_action = action("resource2_action", self.resource2_action.as_deref())?;
        let options = OrderOptions::from_pairs("params", pairs("params", self.params.as_deref())?)?;

        let (id, explicit_id) = constraint_id(self.id.as_deref(), || {
            OrderConstraint::default_id(first, first_action, then, then_action)
        })?;

        Ok(Descriptor::Order(ConstraintSpec {
            constraint: OrderConstraint {
                id,
                first: first.to_string(),
                first_action,
                then: then.to_string(),
                then_action,
                options,
            },
            explicit_id,
            intent: self.state,
            force: self.force,
        }))
    }
}

/// Resource sets as written: a list of lists, or a flat list for one set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceSets {
    Nested(Vec<Vec<String>>),
    Flat(Vec<String>),
}

impl Default for ResourceSets {
    fn default() -> Self {
        Self::Nested(Vec::new())
    }
}

impl ResourceSets {
    pub fn into_sets(self) -> Vec<Vec<String>> {
        match self {
            Self::Nested(sets) => sets,
            Self::Flat(set) if set.is_empty() => Vec::new(),
            Self::Flat(set) => vec![set],
        }
    }
}

/// Parameters of an ordered-set constraint.
///
/// ```toml
/// [[order_set]]
/// name = "order-storage"
/// resource_sets = [["drbd", "fs"], ["nfs", "vip"]]
/// set_options = "sequential=true"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrderSetParams {
    pub name: Option<String>,
    pub resource_sets: ResourceSets,
    /// Attributes applied to every `resource_set`
    pub set_options: Option<String>,
    /// `rsc_order` attributes, e.g. `kind=Optional`
    pub params: Option<String>,
    pub state: Intent,
    pub force: bool,
}

impl OrderSetParams {
    pub fn build(&self) -> Result<Descriptor> {
        let id = required("name", self.name.as_deref())?;
        validate_id("name", id)?;

        let set_options = Attributes::from_pairs(pairs("set_options", self.set_options.as_deref())?);
        if set_options.get("id").is_some() {
            return Err(Error::validation("set_options", "set ids are derived from the name"));
        }
        let options = OrderOptions::from_pairs("params", pairs("params", self.params.as_deref())?)?;

        let raw_sets = self.resource_sets.clone().into_sets();
        if raw_sets.is_empty() && self.state == Intent::Present {
            return Err(Error::validation("resource_sets", "at least one set is required"));
        }

        let mut sets = Vec::with_capacity(raw_sets.len());
        for (index, resources) in raw_sets.into_iter().enumerate() {
            if resources.is_empty() {
                return Err(Error::validation(
                    "resource_sets",
                    format!("set {} is empty", index + 1),
                ));
            }
            for rsc in &resources {
                validate_id("resource_sets", rsc)?;
            }
            sets.push(ResourceSet {
                id: OrderSet::set_id(id, index),
                resources,
                options: set_options.clone(),
            });
        }

        Ok(Descriptor::OrderSet(ConstraintSpec {
            constraint: OrderSet {
                id: id.to_string(),
                sets,
                options,
            },
            explicit_id: true,
            intent: self.state,
            force: self.force,
        }))
    }
}
