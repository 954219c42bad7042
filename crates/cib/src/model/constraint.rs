//! Location, colocation and order constraints.

use super::resource::{Role, expect_tag, required_attr};
use super::{Attributes, CibObject};
use crate::error::{Error, Result};
use crate::xml::Element;
use declarative::Diffable;
use std::fmt;
use std::str::FromStr;

/// A constraint score, kept verbatim so `INFINITY` round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score(String);

impl Score {
    pub fn infinity() -> Self {
        Self("INFINITY".to_string())
    }

    /// Validate against `[+-]digits | [+-]INFINITY`.
    pub fn parse(field: &str, s: &str) -> Result<Self> {
        let body = s.strip_prefix(['+', '-']).unwrap_or(s);
        let valid = body == "INFINITY" || (!body.is_empty() && body.chars().all(|c| c.is_ascii_digit()));
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::validation(
                field,
                format!("'{s}' is not an integer, INFINITY, +INFINITY or -INFINITY"),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Score {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse("score", s)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resource id with an optional role, written `db` or `db=Master`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: String,
    pub role: Option<Role>,
}

impl ResourceRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: None,
        }
    }

    pub fn parse(field: &str, s: &str) -> Result<Self> {
        let (id, role) = match s.split_once('=') {
            Some((id, role)) => (id, Some(Role::parse(field, role)?)),
            None => (s, None),
        };
        crate::params::validate_id(field, id)?;
        Ok(Self {
            id: id.to_string(),
            role,
        })
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Some(role) => write!(f, "{}={role}", self.id),
            None => f.write_str(&self.id),
        }
    }
}

/// `rsc_location`: prefer (or avoid) running a resource on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationConstraint {
    pub id: String,
    pub rsc: String,
    pub node: String,
    pub score: Score,
}

impl LocationConstraint {
    pub fn default_id(rsc: &str, node: &str) -> String {
        format!("location-{rsc}-{node}")
    }
}

impl CibObject for LocationConstraint {
    fn tag(&self) -> &'static str {
        "rsc_location"
    }

    fn to_element(&self) -> Element {
        Element::new("rsc_location")
            .with_attr("id", &self.id)
            .with_attr("rsc", &self.rsc)
            .with_attr("node", &self.node)
            .with_attr("score", self.score.as_str())
    }

    fn from_element(el: &Element) -> Result<Self> {
        expect_tag(el, "rsc_location")?;
        Ok(Self {
            id: required_attr(el, "id")?,
            rsc: required_attr(el, "rsc")?,
            node: required_attr(el, "node")?,
            score: Score::parse("score", &required_attr(el, "score")?)
                .map_err(|e| Error::Xml(e.to_string()))?,
        })
    }
}

/// `rsc_colocation`: keep `rsc` together with (or apart from) `with`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColocationConstraint {
    pub id: String,
    pub rsc: ResourceRef,
    pub with: ResourceRef,
    pub score: Score,
    pub extra: Attributes,
}

impl ColocationConstraint {
    /// `colocation-<rsc>[-<role>]-<with>[-<role>]`, roles lowercased.
    pub fn default_id(rsc: &ResourceRef, with: &ResourceRef) -> String {
        let part = |r: &ResourceRef| match r.role {
            Some(role) => format!("{}-{}", r.id, role.as_str().to_ascii_lowercase()),
            None => r.id.clone(),
        };
        format!("colocation-{}-{}", part(rsc), part(with))
    }

    /// Same resources and roles, in either direction.
    pub fn same_pair(&self, other: &Self) -> bool {
        (self.rsc == other.rsc && self.with == other.with)
            || (self.rsc == other.with && self.with == other.rsc)
    }
}

impl CibObject for ColocationConstraint {
    fn tag(&self) -> &'static str {
        "rsc_colocation"
    }

    fn to_element(&self) -> Element {
        let mut el = Element::new("rsc_colocation")
            .with_attr("id", &self.id)
            .with_attr("rsc", &self.rsc.id);
        if let Some(role) = self.rsc.role {
            el.set_attr("rsc-role", role.as_str());
        }
        el.set_attr("with-rsc", &self.with.id);
        if let Some(role) = self.with.role {
            el.set_attr("with-rsc-role", role.as_str());
        }
        el.set_attr("score", self.score.as_str());
        self.extra.apply_to(&mut el);
        el
    }

    fn from_element(el: &Element) -> Result<Self> {
        expect_tag(el, "rsc_colocation")?;
        let role = |name: &str| -> Result<Option<Role>> {
            el.attr(name)
                .map(|r| Role::parse(name, r).map_err(|e| Error::Xml(e.to_string())))
                .transpose()
        };
        let extra = el
            .attributes
            .iter()
            .filter(|(k, _)| {
                !matches!(
                    k.as_str(),
                    "id" | "rsc" | "rsc-role" | "with-rsc" | "with-rsc-role" | "score"
                )
            })
            .cloned()
            .collect();
        Ok(Self {
            id: required_attr(el, "id")?,
            rsc: ResourceRef {
                id: required_attr(el, "rsc")?,
                role: role("rsc-role")?,
            },
            with: ResourceRef {
                id: required_attr(el, "with-rsc")?,
                role: role("with-rsc-role")?,
            },
            score: Score::parse("score", el.attr("score").unwrap_or("INFINITY"))
                .map_err(|e| Error::Xml(e.to_string()))?,
            extra,
        })
    }
}

/// Actions an order constraint can sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Start,
    Stop,
    Promote,
    Demote,
}

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Promote => "promote",
            Self::Demote => "demote",
        }
    }

    pub fn parse(field: &str, s: &str) -> Result<Self> {
        match s {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "promote" => Ok(Self::Promote),
            "demote" => Ok(Self::Demote),
            _ => Err(Error::validation(
                field,
                format!("'{s}' is not one of start, stop, promote, demote"),
            )),
        }
    }
}

/// How strictly an order constraint is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Mandatory,
    Optional,
    Serialize,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mandatory => "Mandatory",
            Self::Optional => "Optional",
            Self::Serialize => "Serialize",
        }
    }

    pub fn parse(field: &str, s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mandatory" => Ok(Self::Mandatory),
            "optional" => Ok(Self::Optional),
            "serialize" => Ok(Self::Serialize),
            _ => Err(Error::validation(
                field,
                format!("kind '{s}' is not one of Mandatory, Optional, Serialize"),
            )),
        }
    }
}

/// Attributes shared by `rsc_order` in both the pairwise and set form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderOptions {
    pub kind: Option<OrderKind>,
    pub score: Option<Score>,
    pub symmetrical: Option<bool>,
    pub extra: Attributes,
}

impl OrderOptions {
    /// Sort `key=value` pairs into recognized options and pass-through attributes.
    pub fn from_pairs(field: &str, pairs: Vec<(String, String)>) -> Result<Self> {
        let mut opts = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "kind" => opts.kind = Some(OrderKind::parse(field, &value)?),
                "score" => opts.score = Some(Score::parse(field, &value)?),
                "symmetrical" => opts.symmetrical = Some(parse_bool(field, &value)?),
                "id" => {
                    return Err(Error::validation(
                        field,
                        "the constraint id cannot be set here",
                    ));
                }
                _ => opts.extra.set(key, value),
            }
        }
        if opts.kind.is_some() && opts.score.is_some() {
            return Err(Error::validation(field, "kind and score are mutually exclusive"));
        }
        Ok(opts)
    }

    fn apply_to(&self, el: &mut Element) {
        if let Some(kind) = self.kind {
            el.set_attr("kind", kind.as_str());
        }
        if let Some(score) = &self.score {
            el.set_attr("score", score.as_str());
        }
        if let Some(symmetrical) = self.symmetrical {
            el.set_attr("symmetrical", if symmetrical { "true" } else { "false" });
        }
        self.extra.apply_to(el);
    }

    fn from_element(el: &Element, known: &[&str]) -> Result<Self> {
        let xml = |e: Error| Error::Xml(e.to_string());
        let mut opts = Self::default();
        for (key, value) in &el.attributes {
            match key.as_str() {
                "kind" => opts.kind = Some(OrderKind::parse("kind", value).map_err(xml)?),
                "score" => opts.score = Some(Score::parse("score", value).map_err(xml)?),
                "symmetrical" => {
                    opts.symmetrical = Some(parse_bool("symmetrical", value).map_err(xml)?);
                }
                k if known.contains(&k) => {}
                _ => opts.extra.set(key, value),
            }
        }
        Ok(opts)
    }
}

/// Parse a Pacemaker boolean.
pub fn parse_bool(field: &str, s: &str) -> Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "y" | "1" => Ok(true),
        "false" | "no" | "off" | "n" | "0" => Ok(false),
        _ => Err(Error::validation(field, format!("'{s}' is not a boolean"))),
    }
}

/// `rsc_order` between two resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConstraint {
    pub id: String,
    pub first: String,
    pub first_action: OrderAction,
    pub then: String,
    pub then_action: OrderAction,
    pub options: OrderOptions,
}

impl OrderConstraint {
    pub fn default_id(
        first: &str,
        first_action: OrderAction,
        then: &str,
        then_action: OrderAction,
    ) -> String {
        format!(
            "order-{first}-{}-{then}-{}",
            first_action.as_str(),
            then_action.as_str()
        )
    }

    /// Same resources and actions; a missing action reads as `start`.
    pub fn same_pair(&self, other: &Self) -> bool {
        self.first == other.first
            && self.first_action == other.first_action
            && self.then == other.then
            && self.then_action == other.then_action
    }
}

impl CibObject for OrderConstraint {
    fn tag(&self) -> &'static str {
        "rsc_order"
    }

    fn to_element(&self) -> Element {
        let mut el = Element::new("rsc_order")
            .with_attr("id", &self.id)
            .with_attr("first", &self.first)
            .with_attr("first-action", self.first_action.as_str())
            .with_attr("then", &self.then)
            .with_attr("then-action", self.then_action.as_str());
        self.options.apply_to(&mut el);
        el
    }

    fn from_element(el: &Element) -> Result<Self> {
        expect_tag(el, "rsc_order")?;
        let action = |name: &str| -> Result<OrderAction> {
            el.attr(name)
                .map_or(Ok(OrderAction::Start), |a| OrderAction::parse(name, a))
                .map_err(|e| Error::Xml(e.to_string()))
        };
        Ok(Self {
            id: required_attr(el, "id")?,
            first: required_attr(el, "first")?,
            first_action: action("first-action")?,
            then: required_attr(el, "then")?,
            then_action: action("then-action")?,
            options: OrderOptions::from_element(
                el,
                &["id", "first", "first-action", "then", "then-action"],
            )?,
        })
    }
}

/// One `resource_set` inside a set-form constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSet {
    pub id: String,
    pub resources: Vec<String>,
    pub options: Attributes,
}

impl ResourceSet {
    fn to_element(&self) -> Element {
        let mut el = Element::new("resource_set").with_attr("id", &self.id);
        self.options.apply_to(&mut el);
        for rsc in &self.resources {
            el.push(Element::new("resource_ref").with_attr("id", rsc));
        }
        el
    }

    fn from_element(el: &Element) -> Result<Self> {
        Ok(Self {
            id: required_attr(el, "id")?,
            resources: el
                .children_named("resource_ref")
                .map(|r| required_attr(r, "id"))
                .collect::<Result<Vec<_>>>()?,
            options: el
                .attributes
                .iter()
                .filter(|(k, _)| k != "id")
                .cloned()
                .collect(),
        })
    }

    /// Equal up to the set id, which tools name differently.
    fn same_as(&self, other: &Self) -> bool {
        self.resources == other.resources && self.options == other.options
    }
}

/// `rsc_order` over an ordered sequence of resource sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSet {
    pub id: String,
    pub sets: Vec<ResourceSet>,
    pub options: OrderOptions,
}

impl OrderSet {
    pub fn set_id(order_id: &str, index: usize) -> String {
        format!("{order_id}-set-{}", index + 1)
    }

    /// Every resource referenced by any set, in order.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.sets
            .iter()
            .flat_map(|s| s.resources.iter().map(String::as_str))
    }
}

impl CibObject for OrderSet {
    fn tag(&self) -> &'static str {
        "rsc_order"
    }

    fn to_element(&self) -> Element {
        let mut el = Element::new("rsc_order").with_attr("id", &self.id);
        self.options.apply_to(&mut el);
        for set in &self.sets {
            el.push(set.to_element());
        }
        el
    }

    fn from_element(el: &Element) -> Result<Self> {
        expect_tag(el, "rsc_order")?;
        Ok(Self {
            id: required_attr(el, "id")?,
            sets: el
                .children_named("resource_set")
                .map(ResourceSet::from_element)
                .collect::<Result<Vec<_>>>()?,
            options: OrderOptions::from_element(el, &["id"])?,
        })
    }
}

impl Diffable for LocationConstraint {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

impl Diffable for ColocationConstraint {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

impl Diffable for OrderConstraint {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

impl Diffable for OrderSet {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn same_as(&self, other: &Self) -> bool {
        self.id == other.id
            && self.options == other.options
            && self.sets.len() == other.sets.len()
            && self.sets.iter().zip(&other.sets).all(|(a, b)| a.same_as(b))
    }
}
