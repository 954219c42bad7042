//! Resource definitions: primitives, clone/master wrappers and groups.

use super::{Attributes, CibObject};
use crate::error::{Error, Result};
use crate::xml::Element;
use declarative::Diffable;
use std::fmt;
use std::str::FromStr;

/// Meta attribute Pacemaker reads to decide whether a resource may run.
pub const TARGET_ROLE: &str = "target-role";

/// Resource agent triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub class: String,
    pub provider: Option<String>,
    pub kind: String,
}

impl FromStr for Agent {
    type Err = Error;

    /// Accepts `class:provider:type`, `class:type` or a bare `type`
    /// (shorthand for `ocf:heartbeat:type`).
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(Error::validation(
                "type",
                format!("'{s}' has an empty component"),
            ));
        }
        match parts.as_slice() {
            [kind] => Ok(Self {
                class: "ocf".to_string(),
                provider: Some("heartbeat".to_string()),
                kind: (*kind).to_string(),
            }),
            ["ocf", _] => Err(Error::validation(
                "type",
                format!("'{s}' needs a provider, e.g. ocf:heartbeat:IPaddr2"),
            )),
            [class, kind] => Ok(Self {
                class: (*class).to_string(),
                provider: None,
                kind: (*kind).to_string(),
            }),
            [class, provider, kind] => Ok(Self {
                class: (*class).to_string(),
                provider: Some((*provider).to_string()),
                kind: (*kind).to_string(),
            }),
            _ => Err(Error::validation(
                "type",
                format!("'{s}' is not class:provider:type"),
            )),
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "{}:{}:{}", self.class, provider, self.kind),
            None => write!(f, "{}:{}", self.class, self.kind),
        }
    }
}

/// Resource role, as used by operations and colocation constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Started,
    Stopped,
    Master,
    Slave,
    Promoted,
    Unpromoted,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Started,
        Role::Stopped,
        Role::Master,
        Role::Slave,
        Role::Promoted,
        Role::Unpromoted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Stopped => "Stopped",
            Self::Master => "Master",
            Self::Slave => "Slave",
            Self::Promoted => "Promoted",
            Self::Unpromoted => "Unpromoted",
        }
    }

    /// Parse a role name, case-insensitively, reporting errors against `field`.
    pub fn parse(field: &str, s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::validation(
                    field,
                    format!(
                        "unknown role '{s}' (expected one of {})",
                        Self::ALL.map(|r| r.as_str()).join(", ")
                    ),
                )
            })
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse("role", s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a primitive's operation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub action: String,
    pub interval: String,
    pub timeout: Option<String>,
    pub role: Option<Role>,
    pub extra: Attributes,
}

impl Operation {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            interval: "0s".to_string(),
            timeout: None,
            role: None,
            extra: Attributes::new(),
        }
    }

    /// Build from the pairs of an operation line. Ids are always derived,
    /// so an `id` pair is ignored.
    pub fn from_pairs(
        field: &str,
        action: impl Into<String>,
        pairs: Vec<(String, String)>,
    ) -> Result<Self> {
        let mut op = Self::new(action);
        for (key, value) in pairs {
            match key.as_str() {
                "interval" => op.interval = value,
                "timeout" => op.timeout = Some(value),
                "role" => op.role = Some(Role::parse(field, &value)?),
                "id" | "name" => {}
                _ => op.extra.set(key, value),
            }
        }
        Ok(op)
    }

    /// Natural key within a primitive's operation list.
    pub fn key(&self) -> (&str, &str, Option<Role>) {
        (&self.action, &self.interval, self.role)
    }

    pub fn element_id(&self, rsc_id: &str) -> String {
        let mut id = format!("{rsc_id}-{}-interval-{}", self.action, self.interval);
        if let Some(role) = self.role {
            id.push('-');
            id.push_str(role.as_str());
        }
        id
    }

    pub fn to_element(&self, rsc_id: &str) -> Element {
        let mut op = Element::new("op")
            .with_attr("id", self.element_id(rsc_id))
            .with_attr("name", &self.action)
            .with_attr("interval", &self.interval);
        if let Some(timeout) = &self.timeout {
            op.set_attr("timeout", timeout);
        }
        if let Some(role) = self.role {
            op.set_attr("role", role.as_str());
        }
        self.extra.apply_to(&mut op);
        op
    }

    pub fn from_element(op: &Element) -> Result<Self> {
        let action = op
            .attr("name")
            .ok_or_else(|| Error::Xml(format!("<op> without name in {}", op.render())))?;
        let mut parsed = Self::new(action);
        for (key, value) in &op.attributes {
            match key.as_str() {
                "id" | "name" => {}
                "interval" => parsed.interval.clone_from(value),
                "timeout" => parsed.timeout = Some(value.clone()),
                "role" => {
                    parsed.role =
                        Some(Role::parse("role", value).map_err(|e| Error::Xml(e.to_string()))?);
                }
                _ => parsed.extra.set(key, value),
            }
        }
        Ok(parsed)
    }
}

/// A primitive resource.
#[derive(Debug, Clone, Eq)]
pub struct Primitive {
    pub id: String,
    pub agent: Agent,
    pub params: Attributes,
    pub meta: Attributes,
    pub operations: Vec<Operation>,
}

impl Primitive {
    pub fn new(id: impl Into<String>, agent: Agent) -> Self {
        Self {
            id: id.into(),
            agent,
            params: Attributes::new(),
            meta: Attributes::new(),
            operations: Vec::new(),
        }
    }
}

/// Operation lists match when every operation has an equal counterpart
/// under the same key. List order is not significant.
fn same_operations(a: &[Operation], b: &[Operation]) -> bool {
    a.len() == b.len() && a.iter().all(|op| b.iter().any(|other| other == op))
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.agent == other.agent
            && self.params == other.params
            && self.meta == other.meta
            && same_operations(&self.operations, &other.operations)
    }
}

impl CibObject for Primitive {
    fn tag(&self) -> &'static str {
        "primitive"
    }

    fn to_element(&self) -> Element {
        let mut el = Element::new("primitive")
            .with_attr("id", &self.id)
            .with_attr("class", &self.agent.class);
        if let Some(provider) = &self.agent.provider {
            el.set_attr("provider", provider);
        }
        el.set_attr("type", &self.agent.kind);

        if !self.params.is_empty() {
            el.push(
                self.params
                    .to_set_element("instance_attributes", &format!("{}-instance_attributes", self.id)),
            );
        }
        if !self.meta.is_empty() {
            el.push(
                self.meta
                    .to_set_element("meta_attributes", &format!("{}-meta_attributes", self.id)),
            );
        }
        if !self.operations.is_empty() {
            let mut ops = Element::new("operations");
            for op in &self.operations {
                ops.push(op.to_element(&self.id));
            }
            el.push(ops);
        }
        el
    }

    fn from_element(el: &Element) -> Result<Self> {
        expect_tag(el, "primitive")?;
        let id = required_attr(el, "id")?;
        let agent = Agent {
            class: required_attr(el, "class")?,
            provider: el.attr("provider").map(str::to_string),
            kind: required_attr(el, "type")?,
        };
        let operations = el
            .children_named("operations")
            .flat_map(|ops| ops.children_named("op"))
            .map(Operation::from_element)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id,
            agent,
            params: Attributes::from_children(el, "instance_attributes"),
            meta: Attributes::from_children(el, "meta_attributes"),
            operations,
        })
    }
}

/// Which wrapper element runs multiple instances of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperKind {
    Clone,
    Master,
}

impl WrapperKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Clone => "clone",
            Self::Master => "master",
        }
    }

    /// Wrapper id used when none is given.
    pub fn default_id(&self, primitive_id: &str) -> String {
        format!("{primitive_id}-{}", self.tag())
    }
}

/// A clone or master element owning exactly one primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapper {
    pub kind: WrapperKind,
    pub id: String,
    pub meta: Attributes,
    pub primitive: Primitive,
}

impl CibObject for Wrapper {
    fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    fn to_element(&self) -> Element {
        let mut el = Element::new(self.kind.tag()).with_attr("id", &self.id);
        if !self.meta.is_empty() {
            el.push(
                self.meta
                    .to_set_element("meta_attributes", &format!("{}-meta_attributes", self.id)),
            );
        }
        el.push(self.primitive.to_element());
        el
    }

    fn from_element(el: &Element) -> Result<Self> {
        let kind = match el.name.as_str() {
            "clone" => WrapperKind::Clone,
            "master" => WrapperKind::Master,
            other => return Err(Error::Xml(format!("expected <clone> or <master>, got <{other}>"))),
        };
        let primitive = el
            .child("primitive")
            .ok_or_else(|| Error::Xml(format!("<{}> without a primitive", el.name)))?;
        Ok(Self {
            kind,
            id: required_attr(el, "id")?,
            meta: Attributes::from_children(el, "meta_attributes"),
            primitive: Primitive::from_element(primitive)?,
        })
    }
}

/// A group element; members are full primitive definitions, in start order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub meta: Attributes,
    pub members: Vec<Primitive>,
}

impl Group {
    pub fn member_ids(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.id.as_str()).collect()
    }
}

impl CibObject for Group {
    fn tag(&self) -> &'static str {
        "group"
    }

    fn to_element(&self) -> Element {
        let mut el = Element::new("group").with_attr("id", &self.id);
        if !self.meta.is_empty() {
            el.push(
                self.meta
                    .to_set_element("meta_attributes", &format!("{}-meta_attributes", self.id)),
            );
        }
        for member in &self.members {
            el.push(member.to_element());
        }
        el
    }

    fn from_element(el: &Element) -> Result<Self> {
        expect_tag(el, "group")?;
        Ok(Self {
            id: required_attr(el, "id")?,
            meta: Attributes::from_children(el, "meta_attributes"),
            members: el
                .children_named("primitive")
                .map(Primitive::from_element)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// A top-level child of the `resources` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEntry {
    Primitive(Primitive),
    Wrapped(Wrapper),
    Group(Group),
    /// Anything not managed here (bundles, cloned groups, ...), kept verbatim
    Other(Element),
}

impl ResourceEntry {
    pub fn id(&self) -> &str {
        match self {
            Self::Primitive(p) => &p.id,
            Self::Wrapped(w) => &w.id,
            Self::Group(g) => &g.id,
            Self::Other(el) => el.id().unwrap_or_default(),
        }
    }

    /// Element tag this entry renders to.
    pub fn kind(&self) -> &str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Wrapped(w) => w.kind.tag(),
            Self::Group(_) => "group",
            Self::Other(el) => &el.name,
        }
    }

    /// The primitive with `id` defined inside this entry.
    pub fn find_primitive(&self, id: &str) -> Option<&Primitive> {
        match self {
            Self::Primitive(p) if p.id == id => Some(p),
            Self::Wrapped(w) if w.primitive.id == id => Some(&w.primitive),
            Self::Group(g) => g.members.iter().find(|m| m.id == id),
            _ => None,
        }
    }

    /// Whether this entry is, or contains, an element with `id`.
    pub fn contains(&self, id: &str) -> bool {
        match self {
            Self::Other(el) => el.find_by_id(id).is_some(),
            _ => self.id() == id || self.find_primitive(id).is_some(),
        }
    }

    /// Meta attributes of the outermost element, where target-role lives.
    pub fn meta(&self) -> Option<&Attributes> {
        match self {
            Self::Primitive(p) => Some(&p.meta),
            Self::Wrapped(w) => Some(&w.meta),
            Self::Group(g) => Some(&g.meta),
            Self::Other(_) => None,
        }
    }

    pub fn meta_mut(&mut self) -> Option<&mut Attributes> {
        match self {
            Self::Primitive(p) => Some(&mut p.meta),
            Self::Wrapped(w) => Some(&mut w.meta),
            Self::Group(g) => Some(&mut g.meta),
            Self::Other(_) => None,
        }
    }
}

impl CibObject for ResourceEntry {
    fn tag(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Wrapped(w) => w.kind.tag(),
            Self::Group(_) => "group",
            Self::Other(_) => "resource",
        }
    }

    fn to_element(&self) -> Element {
        match self {
            Self::Primitive(p) => p.to_element(),
            Self::Wrapped(w) => w.to_element(),
            Self::Group(g) => g.to_element(),
            Self::Other(el) => el.clone(),
        }
    }

    fn from_element(el: &Element) -> Result<Self> {
        match el.name.as_str() {
            "primitive" => Primitive::from_element(el).map(Self::Primitive),
            "clone" | "master" if el.child("primitive").is_some() => {
                Wrapper::from_element(el).map(Self::Wrapped)
            }
            "group" => Group::from_element(el).map(Self::Group),
            _ => Ok(Self::Other(el.clone())),
        }
    }
}

impl Diffable for ResourceEntry {
    fn id(&self) -> String {
        ResourceEntry::id(self).to_string()
    }

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }

    /// The agent and the wrapper kind cannot change in place.
    fn replaceable_by(&self, desired: &Self) -> bool {
        match (self, desired) {
            (Self::Primitive(a), Self::Primitive(b)) => a.agent == b.agent,
            (Self::Wrapped(a), Self::Wrapped(b)) => {
                a.kind == b.kind && a.primitive.agent == b.primitive.agent
            }
            (Self::Group(_), Self::Group(_)) | (Self::Other(_), Self::Other(_)) => true,
            _ => false,
        }
    }
}

impl Diffable for Primitive {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }

    fn replaceable_by(&self, desired: &Self) -> bool {
        self.agent == desired.agent
    }
}

/// Member order is significant: it is the start order.
impl Diffable for Group {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

/// Whether `meta` asks Pacemaker to keep the resource stopped.
pub fn is_disabled(meta: &Attributes) -> bool {
    meta.get(TARGET_ROLE)
        .is_some_and(|role| role.eq_ignore_ascii_case("Stopped"))
}

pub(crate) fn expect_tag(el: &Element, tag: &str) -> Result<()> {
    if el.name == tag {
        Ok(())
    } else {
        Err(Error::Xml(format!("expected <{tag}>, got <{}>", el.name)))
    }
}

pub(crate) fn required_attr(el: &Element, name: &str) -> Result<String> {
    el.attr(name)
        .map(str::to_string)
        .ok_or_else(|| Error::Xml(format!("<{}> is missing attribute '{name}'", el.name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vip() -> Primitive {
        let mut p = Primitive::new("vip", "ocf:heartbeat:IPaddr2".parse().unwrap());
        p.params.set("ip", "192.168.0.100");
        p.operations.push(Operation {
            interval: "30s".into(),
            ..Operation::new("monitor")
        });
        p
    }

    #[test]
    fn test_agent_forms() {
        let full: Agent = "ocf:pacemaker:Dummy".parse().unwrap();
        assert_eq!(full.provider.as_deref(), Some("pacemaker"));
        assert_eq!(full.to_string(), "ocf:pacemaker:Dummy");

        let systemd: Agent = "systemd:nginx".parse().unwrap();
        assert_eq!(systemd.provider, None);
        assert_eq!(systemd.to_string(), "systemd:nginx");

        let bare: Agent = "IPaddr2".parse().unwrap();
        assert_eq!(bare.to_string(), "ocf:heartbeat:IPaddr2");

        assert!("ocf:Dummy".parse::<Agent>().is_err());
        assert!("a:b:c:d".parse::<Agent>().is_err());
        assert!("ocf::Dummy".parse::<Agent>().is_err());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("op", "master").unwrap(), Role::Master);
        let err = Role::parse("op", "Leader").unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "op"));
    }

    #[test]
    fn test_primitive_element_shape() {
        let el = vip().to_element();
        assert_eq!(el.attr("class"), Some("ocf"));
        assert_eq!(el.attr("provider"), Some("heartbeat"));
        assert_eq!(el.attr("type"), Some("IPaddr2"));

        let op = el.find_by_id("vip-monitor-interval-30s").unwrap();
        assert_eq!(op.attr("name"), Some("monitor"));
        assert!(el.find_by_id("vip-instance_attributes-ip").is_some());
        assert!(el.child("meta_attributes").is_none());
    }

    #[test]
    fn test_primitive_round_trip() {
        let mut p = vip();
        p.meta.set("resource-stickiness", "100");
        p.operations.push(Operation {
            timeout: Some("20s".into()),
            role: Some(Role::Slave),
            ..Operation::new("monitor")
        });
        let parsed = Primitive::from_element(&Element::parse(&p.to_element().render()).unwrap());
        assert_eq!(parsed.unwrap(), p);
    }

    #[test]
    fn test_operation_order_is_not_significant() {
        let mut a = vip();
        a.operations.push(Operation::new("start"));
        let mut b = a.clone();
        b.operations.reverse();
        assert_eq!(a, b);

        b.operations[0].timeout = Some("5s".into());
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrapper_round_trip() {
        let mut meta = Attributes::new();
        meta.set("master-max", "1");
        let wrapper = Wrapper {
            kind: WrapperKind::Master,
            id: "db-master".into(),
            meta,
            primitive: vip(),
        };
        let el = wrapper.to_element();
        assert_eq!(el.name, "master");
        let entry = ResourceEntry::from_element(&el).unwrap();
        assert_eq!(entry, ResourceEntry::Wrapped(wrapper));
        assert!(entry.contains("vip"));
        assert!(entry.find_primitive("vip").is_some());
    }

    #[test]
    fn test_group_order_matters() {
        let mut second = vip();
        second.id = "web".into();
        let g1 = Group {
            id: "g".into(),
            meta: Attributes::new(),
            members: vec![vip(), second.clone()],
        };
        let g2 = Group {
            members: vec![second, vip()],
            ..g1.clone()
        };
        assert_ne!(g1, g2);
        assert_eq!(Group::from_element(&g1.to_element()).unwrap(), g1);
    }

    #[test]
    fn test_agent_change_not_replaceable() {
        let current = ResourceEntry::Primitive(vip());
        let mut changed = vip();
        changed.agent = "ocf:heartbeat:IPsrcaddr".parse().unwrap();
        assert!(!current.replaceable_by(&ResourceEntry::Primitive(changed)));

        let mut params = vip();
        params.params.set("ip", "10.0.0.1");
        assert!(current.replaceable_by(&ResourceEntry::Primitive(params)));
    }

    #[test]
    fn test_unknown_entries_are_kept_verbatim() {
        let bundle = Element::new("bundle").with_attr("id", "b1");
        let entry = ResourceEntry::from_element(&bundle).unwrap();
        assert_eq!(entry.to_element(), bundle);
        assert_eq!(entry.id(), "b1");
    }
}
