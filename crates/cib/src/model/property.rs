//! Singleton name/value sets: cluster properties and resource defaults.

use super::resource::{expect_tag, required_attr};
use super::{Attributes, CibObject};
use crate::error::{Error, Result};
use crate::xml::Element;
use declarative::Diffable;

/// Which singleton set a [`PropertySet`] lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyScope {
    /// `crm_config/cluster_property_set[@id='cib-bootstrap-options']`
    ClusterProperties,
    /// `rsc_defaults/meta_attributes[@id='rsc_defaults-options']`
    ResourceDefaults,
}

impl PropertyScope {
    /// Well-known id of the set.
    pub fn set_id(&self) -> &'static str {
        match self {
            Self::ClusterProperties => "cib-bootstrap-options",
            Self::ResourceDefaults => "rsc_defaults-options",
        }
    }

    /// Element tag of the set.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ClusterProperties => "cluster_property_set",
            Self::ResourceDefaults => "meta_attributes",
        }
    }

    /// Descriptor kind, for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClusterProperties => "property",
            Self::ResourceDefaults => "resource_defaults",
        }
    }
}

/// The contents of one singleton set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySet {
    pub scope: PropertyScope,
    pub values: Attributes,
}

impl PropertySet {
    pub fn new(scope: PropertyScope) -> Self {
        Self {
            scope,
            values: Attributes::new(),
        }
    }

    /// Read a set of `scope`, checking its tag and well-known id.
    pub fn from_element_in(scope: PropertyScope, el: &Element) -> Result<Self> {
        expect_tag(el, scope.tag())?;
        let id = required_attr(el, "id")?;
        if id != scope.set_id() {
            return Err(Error::Xml(format!(
                "expected set '{}', got '{id}'",
                scope.set_id()
            )));
        }
        Ok(Self {
            scope,
            values: Attributes::from_set_element(el),
        })
    }
}

impl CibObject for PropertySet {
    fn tag(&self) -> &'static str {
        self.scope.tag()
    }

    fn to_element(&self) -> Element {
        self.values
            .to_set_element(self.scope.tag(), self.scope.set_id())
    }

    fn from_element(el: &Element) -> Result<Self> {
        let scope = match el.name.as_str() {
            "cluster_property_set" => PropertyScope::ClusterProperties,
            "meta_attributes" => PropertyScope::ResourceDefaults,
            other => return Err(Error::Xml(format!("<{other}> is not a property set"))),
        };
        Self::from_element_in(scope, el)
    }
}

impl Diffable for PropertySet {
    fn id(&self) -> String {
        self.scope.set_id().to_string()
    }

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_properties_round_trip() {
        let mut set = PropertySet::new(PropertyScope::ClusterProperties);
        set.values.set("stonith-enabled", "false");
        set.values.set("no-quorum-policy", "ignore");

        let el = set.to_element();
        assert_eq!(el.name, "cluster_property_set");
        assert_eq!(el.id(), Some("cib-bootstrap-options"));
        assert!(el.find_by_id("cib-bootstrap-options-stonith-enabled").is_some());
        assert_eq!(PropertySet::from_element(&el).unwrap(), set);
    }

    #[test]
    fn test_resource_defaults_round_trip() {
        let mut set = PropertySet::new(PropertyScope::ResourceDefaults);
        set.values.set("resource-stickiness", "100");

        let el = set.to_element();
        assert_eq!(el.name, "meta_attributes");
        assert_eq!(el.id(), Some("rsc_defaults-options"));
        assert_eq!(PropertySet::from_element(&el).unwrap(), set);
    }

    #[test]
    fn test_wrong_set_id_is_rejected() {
        let el = Element::new("cluster_property_set").with_attr("id", "other");
        assert!(PropertySet::from_element(&el).is_err());
    }
}
