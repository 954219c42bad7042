//! Manifest files: many descriptors in one TOML document
//!
//! ```toml
//! [property]
//! params = "stonith-enabled=false"
//!
//! [[primitive]]
//! name = "vip"
//! type = "ocf:heartbeat:IPaddr2"
//! params = "ip=192.168.0.100"
//!
//! [[location]]
//! resource = "vip"
//! node = "server1"
//! score = "100"
//! ```
//!
//! Tables use the same fields as the matching subcommand. Descriptors are
//! applied kind by kind so that references resolve: properties, resource
//! defaults, primitives, groups, locations, colocations, orders, order sets.

use anyhow::{Context, Result};
use cib::{
    ColocationParams, GroupParams, LocationParams, OrderParams, OrderSetParams, PrimitiveParams,
    PropertyParams, RawDescriptor,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub property: Option<PropertyParams>,
    pub resource_defaults: Option<PropertyParams>,
    pub primitive: Vec<PrimitiveParams>,
    pub group: Vec<GroupParams>,
    pub location: Vec<LocationParams>,
    pub colocation: Vec<ColocationParams>,
    pub order: Vec<OrderParams>,
    pub order_set: Vec<OrderSetParams>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Every descriptor, in apply order
    pub fn descriptors(&self) -> Vec<RawDescriptor> {
        let mut out = Vec::new();
        out.extend(self.property.iter().cloned().map(RawDescriptor::Property));
        out.extend(
            self.resource_defaults
                .iter()
                .cloned()
                .map(RawDescriptor::ResourceDefaults),
        );
        out.extend(self.primitive.iter().cloned().map(RawDescriptor::Primitive));
        out.extend(self.group.iter().cloned().map(RawDescriptor::Group));
        out.extend(self.location.iter().cloned().map(RawDescriptor::Location));
        out.extend(self.colocation.iter().cloned().map(RawDescriptor::Colocation));
        out.extend(self.order.iter().cloned().map(RawDescriptor::Order));
        out.extend(self.order_set.iter().cloned().map(RawDescriptor::OrderSet));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cib::{Descriptor, ResourceSets, State};
    use std::io::Write;

    const SITE: &str = r#"
[[order_set]]
name = "order-stack"
resource_sets = [["fs"], ["db", "web"]]

[[location]]
resource = "vip"
node = "server1"
score = "100"

[[primitive]]
name = "vip"
type = "ocf:heartbeat:IPaddr2"
params = "ip=192.168.0.100 cidr_netmask=24"
op = ["monitor interval=30s"]

[[group]]
name = "site"
resources = ["vip", "web"]
state = "disabled"

[property]
params = "stonith-enabled=false"
"#;

    fn kinds(manifest: &Manifest) -> Vec<&'static str> {
        manifest
            .descriptors()
            .iter()
            .map(|raw| raw.build().map_or("invalid", |d| d.kind()))
            .collect()
    }

    #[test]
    fn test_apply_order_ignores_file_order() {
        let manifest = Manifest::parse(SITE).unwrap();
        assert_eq!(
            kinds(&manifest),
            vec!["property", "primitive", "group", "location", "order_set"]
        );
    }

    #[test]
    fn test_tables_fill_params() {
        let manifest = Manifest::parse(SITE).unwrap();
        assert_eq!(manifest.primitive[0].agent.as_deref(), Some("ocf:heartbeat:IPaddr2"));
        assert_eq!(manifest.group[0].state, State::Disabled);
        assert!(matches!(
            &manifest.order_set[0].resource_sets,
            ResourceSets::Nested(sets) if sets.len() == 2
        ));

        let raw = RawDescriptor::Location(manifest.location[0].clone());
        let Descriptor::Location(spec) = raw.build().unwrap() else {
            panic!("expected a location");
        };
        assert_eq!(spec.constraint.id, "location-vip-server1");
    }

    #[test]
    fn test_unknown_table_rejected() {
        let err = Manifest::parse("[[primitve]]\nname = \"vip\"\n").unwrap_err();
        assert!(err.to_string().contains("primitve"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[resource_defaults]\nparams = \"resource-stickiness=100\"\n").unwrap();
        let manifest = Manifest::load(file.path()).unwrap();
        assert!(!manifest.is_empty());
        assert_eq!(kinds(&manifest), vec!["resource_defaults"]);
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        let err = Manifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("site.toml"));
    }
}
