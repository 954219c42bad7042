//! Primitive and group descriptors.

use super::{Descriptor, GroupSpec, PrimitiveSpec, State, pairs, required};
use crate::error::{Error, Result};
use crate::model::{Agent, Attributes, Operation, Primitive, ResourceEntry, Wrapper, WrapperKind};
use crate::params::{parse_operation_line, validate_id};
use serde::{Deserialize, Serialize};

/// Parameters of a primitive resource.
///
/// ```toml
/// [[primitive]]
/// name = "vip"
/// type = "ocf:heartbeat:IPaddr2"
/// params = "ip=192.168.0.100 cidr_netmask=24"
/// op = ["monitor interval=30s", "start timeout=20s"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrimitiveParams {
    pub name: Option<String>,
    /// `class:provider:type`, `class:type` or a bare heartbeat type
    #[serde(rename = "type")]
    pub agent: Option<String>,
    pub params: Option<String>,
    pub meta: Option<String>,
    pub op: Vec<String>,
    /// Clone meta attributes; `id=` overrides the clone id
    pub clone: Option<String>,
    /// Master meta attributes; `id=` overrides the master id
    pub master: Option<String>,
    pub state: State,
    pub force: bool,
}

impl PrimitiveParams {
    pub fn build(&self) -> Result<Descriptor> {
        let id = required("name", self.name.as_deref())?;
        validate_id("name", id)?;

        if self.clone.is_some() && self.master.is_some() {
            return Err(Error::validation(
                "clone",
                "clone and master are mutually exclusive",
            ));
        }

        let definition = match (self.agent.as_deref(), self.state) {
            (Some(agent), _) => Some(self.definition(id, agent)?),
            (None, State::Present) => return Err(Error::validation("type", "is required")),
            (None, _) => None,
        };

        Ok(Descriptor::Primitive(PrimitiveSpec {
            id: id.to_string(),
            definition,
            state: self.state,
            force: self.force,
        }))
    }

    fn definition(&self, id: &str, agent: &str) -> Result<ResourceEntry> {
        let agent: Agent = agent.trim().parse()?;
        let mut primitive = Primitive::new(id, agent);
        primitive.params = Attributes::from_pairs(pairs("params", self.params.as_deref())?);
        primitive.meta = Attributes::from_pairs(pairs("meta", self.meta.as_deref())?);
        primitive.operations = operations(id, &self.op)?;

        let wrapper = match (&self.clone, &self.master) {
            (Some(block), _) => Some((WrapperKind::Clone, "clone", block)),
            (_, Some(block)) => Some((WrapperKind::Master, "master", block)),
            _ => None,
        };
        let Some((kind, field, block)) = wrapper else {
            return Ok(ResourceEntry::Primitive(primitive));
        };

        let mut meta = Attributes::from_pairs(pairs(field, Some(block.as_str()))?);
        let wrapper_id = meta.remove("id").unwrap_or_else(|| kind.default_id(id));
        validate_id(field, &wrapper_id)?;
        if wrapper_id == id {
            return Err(Error::validation(
                field,
                format!("wrapper id '{wrapper_id}' must differ from the resource name"),
            ));
        }

        Ok(ResourceEntry::Wrapped(Wrapper {
            kind,
            id: wrapper_id,
            meta,
            primitive,
        }))
    }
}

/// Parse operation lines, rejecting duplicate (action, interval, role) keys.
fn operations(rsc_id: &str, lines: &[String]) -> Result<Vec<Operation>> {
    let mut ops: Vec<Operation> = Vec::new();
    for line in lines {
        let Some((action, pairs)) = parse_operation_line("op", line)? else {
            continue;
        };
        let op = Operation::from_pairs("op", action, pairs)?;
        if ops.iter().any(|o| o.key() == op.key()) {
            return Err(Error::validation(
                "op",
                format!("duplicate operation '{}'", op.element_id(rsc_id)),
            ));
        }
        ops.push(op);
    }
    Ok(ops)
}

/// Parameters of a resource group.
///
/// ```toml
/// [[group]]
/// name = "web"
/// resources = ["vip", "nginx"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupParams {
    pub name: Option<String>,
    /// Member ids, in start order
    #[serde(alias = "resource")]
    pub resources: Vec<String>,
    pub meta: Option<String>,
    pub state: State,
    pub force: bool,
}

impl GroupParams {
    pub fn build(&self) -> Result<Descriptor> {
        let id = required("name", self.name.as_deref())?;
        validate_id("name", id)?;

        let mut members: Vec<String> = Vec::new();
        for member in &self.resources {
            let member = member.trim();
            validate_id("resources", member)?;
            if member == id {
                return Err(Error::validation(
                    "resources",
                    format!("group '{id}' cannot contain itself"),
                ));
            }
            if members.iter().any(|m| m == member) {
                return Err(Error::validation(
                    "resources",
                    format!("'{member}' is listed twice"),
                ));
            }
            members.push(member.to_string());
        }
        if members.is_empty() && self.state != State::Absent {
            return Err(Error::validation("resources", "at least one member is required"));
        }

        Ok(Descriptor::Group(GroupSpec {
            id: id.to_string(),
            members,
            meta: Attributes::from_pairs(pairs("meta", self.meta.as_deref())?),
            state: self.state,
            force: self.force,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CibObject;

    fn vip_params() -> PrimitiveParams {
        PrimitiveParams {
            name: Some("vip".into()),
            agent: Some("ocf:heartbeat:IPaddr2".into()),
            params: Some("ip=192.168.0.100".into()),
            op: vec!["monitor interval=30s".into()],
            ..Default::default()
        }
    }

    fn primitive_spec(params: &PrimitiveParams) -> PrimitiveSpec {
        match params.build().unwrap() {
            Descriptor::Primitive(spec) => spec,
            other => panic!("unexpected descriptor: {other:?}"),
        }
    }

    #[test]
    fn test_build_plain_primitive() {
        let spec = primitive_spec(&vip_params());
        let Some(ResourceEntry::Primitive(p)) = spec.definition else {
            panic!("expected a bare primitive");
        };
        assert_eq!(p.params.get("ip"), Some("192.168.0.100"));
        assert_eq!(p.operations.len(), 1);
        assert_eq!(p.operations[0].interval, "30s");
    }

    #[test]
    fn test_params_without_equals_names_field() {
        let params = PrimitiveParams {
            params: Some("ip=192.168.0.100 binary".into()),
            ..vip_params()
        };
        match params.build().unwrap_err() {
            Error::Validation { field, .. } => assert_eq!(field, "params"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_fields() {
        let no_name = PrimitiveParams {
            name: None,
            ..vip_params()
        };
        assert!(matches!(no_name.build(), Err(Error::Validation { ref field, .. }) if field == "name"));

        let no_type = PrimitiveParams {
            agent: None,
            ..vip_params()
        };
        assert!(matches!(no_type.build(), Err(Error::Validation { ref field, .. }) if field == "type"));
    }

    #[test]
    fn test_toggle_without_type() {
        let params = PrimitiveParams {
            name: Some("vip".into()),
            state: State::Disabled,
            ..Default::default()
        };
        let spec = primitive_spec(&params);
        assert!(spec.definition.is_none());
        assert_eq!(spec.state, State::Disabled);
    }

    #[test]
    fn test_master_block_with_id() {
        let params = PrimitiveParams {
            name: Some("db".into()),
            agent: Some("ocf:pacemaker:Stateful".into()),
            master: Some("id=ms-db master-max=1 notify=true".into()),
            ..Default::default()
        };
        let spec = primitive_spec(&params);
        let Some(ResourceEntry::Wrapped(w)) = spec.definition else {
            panic!("expected a wrapper");
        };
        assert_eq!(w.kind, WrapperKind::Master);
        assert_eq!(w.id, "ms-db");
        assert_eq!(w.meta.get("notify"), Some("true"));
        assert_eq!(w.meta.get("id"), None);
        assert_eq!(w.to_element().child("primitive").and_then(|p| p.id()), Some("db"));
    }

    #[test]
    fn test_clone_default_id() {
        let params = PrimitiveParams {
            clone: Some(String::new()),
            ..vip_params()
        };
        let spec = primitive_spec(&params);
        assert_eq!(spec.definition.unwrap().id(), "vip-clone");
    }

    #[test]
    fn test_clone_and_master_conflict() {
        let params = PrimitiveParams {
            clone: Some(String::new()),
            master: Some(String::new()),
            ..vip_params()
        };
        assert!(params.build().is_err());
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let params = PrimitiveParams {
            op: vec!["monitor interval=10s".into(), "monitor interval=10s timeout=5s".into()],
            ..vip_params()
        };
        assert!(matches!(params.build(), Err(Error::Validation { ref field, .. }) if field == "op"));

        let roles = PrimitiveParams {
            op: vec![
                "monitor interval=10s role=Master".into(),
                "monitor interval=10s role=Slave".into(),
            ],
            ..vip_params()
        };
        assert!(roles.build().is_ok());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let params = PrimitiveParams {
            op: vec!["monitor interval=10s role=Leader".into()],
            ..vip_params()
        };
        assert!(matches!(params.build(), Err(Error::Validation { ref field, .. }) if field == "op"));
    }

    #[test]
    fn test_group_validation() {
        let group = GroupParams {
            name: Some("web".into()),
            resources: vec!["vip".into(), "nginx".into()],
            ..Default::default()
        };
        let Descriptor::Group(spec) = group.build().unwrap() else {
            panic!("expected a group");
        };
        assert_eq!(spec.members, vec!["vip", "nginx"]);

        let empty = GroupParams {
            name: Some("web".into()),
            ..Default::default()
        };
        assert!(empty.build().is_err());
        let removal = GroupParams {
            state: State::Absent,
            ..empty
        };
        assert!(removal.build().is_ok());

        let twice = GroupParams {
            name: Some("web".into()),
            resources: vec!["vip".into(), "vip".into()],
            ..Default::default()
        };
        assert!(twice.build().is_err());
    }

    #[test]
    fn test_manifest_table_deserializes() {
        let params: PrimitiveParams = serde_json::from_str(
            r#"{"name": "vip", "type": "IPaddr2", "op": ["monitor interval=10s"], "state": "disabled"}"#,
        )
        .unwrap();
        assert_eq!(params.agent.as_deref(), Some("IPaddr2"));
        assert_eq!(params.state, State::Disabled);

        let unknown = serde_json::from_str::<PrimitiveParams>(r#"{"name": "vip", "typo": 1}"#);
        assert!(unknown.is_err());
    }
}
