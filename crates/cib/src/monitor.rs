//! Post-change checks against `crm_mon`.
//!
//! Purely advisory: anything that goes wrong here becomes a warning.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::xml::Element;
use log::warn;

/// One resource instance as reported by `crm_mon`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStatus {
    /// Primitive id, with any clone instance suffix (`:0`) removed
    pub id: String,
    pub role: String,
    pub active: bool,
    pub failed: bool,
    pub nodes: Vec<String>,
}

fn flag(el: &Element, name: &str) -> bool {
    el.attr(name) == Some("true")
}

fn collect(el: &Element, out: &mut Vec<ResourceStatus>) {
    if el.name == "resource" {
        if let Some(id) = el.id() {
            let id = id.split_once(':').map_or(id, |(base, _)| base);
            out.push(ResourceStatus {
                id: id.to_string(),
                role: el.attr("role").unwrap_or("Unknown").to_string(),
                active: flag(el, "active"),
                failed: flag(el, "failed"),
                nodes: el
                    .children_named("node")
                    .filter_map(|n| n.attr("name"))
                    .map(String::from)
                    .collect(),
            });
        }
        return;
    }
    for child in &el.children {
        collect(child, out);
    }
}

/// Parse `crm_mon --output-as=xml` into primitive instances.
pub fn parse_crm_mon(xml: &str) -> Result<Vec<ResourceStatus>> {
    let root = Element::parse(xml)?;
    let resources = root
        .child("resources")
        .ok_or_else(|| Error::Xml("crm_mon output has no <resources>".into()))?;
    let mut out = Vec::new();
    collect(resources, &mut out);
    Ok(out)
}

/// Warnings about the given primitives in a status report.
pub fn check(statuses: &[ResourceStatus], ids: &[String]) -> Vec<String> {
    let mut warnings = Vec::new();
    for id in ids {
        let instances: Vec<_> = statuses.iter().filter(|s| s.id == *id).collect();
        if instances.is_empty() {
            warnings.push(format!("'{id}' is not reported by crm_mon"));
            continue;
        }
        for failed in instances.iter().filter(|s| s.failed) {
            let on = if failed.nodes.is_empty() {
                String::new()
            } else {
                format!(" on {}", failed.nodes.join(", "))
            };
            warnings.push(format!("'{id}' has failed{on} (role {})", failed.role));
        }
    }
    warnings
}

/// Ask the monitor about `ids`. Never fails.
pub fn verify(backend: &dyn Backend, ids: &[String]) -> Vec<String> {
    if ids.is_empty() {
        return Vec::new();
    }
    let warnings = backend
        .resource_status()
        .and_then(|xml| parse_crm_mon(&xml))
        .map_or_else(
            |e| vec![format!("could not read resource status: {e}")],
            |statuses| check(&statuses, ids),
        );
    for w in &warnings {
        warn!("{w}");
    }
    warnings
}
