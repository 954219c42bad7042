//! Execution planner - builds resource execution plans

use crate::resource::{BoxedResource, Resource};

/// An ordered execution plan
///
/// Resources run strictly in insertion order.
#[derive(Default)]
pub struct ExecutionPlan {
    /// Resources to converge, in order
    pub resources: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource to the plan
    pub fn add_resource(&mut self, resource: BoxedResource) {
        self.resources.push(resource);
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            resources: self
                .resources
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (resource_type, name) = parse_target(t);
                self.filter(|r| matches_filter(r, resource_type.as_deref(), name.as_deref()))
            }
        }
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.resources.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Parse a target string like "type.name" into (type, name)
///
/// Only the first dot separates; names may contain dots.
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some(("", name)) => (None, Some(name.to_string())),
        Some((kind, name)) => (Some(kind.to_string()), Some(name.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(
    resource: &dyn Resource,
    resource_type: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let kind = resource.resource_type();
        let matches_type = match rt {
            "resources" => matches!(kind, "primitive" | "group"),
            "constraints" => matches!(kind, "location" | "colocation" | "order" | "order_set"),
            "properties" => matches!(kind, "property" | "resource_defaults"),
            _ => kind == rt || kind.starts_with(rt),
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.id().contains(n)
    {
        return false;
    }

    true
}
