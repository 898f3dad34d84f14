//! Execution planner - ordered list of resources to reconcile

use crate::resource::{BoxedResource, Resource};

/// An ordered list of resources, applied one after another
///
/// Order matters: a resource may depend on identities assigned to an
/// earlier one, so callers add resources in dependency order.
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    /// Resources in execution order
    pub resources: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource
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
            Some(t) => self.filter(|r| matches_target(t, r.resource_type(), &r.address())),
        }
    }

    /// Addresses of every resource, in order
    pub fn addresses(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.address()).collect()
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
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((kind, name)) if !name.contains('.') => {
            (Some(kind.to_string()), Some(name.to_string()))
        }
        Some(_) => (None, Some(target.to_string())),
    }
}

/// Check if a resource of `resource_type` at `address` matches a target
/// pattern ("type", "type.name", plural type aliases allowed)
pub fn matches_target(target: &str, resource_type: &str, address: &str) -> bool {
    let (kind, name) = parse_target(target);

    if let Some(rt) = kind.as_deref() {
        // Allow plural aliases ("clients", "grants")
        let matches_type = resource_type == rt || rt.strip_suffix('s') == Some(resource_type);
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name.as_deref() {
        let own_name = address.split_once('.').map_or(address, |(_, n)| n);
        if own_name != n {
            return false;
        }
    }

    true
}
