//! Resource graph
//!
//! Resources are added in declaration order. Edges come from the references
//! held in resource properties plus explicit `depends_on` entries.
//!
//! # Module Structure
//!
//! - [`value`] - Property values, references and deferred values
//! - [`resource`] - Resource kinds and definitions

pub mod resource;
pub mod value;

pub use resource::{Resource, ResourceKind};
pub use value::{AttrRef, DeferredValue, Prop, ResourceId};

use crate::error::{Error, Result};
use crate::resolver::{AttributeResolver, ReadQuery};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};

/// One step of a deploy, in dependency order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Provision(ResourceId),
    Resolve(ResourceId),
}

impl Step {
    pub fn id(&self) -> &ResourceId {
        match self {
            Step::Provision(id) | Step::Resolve(id) => id,
        }
    }
}

/// Dependency graph of resource definitions
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    resources: Vec<Resource>,
    index: HashMap<ResourceId, usize>,
    queries: BTreeMap<ResourceId, ReadQuery>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. Every reference must point at an already declared
    /// resource and one of its output attributes.
    pub fn add(&mut self, resource: Resource) -> Result<ResourceId> {
        if self.index.contains_key(&resource.id) {
            return Err(Error::DuplicateResource(resource.id.to_string()));
        }
        self.check_references(&resource)?;

        let id = resource.id.clone();
        tracing::debug!("add resource {} ({})", id, resource.kind.type_name());
        self.index.insert(id.clone(), self.resources.len());
        self.resources.push(resource);
        Ok(id)
    }

    /// Register a resolver's read query as a lookup node
    pub fn add_resolver(&mut self, resolver: &AttributeResolver) -> Result<ResourceId> {
        let query = resolver.query().clone();
        let id = self.add(query.to_resource())?;
        self.queries.insert(id.clone(), query);
        Ok(id)
    }

    fn check_references(&self, resource: &Resource) -> Result<()> {
        let mut missing: Option<Error> = None;
        let mut check = |id: &ResourceId, attribute: Option<&str>| {
            if missing.is_some() {
                return;
            }
            match self.get(id) {
                None => missing = Some(Error::UnknownResource(id.to_string())),
                Some(target) => {
                    if let Some(attribute) = attribute {
                        if !target.kind.has_output(attribute) {
                            missing = Some(Error::UnknownAttribute {
                                resource: id.to_string(),
                                attribute: attribute.to_string(),
                            });
                        }
                    }
                }
            }
        };

        for prop in resource.properties.values() {
            prop.for_each_ref(&mut |r| check(&r.resource, Some(&r.attribute)));
            prop.for_each_deferred(&mut |d| check(d.query(), None));
        }
        for id in &resource.depends_on {
            check(id, None);
        }

        match missing {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Resource> {
        self.index.get(id).map(|&i| &self.resources[i])
    }

    pub fn query(&self, id: &ResourceId) -> Option<&ReadQuery> {
        self.queries.get(id)
    }

    pub fn queries(&self) -> impl Iterator<Item = &ReadQuery> {
        self.queries.values()
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources whose properties consume a deferred value of `query`
    pub fn consumers_of(&self, query: &ResourceId) -> Vec<&ResourceId> {
        self.resources
            .iter()
            .filter(|r| {
                let mut found = false;
                for prop in r.properties.values() {
                    prop.for_each_deferred(&mut |d| found |= d.query() == query);
                }
                found
            })
            .map(|r| &r.id)
            .collect()
    }

    /// Kahn's algorithm, picking ready resources in declaration order
    pub fn topological_order(&self) -> Result<Vec<ResourceId>> {
        let n = self.resources.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, resource) in self.resources.iter().enumerate() {
            for dep in resource.dependencies() {
                let Some(&j) = self.index.get(&dep) else {
                    return Err(Error::UnknownResource(dep.to_string()));
                };
                in_degree[i] += 1;
                dependents[j].push(i);
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut done = vec![false; n];
        while order.len() < n {
            let Some(next) = (0..n).find(|&i| !done[i] && in_degree[i] == 0) else {
                let stuck = (0..n)
                    .find(|&i| !done[i])
                    .map(|i| self.resources[i].id.to_string())
                    .unwrap_or_default();
                return Err(Error::Cycle(stuck));
            };
            done[next] = true;
            for &d in &dependents[next] {
                in_degree[d] -= 1;
            }
            order.push(self.resources[next].id.clone());
        }

        Ok(order)
    }

    /// Deploy steps: lookups become resolve steps, the rest provision steps
    pub fn plan(&self) -> Result<Vec<Step>> {
        Ok(self
            .topological_order()?
            .into_iter()
            .map(|id| {
                if self.queries.contains_key(&id) {
                    Step::Resolve(id)
                } else {
                    Step::Provision(id)
                }
            })
            .collect())
    }

    /// Synthesise the provisioning template
    pub fn to_template(&self) -> Value {
        let resources: Map<String, Value> = self
            .resources
            .iter()
            .map(|r| (r.id.to_string(), r.to_template()))
            .collect();
        json!({ "Resources": resources })
    }
}
