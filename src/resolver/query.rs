//! Read query descriptors
//!
//! A [`ReadQuery`] is pure data: which read-only call to make, against which
//! targets, and which fields to pull out of the response. Running it is the
//! executor's job.

use super::path::FieldPath;
use super::policy::PolicyStatement;
use crate::graph::{Prop, Resource, ResourceId, ResourceKind};
use std::collections::BTreeMap;
use std::time::Duration;

/// Operation-level timeout for a read call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Read-only call against already-provisioned infrastructure
#[derive(Debug, Clone, PartialEq)]
pub struct ReadQuery {
    pub(crate) id: ResourceId,
    pub(crate) service: String,
    pub(crate) action: String,
    pub(crate) target_param: String,
    pub(crate) targets: Vec<Prop>,
    pub(crate) extra_params: BTreeMap<String, Prop>,
    pub(crate) physical_id: String,
    pub(crate) paths: Vec<FieldPath>,
    pub(crate) policy: PolicyStatement,
    pub(crate) timeout: Duration,
}

impl ReadQuery {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn target_param(&self) -> &str {
        &self.target_param
    }

    pub fn targets(&self) -> &[Prop] {
        &self.targets
    }

    /// Identity reused across applies so the lookup is updated, not replaced
    pub fn physical_id(&self) -> &str {
        &self.physical_id
    }

    pub fn paths(&self) -> &[FieldPath] {
        &self.paths
    }

    pub fn policy(&self) -> &PolicyStatement {
        &self.policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// No targets means no call
    pub fn is_noop(&self) -> bool {
        self.targets.is_empty()
    }

    /// Call parameters, targets included, still unresolved
    pub fn parameters(&self) -> Prop {
        let mut params = self.extra_params.clone();
        params.insert(
            self.target_param.clone(),
            Prop::List(self.targets.clone()),
        );
        Prop::Map(params)
    }

    /// Lookup node carrying this query in the resource graph
    pub fn to_resource(&self) -> Resource {
        let paths: Vec<Prop> = self.paths.iter().map(|p| Prop::from(p.as_str())).collect();

        Resource::new(self.id.as_str(), ResourceKind::AttributeLookup)
            .with("Service", self.service.as_str())
            .with("Action", self.action.as_str())
            .with("Parameters", self.parameters())
            .with("PhysicalResourceId", self.physical_id.as_str())
            .with("OutputPaths", Prop::List(paths))
            .with("Policy", Prop::from(self.policy.to_document()))
            .with("TimeoutSeconds", Prop::Number(self.timeout.as_secs().into()))
    }
}
