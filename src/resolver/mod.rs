//! Late-binding attribute resolver
//!
//! Some resources need concrete attributes (literal IP addresses, say) of
//! infrastructure that does not exist yet when the graph is built. The
//! resolver registers a read-only query and hands back one
//! [`DeferredValue`] per target. Nothing is called at construction time;
//! the executor runs the query once its targets are provisioned.
//!
//! # Module Structure
//!
//! - [`path`] - Field paths and index templates
//! - [`policy`] - Single-action permission grant
//! - [`query`] - The read query descriptor
//!
//! # Example
//!
//! ```ignore
//! let endpoint = ResourceId::new("AppRunnerRequestsEndpointId");
//! let eni_ids = (0..2).map(|i| endpoint.select(i, "NetworkInterfaceIds")).collect();
//! let resolver = eni_ip_resolver("EniIpAddressResolverId", eni_ids)?;
//! let ips = resolver.get_values();
//! ```

pub mod path;
pub mod policy;
pub mod query;

pub use path::{FieldPath, FieldPathTemplate, PathError};
pub use policy::{PolicyStatement, ResourceScope};
pub use query::{ReadQuery, DEFAULT_TIMEOUT};

use crate::error::{Error, Result};
use crate::graph::{DeferredValue, Prop, ResourceId};
use std::collections::BTreeMap;
use std::time::Duration;

/// Registered read query plus the deferred values it will produce
#[derive(Debug, Clone)]
pub struct AttributeResolver {
    query: ReadQuery,
}

impl AttributeResolver {
    pub fn builder(id: &str, service: &str, action: &str) -> ResolverBuilder {
        ResolverBuilder {
            id: id.to_string(),
            service: service.to_string(),
            action: action.to_string(),
            target_param: String::new(),
            targets: Vec::new(),
            extra_params: BTreeMap::new(),
            physical_id: None,
            timeout: DEFAULT_TIMEOUT,
            scope: Vec::new(),
            paths: PathSpec::Unset,
        }
    }

    /// One deferred value per target, in target order
    pub fn get_values(&self) -> Vec<DeferredValue> {
        self.query
            .paths
            .iter()
            .map(|path| DeferredValue::new(self.query.id.clone(), path.clone()))
            .collect()
    }

    pub fn query(&self) -> &ReadQuery {
        &self.query
    }

    pub fn id(&self) -> &ResourceId {
        &self.query.id
    }
}

#[derive(Debug, Clone)]
enum PathSpec {
    Unset,
    Template(String),
    Explicit(Vec<FieldPath>),
}

/// Builder for [`AttributeResolver`]
#[derive(Debug, Clone)]
pub struct ResolverBuilder {
    id: String,
    service: String,
    action: String,
    target_param: String,
    targets: Vec<Prop>,
    extra_params: BTreeMap<String, Prop>,
    physical_id: Option<String>,
    timeout: Duration,
    scope: Vec<String>,
    paths: PathSpec,
}

impl ResolverBuilder {
    /// Targets passed to the call under `param`. Literal ids or references.
    pub fn targets<I, T>(mut self, param: &str, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Prop>,
    {
        self.target_param = param.to_string();
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Additional call parameter
    pub fn param(mut self, key: &str, value: impl Into<Prop>) -> Self {
        self.extra_params.insert(key.to_string(), value.into());
        self
    }

    pub fn physical_id(mut self, id: &str) -> Self {
        self.physical_id = Some(id.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Narrow the permission grant from `*` to these ARNs
    pub fn scoped_to(mut self, arns: Vec<String>) -> Self {
        self.scope = arns;
        self
    }

    /// One path per target from a `{i}` template
    pub fn path_template(mut self, template: &str) -> Self {
        self.paths = PathSpec::Template(template.to_string());
        self
    }

    /// Explicit paths, one per target
    pub fn paths(mut self, paths: Vec<FieldPath>) -> Self {
        self.paths = PathSpec::Explicit(paths);
        self
    }

    pub fn build(self) -> Result<AttributeResolver> {
        for (what, value) in [
            ("logical id", &self.id),
            ("service", &self.service),
            ("action", &self.action),
            ("target parameter", &self.target_param),
        ] {
            if value.trim().is_empty() {
                return Err(Error::construction(format!("resolver {} is empty", what)));
            }
        }

        let paths = match self.paths {
            PathSpec::Unset => {
                return Err(Error::construction(format!(
                    "resolver '{}' declares no field paths",
                    self.id
                )))
            }
            PathSpec::Template(template) => {
                FieldPathTemplate::parse(&template)?.expand(self.targets.len())
            }
            PathSpec::Explicit(paths) => {
                if paths.len() != self.targets.len() {
                    return Err(Error::construction(format!(
                        "resolver '{}' has {} field paths for {} targets",
                        self.id,
                        paths.len(),
                        self.targets.len()
                    )));
                }
                paths
            }
        };

        let policy = PolicyStatement::for_call(&self.service, &self.action).scoped_to(self.scope);
        let physical_id = self.physical_id.unwrap_or_else(|| self.id.clone());

        tracing::debug!(
            "resolver {}: {}.{} over {} targets",
            self.id,
            self.service,
            self.action,
            self.targets.len()
        );

        Ok(AttributeResolver {
            query: ReadQuery {
                id: ResourceId::new(self.id),
                service: self.service,
                action: self.action,
                target_param: self.target_param,
                targets: self.targets,
                extra_params: self.extra_params,
                physical_id,
                paths,
                policy,
                timeout: self.timeout,
            },
        })
    }
}

/// Private IP address of each network interface, in input order
pub fn eni_ip_lookup<I, T>(id: &str, network_interface_ids: I) -> ResolverBuilder
where
    I: IntoIterator<Item = T>,
    T: Into<Prop>,
{
    AttributeResolver::builder(id, "EC2", "describeNetworkInterfaces")
        .targets("NetworkInterfaceIds", network_interface_ids)
        .path_template("NetworkInterfaces.{i}.PrivateIpAddress")
        .physical_id("EniIPLookup")
}

/// [`eni_ip_lookup`] with the default wildcard policy
pub fn eni_ip_resolver<I, T>(id: &str, network_interface_ids: I) -> Result<AttributeResolver>
where
    I: IntoIterator<Item = T>,
    T: Into<Prop>,
{
    eni_ip_lookup(id, network_interface_ids).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection_resolver(targets: &[&str]) -> AttributeResolver {
        AttributeResolver::builder("Lookup", "EC2", "describeNetworkInterfaces")
            .targets("NetworkInterfaceIds", targets.iter().copied())
            .path_template("Collection.{i}.Attribute")
            .build()
            .unwrap()
    }

    #[test]
    fn test_one_value_per_target_in_order() {
        let resolver = collection_resolver(&["eni-1", "eni-2", "eni-3"]);
        let paths: Vec<String> = resolver
            .get_values()
            .iter()
            .map(|v| v.path().to_string())
            .collect();
        assert_eq!(
            paths,
            vec!["Collection.0.Attribute", "Collection.1.Attribute", "Collection.2.Attribute"]
        );
        assert!(resolver.get_values().iter().all(|v| v.query().as_str() == "Lookup"));
    }

    #[test]
    fn test_empty_targets_yield_no_values() {
        let resolver = collection_resolver(&[]);
        assert!(resolver.get_values().is_empty());
        assert!(resolver.query().is_noop());
    }

    #[test]
    fn test_explicit_path_count_mismatch() {
        let err = AttributeResolver::builder("Lookup", "EC2", "describeNetworkInterfaces")
            .targets("NetworkInterfaceIds", ["eni-1", "eni-2"])
            .paths(vec![FieldPath::parse("Collection.0.Attribute").unwrap()])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Construction(msg) if msg.contains("1 field paths for 2 targets")));
    }

    #[test]
    fn test_missing_paths_and_params_rejected() {
        let err = AttributeResolver::builder("Lookup", "EC2", "describeNetworkInterfaces")
            .targets("NetworkInterfaceIds", ["eni-1"])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Construction(_)));

        let err = AttributeResolver::builder("Lookup", "", "describeNetworkInterfaces")
            .targets("NetworkInterfaceIds", ["eni-1"])
            .path_template("A.{i}")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Construction(msg) if msg.contains("service")));
    }

    #[test]
    fn test_eni_preset() {
        let endpoint = ResourceId::new("Endpoint");
        let ids: Vec<Prop> = (0..2).map(|i| endpoint.select(i, "NetworkInterfaceIds")).collect();
        let resolver = eni_ip_resolver("EniIpAddressResolverId", ids).unwrap();
        let query = resolver.query();

        assert_eq!(query.physical_id(), "EniIPLookup");
        assert_eq!(query.timeout(), Duration::from_secs(300));
        assert_eq!(query.policy().action(), "ec2:DescribeNetworkInterfaces");
        assert_eq!(query.policy().scope(), &ResourceScope::Any);
        assert_eq!(
            resolver.get_values()[1].path().as_str(),
            "NetworkInterfaces.1.PrivateIpAddress"
        );
        assert!(!query.parameters().is_concrete());
    }
}
