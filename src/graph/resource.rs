//! Resource definitions

use super::value::{Prop, ResourceId};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Kind of provisioned entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Vpc,
    Subnet,
    SecurityGroup,
    SecurityGroupIngress,
    InterfaceEndpoint,
    NetworkLoadBalancer,
    TargetGroup,
    Listener,
    VpcConnector,
    IamRole,
    ContainerService,
    VpcIngressConnection,
    VpcLink,
    RestApi,
    ApiResource,
    ApiMethod,
    /// Custom resource backing a read query
    AttributeLookup,
}

impl ResourceKind {
    /// Provisioning API type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "AWS::EC2::VPC",
            ResourceKind::Subnet => "AWS::EC2::Subnet",
            ResourceKind::SecurityGroup => "AWS::EC2::SecurityGroup",
            ResourceKind::SecurityGroupIngress => "AWS::EC2::SecurityGroupIngress",
            ResourceKind::InterfaceEndpoint => "AWS::EC2::VPCEndpoint",
            ResourceKind::NetworkLoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            ResourceKind::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            ResourceKind::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            ResourceKind::VpcConnector => "AWS::AppRunner::VpcConnector",
            ResourceKind::IamRole => "AWS::IAM::Role",
            ResourceKind::ContainerService => "AWS::AppRunner::Service",
            ResourceKind::VpcIngressConnection => "AWS::AppRunner::VpcIngressConnection",
            ResourceKind::VpcLink => "AWS::ApiGateway::VpcLink",
            ResourceKind::RestApi => "AWS::ApiGateway::RestApi",
            ResourceKind::ApiResource => "AWS::ApiGateway::Resource",
            ResourceKind::ApiMethod => "AWS::ApiGateway::Method",
            ResourceKind::AttributeLookup => "Custom::AttributeLookup",
        }
    }

    /// Output attributes populated once the resource is provisioned.
    ///
    /// `None` means the set is open: lookups expose whatever field paths
    /// they declare.
    pub fn outputs(&self) -> Option<&'static [&'static str]> {
        let outputs: &'static [&'static str] = match self {
            ResourceKind::Vpc => &["VpcId", "CidrBlock"],
            ResourceKind::Subnet => &["SubnetId", "AvailabilityZone"],
            ResourceKind::SecurityGroup => &["GroupId"],
            ResourceKind::SecurityGroupIngress => &["Id"],
            ResourceKind::InterfaceEndpoint => &["Id", "NetworkInterfaceIds", "DnsEntries"],
            ResourceKind::NetworkLoadBalancer => &["LoadBalancerArn", "DNSName"],
            ResourceKind::TargetGroup => &["TargetGroupArn"],
            ResourceKind::Listener => &["ListenerArn"],
            ResourceKind::VpcConnector => &["VpcConnectorArn"],
            ResourceKind::IamRole => &["Arn", "RoleId"],
            ResourceKind::ContainerService => &["ServiceArn", "ServiceUrl"],
            ResourceKind::VpcIngressConnection => &["VpcIngressConnectionArn", "DomainName"],
            ResourceKind::VpcLink => &["Id"],
            ResourceKind::RestApi => &["RestApiId", "RootResourceId"],
            ResourceKind::ApiResource => &["ResourceId"],
            ResourceKind::ApiMethod => &["Id"],
            ResourceKind::AttributeLookup => return None,
        };
        Some(outputs)
    }

    pub fn has_output(&self, attribute: &str) -> bool {
        self.outputs()
            .map(|outputs| outputs.contains(&attribute))
            .unwrap_or(true)
    }
}

/// A resource in the graph
#[derive(Debug, Clone)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub properties: BTreeMap<String, Prop>,
    /// Explicit ordering edges on top of those implied by references
    pub depends_on: Vec<ResourceId>,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: ResourceId::new(id),
            kind,
            properties: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Prop>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn depends_on(mut self, id: &ResourceId) -> Self {
        if !self.depends_on.contains(id) {
            self.depends_on.push(id.clone());
        }
        self
    }

    /// Every resource this one must wait for, in first-seen order
    pub fn dependencies(&self) -> Vec<ResourceId> {
        let mut deps: Vec<ResourceId> = Vec::new();
        let mut push = |id: &ResourceId| {
            if id != &self.id && !deps.contains(id) {
                deps.push(id.clone());
            }
        };

        for prop in self.properties.values() {
            prop.for_each_ref(&mut |r| push(&r.resource));
            prop.for_each_deferred(&mut |d| push(d.query()));
        }
        for id in &self.depends_on {
            push(id);
        }
        deps
    }

    pub fn to_template(&self) -> Value {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.to_template()))
            .collect();

        let mut body = Map::new();
        body.insert("Type".to_string(), Value::String(self.kind.type_name().to_string()));
        body.insert("Properties".to_string(), Value::Object(properties));
        if !self.depends_on.is_empty() {
            body.insert(
                "DependsOn".to_string(),
                Value::Array(
                    self.depends_on
                        .iter()
                        .map(|id| Value::String(id.to_string()))
                        .collect(),
                ),
            );
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_deduplicated() {
        let vpc = ResourceId::new("Vpc");
        let sg = Resource::new("Sg", ResourceKind::SecurityGroup)
            .with("VpcId", vpc.attr("VpcId"))
            .with("Cidr", vpc.attr("CidrBlock"))
            .depends_on(&vpc);

        assert_eq!(sg.dependencies(), vec![vpc]);
    }

    #[test]
    fn test_lookup_outputs_are_open() {
        assert!(ResourceKind::AttributeLookup.has_output("NetworkInterfaces.0.PrivateIpAddress"));
        assert!(ResourceKind::Vpc.has_output("VpcId"));
        assert!(!ResourceKind::Vpc.has_output("DNSName"));
    }
}
