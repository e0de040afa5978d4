//! Private container service behind an API gateway
//!
//! ```text
//!  REST API {proxy+} ──VPC link──▶ internal NLB ──TCP/443──▶ endpoint ENI IPs
//!                                                              │
//!                                       VPC ingress connection ▼
//!                                                   container service
//! ```
//!
//! The NLB target group is registered by IP address, and those addresses
//! belong to network interfaces the request endpoint creates. They are
//! looked up at deploy time by the ENI resolver.
//!
//! # Module Structure
//!
//! - [`network`] - VPC, subnets, security group, request endpoint
//! - [`balancer`] - ENI lookup, NLB, target group, listener
//! - [`compute`] - VPC connector, access role, service, ingress connection
//! - [`gateway`] - VPC link, REST API, proxy route

pub mod balancer;
pub mod compute;
pub mod gateway;
pub mod network;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::graph::ResourceGraph;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_ZONE_SUFFIXES: [&str; 2] = ["a", "b"];

/// Stack parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Unset means the configured or environment region
    pub region: Option<String>,
    pub vpc_name: String,
    pub vpc_cidr: String,
    /// One private subnet per zone; empty means `{region}a` and `{region}b`
    pub availability_zones: Vec<String>,
    pub subnet_name: String,
    pub subnet_cidr_mask: u8,
    pub security_group_name: String,
    pub load_balancer_name: String,
    pub target_group_name: String,
    pub port: u16,
    pub vpc_connector_name: String,
    pub access_role_name: String,
    pub image_identifier: String,
    pub health_check_path: String,
    pub ingress_connection_name: String,
    pub vpc_link_name: String,
    pub rest_api_name: String,
    /// ARNs the ENI lookup may read; empty means `*`
    pub lookup_scope: Vec<String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            region: None,
            vpc_name: "my-vpc".to_string(),
            vpc_cidr: "10.0.0.0/16".to_string(),
            availability_zones: Vec::new(),
            subnet_name: "my-private-subnet".to_string(),
            subnet_cidr_mask: 24,
            security_group_name: "security-group".to_string(),
            load_balancer_name: "nlb-app-runner".to_string(),
            target_group_name: "my-nlb-app-runner-tg".to_string(),
            port: 443,
            vpc_connector_name: "my-arvpcconn".to_string(),
            access_role_name: "my-apprunner-access-role".to_string(),
            image_identifier: "my-app-image:latest".to_string(),
            health_check_path: "/".to_string(),
            ingress_connection_name: "my-arvpcincon".to_string(),
            vpc_link_name: "my-nlb-vpc-link".to_string(),
            rest_api_name: "my-rest-api".to_string(),
            lookup_scope: Vec::new(),
        }
    }
}

impl StackConfig {
    /// Load parameters from a YAML file; missing keys keep their defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read stack file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse stack file {}", path.display()))?;
        Ok(config)
    }

    /// Fill in the region: CLI > stack file > config file > environment > default
    pub fn with_region(mut self, cli: Option<&str>, config: &Config) -> Self {
        if let Some(region) = cli {
            self.region = Some(region.to_string());
        } else if self.region.is_none() {
            self.region = Some(config.effective_region(None));
        }
        self
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// Zones to place subnets in
    pub fn zones(&self) -> Vec<String> {
        if !self.availability_zones.is_empty() {
            return self.availability_zones.clone();
        }
        DEFAULT_ZONE_SUFFIXES
            .iter()
            .map(|suffix| format!("{}{}", self.region(), suffix))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let region = self.region();
        if region.trim().is_empty() {
            return Err(Error::construction("region is empty"));
        }
        if let Some(zone) = self.zones().iter().find(|z| !z.starts_with(region)) {
            return Err(Error::construction(format!(
                "availability zone '{}' is not in region {}",
                zone, region
            )));
        }
        if self.port == 0 {
            return Err(Error::construction("port must be non-zero"));
        }
        for (what, value) in [
            ("vpc_name", &self.vpc_name),
            ("load_balancer_name", &self.load_balancer_name),
            ("target_group_name", &self.target_group_name),
            ("image_identifier", &self.image_identifier),
        ] {
            if value.trim().is_empty() {
                return Err(Error::construction(format!("{} is empty", what)));
            }
        }
        Ok(())
    }
}

/// The built graph and the handles of its notable parts
#[derive(Debug, Clone)]
pub struct Stack {
    pub config: StackConfig,
    pub graph: ResourceGraph,
    pub network: network::Network,
    pub balancer: balancer::Balancer,
    pub compute: compute::Compute,
    pub gateway: gateway::Gateway,
}

/// Declare the whole stack
pub fn build(config: &StackConfig) -> Result<Stack> {
    config.validate()?;

    let mut graph = ResourceGraph::new();
    let network = network::declare(&mut graph, config)?;
    let balancer = balancer::declare(&mut graph, config, &network)?;
    let compute = compute::declare(&mut graph, config, &network)?;
    let gateway = gateway::declare(&mut graph, config, &balancer, &compute)?;

    tracing::info!(
        "built stack: {} resources, {} lookups",
        graph.len(),
        graph.queries().count()
    );

    Ok(Stack {
        config: config.clone(),
        graph,
        network,
        balancer,
        compute,
        gateway,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ResourceId, Step};
    use serde_json::json;

    fn position(order: &[ResourceId], id: &str) -> usize {
        order.iter().position(|r| r.as_str() == id).unwrap()
    }

    #[test]
    fn test_default_stack_builds() {
        let stack = build(&StackConfig::default()).unwrap();
        assert_eq!(stack.network.subnets.len(), 2);
        assert_eq!(stack.balancer.resolver.get_values().len(), 2);
        assert_eq!(stack.graph.queries().count(), 1);
    }

    #[test]
    fn test_lookup_sits_between_endpoint_and_target_group() {
        let stack = build(&StackConfig::default()).unwrap();
        let order = stack.graph.topological_order().unwrap();

        let endpoint = position(&order, network::REQUESTS_ENDPOINT);
        let lookup = position(&order, balancer::ENI_RESOLVER);
        let target_group = position(&order, balancer::TARGET_GROUP);
        let listener = position(&order, balancer::LISTENER);
        assert!(endpoint < lookup);
        assert!(lookup < target_group);
        assert!(target_group < listener);

        let plan = stack.graph.plan().unwrap();
        assert_eq!(
            plan.iter().filter(|s| matches!(s, Step::Resolve(_))).count(),
            1
        );
    }

    #[test]
    fn test_only_target_group_consumes_lookup() {
        let stack = build(&StackConfig::default()).unwrap();
        let consumers = stack.graph.consumers_of(stack.balancer.resolver.id());
        assert_eq!(consumers.len(), 1);
        assert_eq!(consumers[0].as_str(), balancer::TARGET_GROUP);
    }

    #[test]
    fn test_template_wiring() {
        let stack = build(&StackConfig::default()).unwrap();
        let template = stack.graph.to_template();
        let resources = &template["Resources"];

        assert_eq!(
            resources[balancer::TARGET_GROUP]["Properties"]["Targets"][1]["Id"],
            json!({ "Fn::GetAtt": [balancer::ENI_RESOLVER, "NetworkInterfaces.1.PrivateIpAddress"] })
        );
        assert_eq!(
            resources[balancer::ENI_RESOLVER]["Properties"]["Parameters"]["NetworkInterfaceIds"][0],
            json!({ "Fn::Select": [0, { "Fn::GetAtt": [network::REQUESTS_ENDPOINT, "NetworkInterfaceIds"] }] })
        );
        assert_eq!(
            resources[balancer::ENI_RESOLVER]["Properties"]["Policy"]["Statement"][0]["Action"],
            json!(["ec2:DescribeNetworkInterfaces"])
        );
        assert_eq!(
            resources[gateway::PROXY_METHOD]["Properties"]["ApiKeyRequired"],
            json!(true)
        );
        assert_eq!(
            resources["PrivateSubnet2"]["Properties"]["CidrBlock"],
            json!("10.0.1.0/24")
        );
    }

    #[test]
    fn test_zone_count_drives_lookup_size() {
        let config = StackConfig {
            availability_zones: vec!["us-east-1a".into(), "us-east-1b".into(), "us-east-1c".into()],
            ..Default::default()
        };
        let stack = build(&config).unwrap();
        assert_eq!(stack.balancer.resolver.get_values().len(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = StackConfig {
            port: 0,
            ..Default::default()
        };
        assert!(matches!(build(&config), Err(Error::Construction(_))));
    }

    #[test]
    fn test_zones_outside_region_rejected() {
        let config = StackConfig {
            region: Some("eu-west-1".into()),
            availability_zones: vec!["us-east-1a".into(), "us-east-1b".into()],
            ..Default::default()
        };
        let err = build(&config).unwrap_err();
        assert!(matches!(err, Error::Construction(msg) if msg.contains("us-east-1a")));
    }

    #[test]
    fn test_default_zones_follow_region() {
        let config = StackConfig::default().with_region(Some("eu-west-1"), &Config::default());
        assert_eq!(config.zones(), vec!["eu-west-1a", "eu-west-1b"]);

        let stack = build(&config).unwrap();
        let resources = &stack.graph.to_template()["Resources"];
        assert_eq!(
            resources[network::REQUESTS_ENDPOINT]["Properties"]["ServiceName"],
            json!("com.amazonaws.eu-west-1.apprunner.requests")
        );
        assert_eq!(
            resources["PrivateSubnet1"]["Properties"]["AvailabilityZone"],
            json!("eu-west-1a")
        );
        assert_eq!(
            resources["PrivateSubnet2"]["Properties"]["AvailabilityZone"],
            json!("eu-west-1b")
        );
    }

    #[test]
    fn test_region_precedence() {
        let config = Config {
            region: Some("eu-west-1".to_string()),
            ..Default::default()
        };

        // stack file without a region takes the configured one
        let from_file: StackConfig = serde_yaml::from_str("vpc_name: prod-vpc\n").unwrap();
        assert!(from_file.region.is_none());
        let merged = from_file.clone().with_region(None, &config);
        assert_eq!(merged.region(), "eu-west-1");
        assert_eq!(merged.zones(), vec!["eu-west-1a", "eu-west-1b"]);

        let pinned: StackConfig = serde_yaml::from_str("region: ap-south-1\n").unwrap();
        assert_eq!(pinned.with_region(None, &config).region(), "ap-south-1");

        assert_eq!(from_file.with_region(Some("ca-central-1"), &config).region(), "ca-central-1");
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let config: StackConfig =
            serde_yaml::from_str("vpc_name: prod-vpc\nlookup_scope: [\"arn:aws:ec2:*:*:network-interface/*\"]\n")
                .unwrap();
        assert_eq!(config.vpc_name, "prod-vpc");
        assert_eq!(config.port, 443);

        let stack = build(&config).unwrap();
        let template = stack.graph.to_template();
        assert_eq!(
            template["Resources"][balancer::ENI_RESOLVER]["Properties"]["Policy"]["Statement"][0]["Resource"],
            json!(["arn:aws:ec2:*:*:network-interface/*"])
        );
    }
}
