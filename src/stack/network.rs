//! VPC, private subnets, security group and the request endpoint

use super::StackConfig;
use crate::error::{Error, Result};
use crate::graph::{Prop, Resource, ResourceGraph, ResourceId, ResourceKind};
use std::net::Ipv4Addr;

pub const VPC: &str = "VPCId";
pub const SECURITY_GROUP: &str = "SecurityGroupId";
pub const SECURITY_GROUP_SELF_INGRESS: &str = "SecurityGroupIdSelfIngress";
pub const REQUESTS_ENDPOINT: &str = "AppRunnerRequestsEndpointId";

/// Ids of the declared network resources
#[derive(Debug, Clone)]
pub struct Network {
    pub vpc: ResourceId,
    pub subnets: Vec<ResourceId>,
    pub security_group: ResourceId,
    pub endpoint: ResourceId,
}

impl Network {
    pub fn subnet_ids(&self) -> Prop {
        Prop::list(self.subnets.iter().map(|s| s.attr("SubnetId")))
    }

    pub fn security_group_ids(&self) -> Prop {
        Prop::list(vec![self.security_group.attr("GroupId")])
    }
}

pub fn declare(graph: &mut ResourceGraph, config: &StackConfig) -> Result<Network> {
    let vpc = graph.add(
        Resource::new(VPC, ResourceKind::Vpc)
            .with("CidrBlock", config.vpc_cidr.as_str())
            .with("EnableDnsHostnames", true)
            .with("EnableDnsSupport", true)
            .with("Tags", name_tag(&config.vpc_name)),
    )?;

    let zones = config.zones();
    let cidrs = carve_subnets(&config.vpc_cidr, config.subnet_cidr_mask, zones.len())?;

    // One private subnet per availability zone, no NAT gateway
    let mut subnets = Vec::with_capacity(cidrs.len());
    for (i, (zone, cidr)) in zones.iter().zip(cidrs).enumerate() {
        let name = format!("{}/{}{}", config.vpc_name, config.subnet_name, i + 1);
        let subnet = graph.add(
            Resource::new(format!("PrivateSubnet{}", i + 1), ResourceKind::Subnet)
                .with("VpcId", vpc.attr("VpcId"))
                .with("CidrBlock", cidr)
                .with("AvailabilityZone", zone.as_str())
                .with("MapPublicIpOnLaunch", false)
                .with("Tags", name_tag(&name)),
        )?;
        subnets.push(subnet);
    }

    let security_group = graph.add(
        Resource::new(SECURITY_GROUP, ResourceKind::SecurityGroup)
            .with("GroupName", config.security_group_name.as_str())
            .with("GroupDescription", format!("{}/{}", config.vpc_name, config.security_group_name))
            .with("VpcId", vpc.attr("VpcId"))
            .with(
                "SecurityGroupEgress",
                Prop::list(vec![Prop::map([
                    ("CidrIp", Prop::from("0.0.0.0/0")),
                    ("IpProtocol", Prop::from("-1")),
                    ("Description", Prop::from("Allow all outbound traffic by default")),
                ])]),
            ),
    )?;

    graph.add(
        Resource::new(SECURITY_GROUP_SELF_INGRESS, ResourceKind::SecurityGroupIngress)
            .with("GroupId", security_group.attr("GroupId"))
            .with("SourceSecurityGroupId", security_group.attr("GroupId"))
            .with("IpProtocol", "-1")
            .with("Description", "Allow all traffic within the security group"),
    )?;

    let network = Network {
        vpc,
        subnets,
        security_group,
        endpoint: ResourceId::new(REQUESTS_ENDPOINT),
    };

    graph.add(
        Resource::new(REQUESTS_ENDPOINT, ResourceKind::InterfaceEndpoint)
            .with(
                "ServiceName",
                format!("com.amazonaws.{}.apprunner.requests", config.region()),
            )
            .with("VpcEndpointType", "Interface")
            .with("VpcId", network.vpc.attr("VpcId"))
            .with("SubnetIds", network.subnet_ids())
            .with("SecurityGroupIds", network.security_group_ids())
            .with("PrivateDnsEnabled", false),
    )?;

    tracing::debug!("declared network with {} subnets", network.subnets.len());
    Ok(network)
}

fn name_tag(name: &str) -> Prop {
    Prop::list(vec![Prop::map([
        ("Key", Prop::from("Name")),
        ("Value", Prop::from(name)),
    ])])
}

/// Split `vpc_cidr` into `count` consecutive blocks of size `/mask`
pub fn carve_subnets(vpc_cidr: &str, mask: u8, count: usize) -> Result<Vec<String>> {
    let (addr, prefix) = vpc_cidr
        .split_once('/')
        .ok_or_else(|| Error::construction(format!("invalid VPC CIDR '{}'", vpc_cidr)))?;
    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|_| Error::construction(format!("invalid VPC CIDR '{}'", vpc_cidr)))?;
    let prefix: u8 = prefix
        .parse()
        .ok()
        .filter(|p| *p <= 32)
        .ok_or_else(|| Error::construction(format!("invalid VPC CIDR '{}'", vpc_cidr)))?;

    if mask < prefix || mask > 28 {
        return Err(Error::construction(format!(
            "subnet mask /{} does not fit VPC /{}",
            mask, prefix
        )));
    }

    let vpc_size = 1u64 << (32 - prefix);
    let subnet_size = 1u64 << (32 - mask);
    if subnet_size * count as u64 > vpc_size {
        return Err(Error::construction(format!(
            "{} subnets of /{} do not fit in {}",
            count, mask, vpc_cidr
        )));
    }

    let base = u64::from(u32::from(addr)) & !(vpc_size - 1);
    Ok((0..count as u64)
        .map(|i| {
            let start = (base + i * subnet_size) as u32;
            format!("{}/{}", Ipv4Addr::from(start), mask)
        })
        .collect())
}
