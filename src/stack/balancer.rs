//! Internal network load balancer in front of the request endpoint
//!
//! The target group needs literal IP addresses, which are only known once
//! the endpoint's network interfaces exist. They come from the ENI lookup.

use super::network::Network;
use super::StackConfig;
use crate::error::Result;
use crate::graph::{Prop, Resource, ResourceGraph, ResourceId, ResourceKind};
use crate::resolver::{eni_ip_lookup, AttributeResolver};

pub const ENI_RESOLVER: &str = "EniIpAddressResolverId";
pub const LOAD_BALANCER: &str = "NLBAppRunnerId";
pub const TARGET_GROUP: &str = "NLBAppRunnerTargetGroupId";
pub const LISTENER: &str = "NLBAppRunnerListenerId";

#[derive(Debug, Clone)]
pub struct Balancer {
    pub resolver: AttributeResolver,
    pub load_balancer: ResourceId,
    pub target_group: ResourceId,
    pub listener: ResourceId,
}

pub fn declare(graph: &mut ResourceGraph, config: &StackConfig, network: &Network) -> Result<Balancer> {
    // The endpoint places one interface in each subnet
    let eni_ids: Vec<Prop> = (0..network.subnets.len())
        .map(|i| network.endpoint.select(i, "NetworkInterfaceIds"))
        .collect();

    let resolver = eni_ip_lookup(ENI_RESOLVER, eni_ids)
        .scoped_to(config.lookup_scope.clone())
        .build()?;
    graph.add_resolver(&resolver)?;

    let load_balancer = graph.add(
        Resource::new(LOAD_BALANCER, ResourceKind::NetworkLoadBalancer)
            .with("Name", config.load_balancer_name.as_str())
            .with("Type", "network")
            .with("Scheme", "internal")
            .with("Subnets", network.subnet_ids())
            .with("SecurityGroups", network.security_group_ids())
            .with(
                "LoadBalancerAttributes",
                Prop::list(vec![Prop::map([
                    ("Key", Prop::from("load_balancing.cross_zone.enabled")),
                    ("Value", Prop::from("true")),
                ])]),
            )
            .with("EnforceSecurityGroupInboundRulesOnPrivateLinkTraffic", "off"),
    )?;

    let targets = Prop::list(resolver.get_values().into_iter().map(|ip| {
        Prop::map([("Id", Prop::from(ip)), ("Port", Prop::from(config.port))])
    }));

    let target_group = graph.add(
        Resource::new(TARGET_GROUP, ResourceKind::TargetGroup)
            .with("Name", config.target_group_name.as_str())
            .with("VpcId", network.vpc.attr("VpcId"))
            .with("Port", config.port)
            .with("Protocol", "TCP")
            .with("TargetType", "ip")
            .with("Targets", targets),
    )?;

    let listener = graph.add(
        Resource::new(LISTENER, ResourceKind::Listener)
            .with("LoadBalancerArn", load_balancer.attr("LoadBalancerArn"))
            .with("Port", config.port)
            .with("Protocol", "TCP")
            .with(
                "DefaultActions",
                Prop::list(vec![Prop::map([
                    ("Type", Prop::from("forward")),
                    ("TargetGroupArn", Prop::from(target_group.attr("TargetGroupArn"))),
                ])]),
            ),
    )?;

    Ok(Balancer {
        resolver,
        load_balancer,
        target_group,
        listener,
    })
}
