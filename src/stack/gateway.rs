//! REST API proxying every path to the private service over a VPC link

use super::balancer::Balancer;
use super::compute::Compute;
use super::StackConfig;
use crate::error::Result;
use crate::graph::{Prop, Resource, ResourceGraph, ResourceId, ResourceKind};

pub const VPC_LINK: &str = "ApiGatewayVpcLinkId";
pub const REST_API: &str = "ApiGatewayRestApiId";
pub const PROXY_RESOURCE: &str = "ApiGatewayProxyResourceId";
pub const PROXY_METHOD: &str = "ApiGatewayProxyAnyMethodId";

#[derive(Debug, Clone)]
pub struct Gateway {
    pub vpc_link: ResourceId,
    pub rest_api: ResourceId,
    pub proxy_method: ResourceId,
}

pub fn declare(
    graph: &mut ResourceGraph,
    config: &StackConfig,
    balancer: &Balancer,
    compute: &Compute,
) -> Result<Gateway> {
    let vpc_link = graph.add(
        Resource::new(VPC_LINK, ResourceKind::VpcLink)
            .with("Name", config.vpc_link_name.as_str())
            .with("Description", "VPC Link for App Runner NLB")
            .with(
                "TargetArns",
                Prop::list(vec![balancer.load_balancer.attr("LoadBalancerArn")]),
            ),
    )?;

    let rest_api = graph.add(
        Resource::new(REST_API, ResourceKind::RestApi).with("Name", config.rest_api_name.as_str()),
    )?;

    let proxy = graph.add(
        Resource::new(PROXY_RESOURCE, ResourceKind::ApiResource)
            .with("RestApiId", rest_api.attr("RestApiId"))
            .with("ParentId", rest_api.attr("RootResourceId"))
            .with("PathPart", "{proxy+}"),
    )?;

    let uri = Prop::Join(vec![
        Prop::from("https://"),
        Prop::from(compute.ingress_connection.attr("DomainName")),
        Prop::from("/{proxy}"),
    ]);

    let integration = Prop::map([
        ("Type", Prop::from("HTTP_PROXY")),
        ("IntegrationHttpMethod", Prop::from("ANY")),
        ("ConnectionType", Prop::from("VPC_LINK")),
        ("ConnectionId", Prop::from(vpc_link.attr("Id"))),
        ("PassthroughBehavior", Prop::from("WHEN_NO_MATCH")),
        (
            "RequestParameters",
            Prop::map([(
                "integration.request.path.proxy",
                Prop::from("method.request.path.proxy"),
            )]),
        ),
        ("Uri", uri),
    ]);

    // Callers need an API key; keys and usage plans are managed separately
    let proxy_method = graph.add(
        Resource::new(PROXY_METHOD, ResourceKind::ApiMethod)
            .with("RestApiId", rest_api.attr("RestApiId"))
            .with("ResourceId", proxy.attr("ResourceId"))
            .with("HttpMethod", "ANY")
            .with("AuthorizationType", "NONE")
            .with("ApiKeyRequired", true)
            .with(
                "RequestParameters",
                Prop::map([("method.request.path.proxy", Prop::from(true))]),
            )
            .with("Integration", integration),
    )?;

    Ok(Gateway {
        vpc_link,
        rest_api,
        proxy_method,
    })
}
