//! Container service reachable only through the VPC endpoint

use super::network::Network;
use super::StackConfig;
use crate::error::Result;
use crate::graph::{Prop, Resource, ResourceGraph, ResourceId, ResourceKind};
use serde_json::json;

pub const VPC_CONNECTOR: &str = "AppRunnerVpcConnectorId";
pub const ACCESS_ROLE: &str = "IAMAppRunnerAccessRoleId";
pub const SERVICE: &str = "AppRunnerBackendAPIServiceId";
pub const INGRESS_CONNECTION: &str = "AppRunnerVpcIngressConnectionId";

const BUILD_PRINCIPAL: &str = "build.apprunner.amazonaws.com";
const REGISTRY_READ_ONLY: &str = "arn:aws:iam::aws:policy/AmazonEC2ContainerRegistryReadOnly";

#[derive(Debug, Clone)]
pub struct Compute {
    pub service: ResourceId,
    pub ingress_connection: ResourceId,
}

pub fn declare(graph: &mut ResourceGraph, config: &StackConfig, network: &Network) -> Result<Compute> {
    let connector = graph.add(
        Resource::new(VPC_CONNECTOR, ResourceKind::VpcConnector)
            .with("VpcConnectorName", config.vpc_connector_name.as_str())
            .with("Subnets", network.subnet_ids())
            .with("SecurityGroups", network.security_group_ids()),
    )?;

    let role = graph.add(
        Resource::new(ACCESS_ROLE, ResourceKind::IamRole)
            .with("RoleName", config.access_role_name.as_str())
            .with(
                "AssumeRolePolicyDocument",
                Prop::from(json!({
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": BUILD_PRINCIPAL },
                        "Action": "sts:AssumeRole",
                    }]
                })),
            )
            .with("ManagedPolicyArns", Prop::list(vec![REGISTRY_READ_ONLY])),
    )?;

    let source = Prop::map([
        (
            "AuthenticationConfiguration",
            Prop::map([("AccessRoleArn", Prop::from(role.attr("Arn")))]),
        ),
        (
            "ImageRepository",
            Prop::map([
                ("ImageIdentifier", Prop::from(config.image_identifier.as_str())),
                ("ImageRepositoryType", Prop::from("ECR")),
            ]),
        ),
    ]);

    let network_config = Prop::map([
        (
            "IngressConfiguration",
            Prop::map([("IsPubliclyAccessible", Prop::from(false))]),
        ),
        (
            "EgressConfiguration",
            Prop::map([
                ("EgressType", Prop::from("VPC")),
                ("VpcConnectorArn", Prop::from(connector.attr("VpcConnectorArn"))),
            ]),
        ),
    ]);

    let service = graph.add(
        Resource::new(SERVICE, ResourceKind::ContainerService)
            .with("SourceConfiguration", source)
            .with("NetworkConfiguration", network_config)
            .with(
                "HealthCheckConfiguration",
                Prop::map([("Path", Prop::from(config.health_check_path.as_str()))]),
            ),
    )?;

    let ingress_connection = graph.add(
        Resource::new(INGRESS_CONNECTION, ResourceKind::VpcIngressConnection)
            .with("VpcIngressConnectionName", config.ingress_connection_name.as_str())
            .with("ServiceArn", service.attr("ServiceArn"))
            .with(
                "IngressVpcConfiguration",
                Prop::map([
                    ("VpcId", Prop::from(network.vpc.attr("VpcId"))),
                    ("VpcEndpointId", Prop::from(network.endpoint.attr("Id"))),
                ]),
            ),
    )?;

    Ok(Compute {
        service,
        ingress_connection,
    })
}
