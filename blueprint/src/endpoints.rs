use crate::error::{self, Result};
use crate::naming;
use crate::network::NetworkOutputs;
use eksplan_config::ResolvedConfig;
use eksplan_model::constants::{AWS_SERVICE_ENDPOINTS, DEFAULT_EGRESS_CIDR, HTTPS_PORT};
use eksplan_model::{Configuration, Deferred, Node, NodeKind, NodeRef, ResourceGraph};
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupAttributes {
    pub name: String,
    pub description: String,
    pub vpc_id: Deferred,
    pub ingress: Vec<SecurityGroupRule>,
    pub egress: Vec<SecurityGroupRule>,
}

impl Configuration for SecurityGroupAttributes {}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupRule {
    pub from_port: u16,
    pub to_port: u16,
    pub protocol: String,
    pub cidr_blocks: Vec<String>,
    pub description: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum EndpointType {
    Gateway,
    Interface,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointAttributes {
    pub vpc_id: Deferred,
    pub service_name: String,
    pub vpc_endpoint_type: EndpointType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route_table_ids: Vec<Deferred>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnet_ids: Vec<Deferred>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_group_ids: Vec<Deferred>,
    #[serde(default)]
    pub private_dns_enabled: bool,
}

impl Configuration for EndpointAttributes {}

/// S3 is reached through a free gateway endpoint; every other service needs an interface
/// endpoint.
pub fn endpoint_type(service: &str) -> EndpointType {
    if service == "s3" {
        EndpointType::Gateway
    } else {
        EndpointType::Interface
    }
}

#[derive(Clone, Debug)]
pub struct EndpointOutputs {
    pub security_group: NodeRef,
    pub endpoints: Vec<NodeRef>,
}

/// Private access to AWS APIs from the private subnets without going through a NAT gateway.
pub struct EndpointBuilder<'a> {
    config: &'a ResolvedConfig,
}

impl<'a> EndpointBuilder<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        graph: &mut ResourceGraph,
        network: &NetworkOutputs,
    ) -> Result<EndpointOutputs> {
        let env = self.config.environment.as_str();
        let tags = self.config.tags.to_map();
        let sg_name = naming::endpoint_security_group(env)?;

        let security_group = graph
            .declare(
                Node::new(NodeKind::SecurityGroup, sg_name.clone())
                    .with_attributes(SecurityGroupAttributes {
                        name: sg_name.to_string(),
                        description: "Security group for VPC endpoints".to_string(),
                        vpc_id: network.vpc_id(),
                        ingress: vec![SecurityGroupRule {
                            from_port: HTTPS_PORT,
                            to_port: HTTPS_PORT,
                            protocol: "tcp".to_string(),
                            cidr_blocks: vec![self.config.common.vpc_cidr.to_string()],
                            description: "Allow HTTPS from VPC".to_string(),
                        }],
                        egress: vec![SecurityGroupRule {
                            from_port: 0,
                            to_port: 0,
                            protocol: "-1".to_string(),
                            cidr_blocks: vec![DEFAULT_EGRESS_CIDR.to_string()],
                            description: "Allow all outbound traffic".to_string(),
                        }],
                    })
                    .context(error::GraphSnafu {
                        what: "the endpoint security group",
                    })?
                    .with_tags(tags.clone()),
            )
            .context(error::GraphSnafu {
                what: "the endpoint security group",
            })?;

        let mut endpoints = Vec::with_capacity(AWS_SERVICE_ENDPOINTS.len());
        for service in AWS_SERVICE_ENDPOINTS {
            let kind = endpoint_type(service);
            let (route_table_ids, subnet_ids, security_group_ids) = match kind {
                EndpointType::Gateway => (network.private_route_table_ids(), vec![], vec![]),
                EndpointType::Interface => (
                    vec![],
                    network.private_subnet_ids(),
                    vec![security_group.output("id")],
                ),
            };
            let what = format!("the {} endpoint", service);
            let endpoint = graph
                .declare(
                    Node::new(NodeKind::Endpoint, naming::endpoint(service, env)?)
                        .with_attributes(EndpointAttributes {
                            vpc_id: network.vpc_id(),
                            service_name: format!(
                                "com.amazonaws.{}.{}",
                                self.config.region, service
                            ),
                            vpc_endpoint_type: kind,
                            route_table_ids,
                            subnet_ids,
                            security_group_ids,
                            private_dns_enabled: kind == EndpointType::Interface,
                        })
                        .context(error::GraphSnafu { what: &what })?
                        .with_tags(tags.clone()),
                )
                .context(error::GraphSnafu { what: &what })?;
            debug!("Declared {:?} endpoint '{}'", kind, endpoint.name());
            endpoints.push(endpoint);
        }

        Ok(EndpointOutputs {
            security_group,
            endpoints,
        })
    }
}
