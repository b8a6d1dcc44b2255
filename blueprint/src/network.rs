/*!

The network layer: one VPC with a public and a private subnet in each availability zone, an
internet gateway, NAT gateways and route tables. Subnets carry the Kubernetes discovery tags that
the cluster and the load balancer controller use to find them.

!*/

use crate::error::{self, Result};
use crate::naming;
use eksplan_config::{Ipv4Cidr, ResolvedConfig};
use eksplan_model::constants::{
    DEFAULT_EGRESS_CIDR, TAG_CLUSTER_PREFIX, TAG_CLUSTER_SHARED, TAG_ROLE_ELB, TAG_ROLE_ENABLED,
    TAG_ROLE_INTERNAL_ELB,
};
use eksplan_model::{Configuration, Deferred, Node, NodeKind, NodeRef, ResourceGraph};
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcAttributes {
    pub cidr_block: Ipv4Cidr,
    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

impl Configuration for VpcAttributes {}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternetGatewayAttributes {
    pub vpc_id: Deferred,
}

impl Configuration for InternetGatewayAttributes {}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetAttributes {
    pub vpc_id: Deferred,
    pub cidr_block: Ipv4Cidr,
    pub availability_zone: String,
    pub map_public_ip_on_launch: bool,
}

impl Configuration for SubnetAttributes {}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatGatewayAttributes {
    pub subnet_id: Deferred,
    pub connectivity_type: String,
}

impl Configuration for NatGatewayAttributes {}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub destination_cidr_block: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_id: Option<Deferred>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nat_gateway_id: Option<Deferred>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTableAttributes {
    pub vpc_id: Deferred,
    pub routes: Vec<Route>,
    /// The subnets associated with the table.
    pub subnet_ids: Vec<Deferred>,
}

impl Configuration for RouteTableAttributes {}

/// Handles to the declared network nodes.
#[derive(Clone, Debug)]
pub struct NetworkOutputs {
    pub vpc: NodeRef,
    pub internet_gateway: NodeRef,
    pub public_subnets: Vec<NodeRef>,
    pub private_subnets: Vec<NodeRef>,
    pub nat_gateways: Vec<NodeRef>,
    pub public_route_table: NodeRef,
    pub private_route_tables: Vec<NodeRef>,
}

impl NetworkOutputs {
    pub fn vpc_id(&self) -> Deferred {
        self.vpc.output("id")
    }

    pub fn public_subnet_ids(&self) -> Vec<Deferred> {
        self.public_subnets.iter().map(|s| s.output("id")).collect()
    }

    pub fn private_subnet_ids(&self) -> Vec<Deferred> {
        self.private_subnets.iter().map(|s| s.output("id")).collect()
    }

    pub fn private_route_table_ids(&self) -> Vec<Deferred> {
        self.private_route_tables
            .iter()
            .map(|t| t.output("id"))
            .collect()
    }
}

/// The Kubernetes discovery tags for a subnet of `cluster_name`.
pub fn subnet_discovery_tags(cluster_name: &str, public: bool) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    tags.insert(
        format!("{}/{}", TAG_CLUSTER_PREFIX, cluster_name),
        TAG_CLUSTER_SHARED.to_string(),
    );
    let role = if public {
        TAG_ROLE_ELB
    } else {
        TAG_ROLE_INTERNAL_ELB
    };
    tags.insert(role.to_string(), TAG_ROLE_ENABLED.to_string());
    tags
}

pub struct NetworkBuilder<'a> {
    config: &'a ResolvedConfig,
}

impl<'a> NetworkBuilder<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, graph: &mut ResourceGraph) -> Result<NetworkOutputs> {
        let env = self.config.environment.as_str();
        let cluster_name = self.config.cluster_name();
        let tags = self.config.tags.to_map();
        let vpc_cidr = self.config.common.vpc_cidr;
        let zones = self.config.availability_zones();
        let az_count = zones.len();

        let blocks = u32::try_from(az_count * 2)
            .ok()
            .and_then(|count| vpc_cidr.split(count))
            .context(error::SubnettingSnafu {
                vpc_cidr: vpc_cidr.to_string(),
                count: self.config.common.vpc_max_azs * 2,
            })?;

        let vpc = graph
            .declare(
                Node::new(NodeKind::Vpc, naming::vpc(env)?)
                    .with_attributes(VpcAttributes {
                        cidr_block: vpc_cidr,
                        enable_dns_hostnames: true,
                        enable_dns_support: true,
                    })
                    .context(error::GraphSnafu { what: "the VPC" })?
                    .with_tags(tags.clone()),
            )
            .context(error::GraphSnafu { what: "the VPC" })?;

        let internet_gateway = graph
            .declare(
                Node::new(NodeKind::InternetGateway, naming::internet_gateway(env)?)
                    .with_attributes(InternetGatewayAttributes {
                        vpc_id: vpc.output("id"),
                    })
                    .context(error::GraphSnafu {
                        what: "the internet gateway",
                    })?
                    .with_tags(tags.clone()),
            )
            .context(error::GraphSnafu {
                what: "the internet gateway",
            })?;

        let mut public_subnets = Vec::with_capacity(az_count);
        let mut private_subnets = Vec::with_capacity(az_count);
        for (i, zone) in zones.iter().enumerate() {
            for public in [true, false] {
                let (name, block) = if public {
                    (naming::public_subnet(env, i)?, blocks.get(i))
                } else {
                    (naming::private_subnet(env, i)?, blocks.get(az_count + i))
                };
                let block = block.copied().context(error::SubnettingSnafu {
                    vpc_cidr: vpc_cidr.to_string(),
                    count: self.config.common.vpc_max_azs * 2,
                })?;
                let subnet = graph
                    .declare(
                        Node::new(NodeKind::Subnet, name)
                            .with_attributes(SubnetAttributes {
                                vpc_id: vpc.output("id"),
                                cidr_block: block,
                                availability_zone: zone.clone(),
                                map_public_ip_on_launch: public,
                            })
                            .context(error::GraphSnafu { what: "a subnet" })?
                            .with_tags(self.config.tags.merged_with(subnet_discovery_tags(
                                &cluster_name,
                                public,
                            ))),
                    )
                    .context(error::GraphSnafu { what: "a subnet" })?;
                if public {
                    public_subnets.push(subnet);
                } else {
                    private_subnets.push(subnet);
                }
            }
        }

        // One shared NAT gateway, or one in each zone.
        let nat_count = if self.config.environment_config.nat_gateways == 1 {
            1
        } else {
            az_count
        };
        let mut nat_gateways = Vec::with_capacity(nat_count);
        for (i, subnet) in public_subnets.iter().take(nat_count).enumerate() {
            let nat = graph
                .declare(
                    Node::new(NodeKind::NatGateway, naming::nat_gateway(env, i)?)
                        .with_attributes(NatGatewayAttributes {
                            subnet_id: subnet.output("id"),
                            connectivity_type: "public".to_string(),
                        })
                        .context(error::GraphSnafu {
                            what: "a NAT gateway",
                        })?
                        .with_tags(tags.clone())
                        .depends_on(&internet_gateway),
                )
                .context(error::GraphSnafu {
                    what: "a NAT gateway",
                })?;
            nat_gateways.push(nat);
        }

        let public_route_table = graph
            .declare(
                Node::new(NodeKind::RouteTable, naming::public_route_table(env)?)
                    .with_attributes(RouteTableAttributes {
                        vpc_id: vpc.output("id"),
                        routes: vec![Route {
                            destination_cidr_block: DEFAULT_EGRESS_CIDR.to_string(),
                            gateway_id: Some(internet_gateway.output("id")),
                            nat_gateway_id: None,
                        }],
                        subnet_ids: public_subnets.iter().map(|s| s.output("id")).collect(),
                    })
                    .context(error::GraphSnafu {
                        what: "the public route table",
                    })?
                    .with_tags(tags.clone()),
            )
            .context(error::GraphSnafu {
                what: "the public route table",
            })?;

        let mut private_route_tables = Vec::with_capacity(az_count);
        for (i, subnet) in private_subnets.iter().enumerate() {
            let nat = nat_gateways
                .get(i)
                .or_else(|| nat_gateways.first())
                .context(error::MissingNodeSnafu {
                    node: format!("NAT gateway for zone {}", i + 1),
                })?;
            let table = graph
                .declare(
                    Node::new(NodeKind::RouteTable, naming::private_route_table(env, i)?)
                        .with_attributes(RouteTableAttributes {
                            vpc_id: vpc.output("id"),
                            routes: vec![Route {
                                destination_cidr_block: DEFAULT_EGRESS_CIDR.to_string(),
                                gateway_id: None,
                                nat_gateway_id: Some(nat.output("id")),
                            }],
                            subnet_ids: vec![subnet.output("id")],
                        })
                        .context(error::GraphSnafu {
                            what: "a private route table",
                        })?
                        .with_tags(tags.clone()),
                )
                .context(error::GraphSnafu {
                    what: "a private route table",
                })?;
            private_route_tables.push(table);
        }

        debug!(
            "Declared VPC '{}' with {} zones and {} NAT gateways",
            vpc.name(),
            az_count,
            nat_gateways.len()
        );

        Ok(NetworkOutputs {
            vpc,
            internet_gateway,
            public_subnets,
            private_subnets,
            nat_gateways,
            public_route_table,
            private_route_tables,
        })
    }
}
