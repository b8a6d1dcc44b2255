use crate::cluster::ClusterOutputs;
use crate::error::{self, Result};
use crate::identity::Role;
use crate::naming;
use crate::network::NetworkOutputs;
use eksplan_config::{AmiType, ResolvedConfig};
use eksplan_model::{Configuration, Deferred, Node, NodeKind, NodeRef, ResourceGraph};
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroupAttributes {
    pub cluster_name: Deferred,
    pub node_group_name: String,
    pub node_role_arn: Deferred,
    pub subnet_ids: Vec<Deferred>,
    pub instance_types: Vec<String>,
    pub ami_type: AmiType,
    pub disk_size: u32,
    pub scaling_config: ScalingConfig,
    pub labels: BTreeMap<String, String>,
}

impl Configuration for NodeGroupAttributes {}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingConfig {
    pub desired_size: u32,
    pub max_size: u32,
    pub min_size: u32,
}

pub struct NodeGroupBuilder<'a> {
    config: &'a ResolvedConfig,
}

impl<'a> NodeGroupBuilder<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self { config }
    }

    /// Declare the managed node group. Sizing was validated when the configuration was
    /// resolved and is copied as-is.
    pub fn build(
        &self,
        graph: &mut ResourceGraph,
        network: &NetworkOutputs,
        cluster: &ClusterOutputs,
        node_role: &Role,
    ) -> Result<NodeRef> {
        let env = self.config.environment.as_str();
        let sizing = &self.config.environment_config;
        let name = naming::node_group(env)?;
        let tags = self.config.tags.to_map();

        let node_group = graph
            .declare(
                Node::new(NodeKind::NodeGroup, name.clone())
                    .with_attributes(NodeGroupAttributes {
                        cluster_name: cluster.name(),
                        node_group_name: name.to_string(),
                        node_role_arn: node_role.arn(),
                        subnet_ids: network.private_subnet_ids(),
                        instance_types: vec![sizing.instance_type.clone()],
                        ami_type: self.config.common.node_ami_type,
                        disk_size: self.config.common.node_disk_size,
                        scaling_config: ScalingConfig {
                            desired_size: sizing.desired_size,
                            max_size: sizing.max_size,
                            min_size: sizing.min_size,
                        },
                        labels: tags.clone(),
                    })
                    .context(error::GraphSnafu {
                        what: "the node group",
                    })?
                    .with_tags(tags)
                    .depends_on(&cluster.cluster)
                    .depends_on_all(&node_role.attachments),
            )
            .context(error::GraphSnafu {
                what: "the node group",
            })?;

        debug!(
            "Declared node group '{}' ({} x {}..={})",
            node_group.name(),
            sizing.instance_type,
            sizing.min_size,
            sizing.max_size
        );
        Ok(node_group)
    }
}
