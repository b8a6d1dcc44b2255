use crate::cluster::ClusterBuilder;
use crate::endpoints::EndpointBuilder;
use crate::engine::{self, ApplyReport, ProvisioningEngine};
use crate::error::{self, Result};
use crate::identity::IdentityBuilder;
use crate::ingress::IngressBuilder;
use crate::naming;
use crate::network::NetworkBuilder;
use crate::nodegroup::NodeGroupBuilder;
use crate::outputs::{OutputRefs, StackOutputs};
use eksplan_config::ResolvedConfig;
use eksplan_model::constants::{
    EC2_CONTAINER_REGISTRY_READONLY, EC2_SERVICE_PRINCIPAL, EKS_CLUSTER_POLICY, EKS_CNI_POLICY,
    EKS_SERVICE_PRINCIPAL, EKS_WORKER_NODE_POLICY,
};
use eksplan_model::{NodeKind, NodeName, ResourceGraph};
use log::info;
use serde::Serialize;
use snafu::{OptionExt, ResultExt};

/// The policies the node role needs before any node can join the cluster.
pub const NODE_ROLE_POLICIES: [&str; 3] = [
    EKS_WORKER_NODE_POLICY,
    EKS_CNI_POLICY,
    EC2_CONTAINER_REGISTRY_READONLY,
];

/// The complete resource graph of one environment together with its output references.
#[derive(Clone, Debug)]
pub struct Blueprint {
    config: ResolvedConfig,
    graph: ResourceGraph,
    outputs: OutputRefs,
}

/// One row of a plan: a node and the stage in which it can be created.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedNode {
    pub stage: usize,
    pub name: NodeName,
    pub kind: NodeKind,
    pub depends_on: Vec<NodeName>,
}

/// The result of applying a blueprint.
#[derive(Clone, Debug)]
pub struct Deployment {
    pub report: ApplyReport,
    pub outputs: StackOutputs,
}

impl Blueprint {
    /// Declare every resource of the environment described by `config`. Each builder is handed
    /// only the handles produced by the builders before it.
    pub fn build(config: &ResolvedConfig) -> Result<Self> {
        let env = config.environment.as_str();
        let common = &config.common;
        let tags = config.tags.to_map();
        let mut graph = ResourceGraph::new();

        let network = NetworkBuilder::new(config).build(&mut graph)?;

        let identity = IdentityBuilder::new(&tags);
        let cluster_role = identity.service_role(
            &mut graph,
            naming::cluster_role(env)?,
            EKS_SERVICE_PRINCIPAL,
            &[EKS_CLUSTER_POLICY],
        )?;
        let node_role = identity.service_role(
            &mut graph,
            naming::node_role(env)?,
            EC2_SERVICE_PRINCIPAL,
            &NODE_ROLE_POLICIES,
        )?;

        let cluster = ClusterBuilder::new(config).build(&mut graph, &network, &cluster_role)?;
        let node_group =
            NodeGroupBuilder::new(config).build(&mut graph, &network, &cluster, &node_role)?;

        if common.enable_vpc_endpoints {
            EndpointBuilder::new(config).build(&mut graph, &network)?;
        }

        let ingress = if common.enable_alb_controller {
            Some(IngressBuilder::new(config).build(
                &mut graph,
                &network,
                &cluster,
                &node_group,
                &identity,
            )?)
        } else {
            None
        };

        let outputs = OutputRefs {
            cluster_name: cluster.name(),
            cluster_endpoint: cluster.cluster.output("endpoint"),
            cluster_arn: cluster.cluster.output("arn"),
            cluster_version: cluster.cluster.output("version"),
            vpc_id: network.vpc_id(),
            node_group_name: node_group.output("nodeGroupName"),
            oidc_provider_arn: cluster.identity_provider.arn(),
            oidc_issuer_url: cluster.identity_provider.issuer.clone(),
            public_subnet_ids: network.public_subnet_ids(),
            private_subnet_ids: network.private_subnet_ids(),
            kubectl_command: format!(
                "aws eks update-kubeconfig --name {} --region {}",
                cluster.name(),
                config.region
            ),
            alb_controller_role_arn: ingress.as_ref().map(|ingress| ingress.role.arn()),
            alb_controller_service_account: ingress.map(|ingress| ingress.service_account),
        };

        info!(
            "Built blueprint for environment '{}' with {} nodes",
            env,
            graph.len()
        );
        Ok(Self {
            config: config.clone(),
            graph,
            outputs,
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    pub fn outputs(&self) -> &OutputRefs {
        &self.outputs
    }

    /// Every node in creation order, labelled with its stage (starting at 1).
    pub fn plan(&self) -> Result<Vec<PlannedNode>> {
        let stages = self
            .graph
            .creation_order()
            .context(error::GraphSnafu {
                what: "the creation order",
            })?;
        let mut plan = Vec::with_capacity(self.graph.len());
        for (i, stage) in stages.into_iter().enumerate() {
            for name in stage {
                let node = self
                    .graph
                    .get(&name)
                    .context(error::MissingNodeSnafu {
                        node: name.to_string(),
                    })?;
                plan.push(PlannedNode {
                    stage: i + 1,
                    kind: node.kind(),
                    depends_on: node.dependencies().iter().cloned().collect(),
                    name,
                });
            }
        }
        Ok(plan)
    }

    /// Materialize the graph with `engine` and resolve the output values.
    pub async fn apply<E>(&self, engine: &E) -> Result<Deployment>
    where
        E: ProvisioningEngine + ?Sized,
    {
        let report = engine::apply(&self.graph, engine).await?;
        let outputs = self.outputs.resolve(&report.resolutions)?;
        Ok(Deployment { report, outputs })
    }
}
