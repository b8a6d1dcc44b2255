/*!

The AWS Load Balancer Controller: a role for its service account, trusted through the cluster's
identity provider, and the Helm release that installs the controller into the cluster.

!*/

use crate::cluster::ClusterOutputs;
use crate::error::{self, Result};
use crate::identity::{IdentityBuilder, Role};
use crate::naming;
use crate::network::NetworkOutputs;
use eksplan_config::ResolvedConfig;
use eksplan_model::constants::{
    ALB_CONTROLLER_CHART, ALB_CONTROLLER_CHART_REPOSITORY, ALB_CONTROLLER_CHART_VERSION,
    ALB_CONTROLLER_NAMESPACE, ALB_CONTROLLER_SERVICE_ACCOUNT, ANNOTATION_ROLE_ARN,
    ELB_FULL_ACCESS,
};
use eksplan_model::{Configuration, Deferred, Node, NodeKind, NodeRef, ResourceGraph};
use log::info;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmReleaseAttributes {
    pub name: String,
    pub chart: String,
    pub version: String,
    pub repository: String,
    pub namespace: String,
    pub values: AlbControllerValues,
}

impl Configuration for HelmReleaseAttributes {}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbControllerValues {
    pub cluster_name: Deferred,
    pub region: String,
    pub vpc_id: Deferred,
    pub service_account: ServiceAccountValues,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountValues {
    pub create: bool,
    pub name: String,
    pub annotations: BTreeMap<String, Deferred>,
}

/// The identity string of a Kubernetes service account, as it appears in a token's `sub` claim.
pub fn service_account_identity(namespace: &str, service_account: &str) -> String {
    format!("system:serviceaccount:{}:{}", namespace, service_account)
}

#[derive(Clone, Debug)]
pub struct IngressOutputs {
    pub role: Role,
    pub release: NodeRef,
    pub service_account: String,
}

pub struct IngressBuilder<'a> {
    config: &'a ResolvedConfig,
}

impl<'a> IngressBuilder<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self { config }
    }

    /// The controller needs worker nodes to run on, so its release waits for `node_group`.
    pub fn build(
        &self,
        graph: &mut ResourceGraph,
        network: &NetworkOutputs,
        cluster: &ClusterOutputs,
        node_group: &NodeRef,
        identity: &IdentityBuilder<'_>,
    ) -> Result<IngressOutputs> {
        let env = self.config.environment.as_str();
        let role = identity.federated_role(
            graph,
            naming::alb_controller_role(env)?,
            &cluster.identity_provider,
            ALB_CONTROLLER_NAMESPACE,
            ALB_CONTROLLER_SERVICE_ACCOUNT,
            &[ELB_FULL_ACCESS],
        )?;

        let mut annotations = BTreeMap::new();
        annotations.insert(ANNOTATION_ROLE_ARN.to_string(), role.arn());
        let release = graph
            .declare(
                Node::new(NodeKind::HelmRelease, naming::alb_controller_release(env)?)
                    .with_attributes(HelmReleaseAttributes {
                        name: ALB_CONTROLLER_CHART.to_string(),
                        chart: ALB_CONTROLLER_CHART.to_string(),
                        version: ALB_CONTROLLER_CHART_VERSION.to_string(),
                        repository: ALB_CONTROLLER_CHART_REPOSITORY.to_string(),
                        namespace: ALB_CONTROLLER_NAMESPACE.to_string(),
                        values: AlbControllerValues {
                            cluster_name: cluster.name(),
                            region: self.config.region.clone(),
                            vpc_id: network.vpc_id(),
                            service_account: ServiceAccountValues {
                                create: true,
                                name: ALB_CONTROLLER_SERVICE_ACCOUNT.to_string(),
                                annotations,
                            },
                        },
                    })
                    .context(error::GraphSnafu {
                        what: "the load balancer controller release",
                    })?
                    .depends_on(node_group)
                    .depends_on_all(&role.attachments),
            )
            .context(error::GraphSnafu {
                what: "the load balancer controller release",
            })?;

        info!(
            "Declared load balancer controller role '{}' and release '{}'",
            role.name(),
            release.name()
        );

        Ok(IngressOutputs {
            role,
            release,
            service_account: service_account_identity(
                ALB_CONTROLLER_NAMESPACE,
                ALB_CONTROLLER_SERVICE_ACCOUNT,
            ),
        })
    }
}
