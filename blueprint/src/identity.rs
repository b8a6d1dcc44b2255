use crate::error::{self, Result};
use crate::naming;
use eksplan_model::{
    Configuration, Deferred, Node, NodeKind, NodeName, NodeRef, ResourceGraph, TrustPolicy,
};
use log::trace;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::BTreeMap;

/// The role attribute that holds its [`TrustPolicy`].
pub const ASSUME_ROLE_POLICY: &str = "assumeRolePolicy";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAttributes {
    pub name: String,
    pub assume_role_policy: TrustPolicy,
}

impl Configuration for RoleAttributes {}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAttachmentAttributes {
    pub role: Deferred,
    pub policy_arn: String,
}

impl Configuration for PolicyAttachmentAttributes {}

/// An IAM role and the nodes that attach its managed policies.
#[derive(Clone, Debug)]
pub struct Role {
    pub role: NodeRef,
    pub attachments: Vec<NodeRef>,
}

impl Role {
    pub fn arn(&self) -> Deferred {
        self.role.output("arn")
    }

    pub fn name(&self) -> &NodeName {
        self.role.name()
    }
}

/// Handles to the identity provider that federated roles trust.
#[derive(Clone, Debug)]
pub struct IdentityProvider {
    pub provider: NodeRef,
    /// The cluster's issuer URL, e.g. `https://oidc.eks.us-west-2.amazonaws.com/id/EXAMPLE`.
    pub issuer: Deferred,
}

impl IdentityProvider {
    pub fn arn(&self) -> Deferred {
        self.provider.output("arn")
    }
}

/// Declares IAM roles and their policy attachments.
pub struct IdentityBuilder<'a> {
    tags: &'a BTreeMap<String, String>,
}

impl<'a> IdentityBuilder<'a> {
    pub fn new(tags: &'a BTreeMap<String, String>) -> Self {
        Self { tags }
    }

    /// A role that only `service` (e.g. `eks.amazonaws.com`) may assume.
    pub fn service_role(
        &self,
        graph: &mut ResourceGraph,
        name: NodeName,
        service: &str,
        policy_arns: &[&str],
    ) -> Result<Role> {
        self.role(graph, name, TrustPolicy::for_service(service), policy_arns)
    }

    /// A role for the Kubernetes service account `namespace/service_account`, assumed through
    /// the cluster's OIDC identity provider.
    pub fn federated_role(
        &self,
        graph: &mut ResourceGraph,
        name: NodeName,
        provider: &IdentityProvider,
        namespace: &str,
        service_account: &str,
        policy_arns: &[&str],
    ) -> Result<Role> {
        let policy = TrustPolicy::for_service_account(
            &provider.arn(),
            &provider.issuer,
            namespace,
            service_account,
        );
        self.role(graph, name, policy, policy_arns)
    }

    fn role(
        &self,
        graph: &mut ResourceGraph,
        name: NodeName,
        policy: TrustPolicy,
        policy_arns: &[&str],
    ) -> Result<Role> {
        let what = format!("role '{}'", name);
        let role = graph
            .declare(
                Node::new(NodeKind::IamRole, name.clone())
                    .with_attributes(RoleAttributes {
                        name: name.to_string(),
                        assume_role_policy: policy,
                    })
                    .context(error::GraphSnafu { what: &what })?
                    .with_tags(self.tags.clone()),
            )
            .context(error::GraphSnafu { what: &what })?;

        let mut attachments = Vec::with_capacity(policy_arns.len());
        for (i, policy_arn) in policy_arns.iter().enumerate() {
            let attachment_name = naming::policy_attachment(&name, i)?;
            trace!("Attaching '{}' to '{}' as '{}'", policy_arn, name, attachment_name);
            let attachment = graph
                .declare(
                    Node::new(NodeKind::PolicyAttachment, attachment_name)
                        .with_attributes(PolicyAttachmentAttributes {
                            role: role.output("name"),
                            policy_arn: policy_arn.to_string(),
                        })
                        .context(error::GraphSnafu { what: &what })?,
                )
                .context(error::GraphSnafu { what: &what })?;
            attachments.push(attachment);
        }

        Ok(Role { role, attachments })
    }
}
