//! Logical node names. Every name is a deterministic function of the resource kind and the
//! environment, so that a re-run addresses exactly the same nodes.

use crate::error::{self, Result};
use eksplan_model::NodeName;
use snafu::ResultExt;

fn name(name: String) -> Result<NodeName> {
    NodeName::new(name).context(error::GraphSnafu { what: "a node name" })
}

pub fn vpc(environment: &str) -> Result<NodeName> {
    name(format!("eks-vpc-{}", environment))
}

pub fn internet_gateway(environment: &str) -> Result<NodeName> {
    name(format!("eks-vpc-{}-igw", environment))
}

pub fn public_subnet(environment: &str, index: usize) -> Result<NodeName> {
    name(format!("eks-vpc-{}-public-{}", environment, index + 1))
}

pub fn private_subnet(environment: &str, index: usize) -> Result<NodeName> {
    name(format!("eks-vpc-{}-private-{}", environment, index + 1))
}

pub fn nat_gateway(environment: &str, index: usize) -> Result<NodeName> {
    name(format!("eks-vpc-{}-nat-{}", environment, index + 1))
}

pub fn public_route_table(environment: &str) -> Result<NodeName> {
    name(format!("eks-vpc-{}-public-rt", environment))
}

pub fn private_route_table(environment: &str, index: usize) -> Result<NodeName> {
    name(format!("eks-vpc-{}-private-rt-{}", environment, index + 1))
}

pub fn cluster_role(environment: &str) -> Result<NodeName> {
    name(format!("eks-cluster-role-{}", environment))
}

pub fn node_role(environment: &str) -> Result<NodeName> {
    name(format!("eks-node-role-{}", environment))
}

/// Attachments are keyed by role and ordinal so two roles never collide.
pub fn policy_attachment(role: &NodeName, index: usize) -> Result<NodeName> {
    name(format!("{}-policy-{}", role, index))
}

pub fn cluster(environment: &str) -> Result<NodeName> {
    name(format!("eks-cluster-{}", environment))
}

pub fn identity_provider(environment: &str) -> Result<NodeName> {
    name(format!("eks-oidc-provider-{}", environment))
}

pub fn node_group(environment: &str) -> Result<NodeName> {
    name(format!("eks-nodegroup-{}", environment))
}

pub fn endpoint_security_group(environment: &str) -> Result<NodeName> {
    name(format!("vpc-endpoint-sg-{}", environment))
}

pub fn endpoint(service: &str, environment: &str) -> Result<NodeName> {
    name(format!("{}-endpoint-{}", service.replace('.', "-"), environment))
}

pub fn alb_controller_role(environment: &str) -> Result<NodeName> {
    name(format!("eks-alb-controller-role-{}", environment))
}

pub fn alb_controller_release(environment: &str) -> Result<NodeName> {
    name(format!("eks-alb-controller-{}", environment))
}
