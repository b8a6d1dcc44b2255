use crate::error::{self, Result};
use eksplan_model::{Deferred, Resolutions};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

/// The values exported by a blueprint, as references to attributes that only exist once the
/// resources have been created. Each field has a concrete counterpart in [`StackOutputs`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRefs {
    pub cluster_name: Deferred,
    pub cluster_endpoint: Deferred,
    pub cluster_arn: Deferred,
    pub cluster_version: Deferred,
    pub vpc_id: Deferred,
    pub node_group_name: Deferred,
    pub oidc_provider_arn: Deferred,
    pub oidc_issuer_url: Deferred,
    pub public_subnet_ids: Vec<Deferred>,
    pub private_subnet_ids: Vec<Deferred>,
    /// A command with embedded references.
    pub kubectl_command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alb_controller_role_arn: Option<Deferred>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alb_controller_service_account: Option<String>,
}

impl OutputRefs {
    /// Replace every reference with its value once the graph has been applied.
    pub fn resolve(&self, resolutions: &Resolutions) -> Result<StackOutputs> {
        let value = serde_json::to_value(self).context(error::OutputsSerializationSnafu)?;
        let resolved = resolutions
            .substitute(&value)
            .context(error::OutputsSnafu)?;
        serde_json::from_value(resolved).context(error::OutputsDeserializationSnafu)
    }
}

impl_display_as_json!(OutputRefs);

/// The concrete output values of an applied blueprint.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackOutputs {
    pub cluster_name: String,
    pub cluster_endpoint: String,
    pub cluster_arn: String,
    pub cluster_version: String,
    pub vpc_id: String,
    pub node_group_name: String,
    pub oidc_provider_arn: String,
    pub oidc_issuer_url: String,
    pub public_subnet_ids: Vec<String>,
    pub private_subnet_ids: Vec<String>,
    pub kubectl_command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alb_controller_role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alb_controller_service_account: Option<String>,
}

impl_display_as_json!(StackOutputs);
