/*!

IAM trust policies. Policies are stored in a role's attribute bag as structured JSON so that
deferred values (for example an identity provider's ARN) can be substituted without any string
quoting, and they are rendered to canonical JSON text only when a role is created.

!*/

use crate::constants::{IAM_POLICY_VERSION, OIDC_CLIENT_ID};
use crate::deferred::{to_canonical_json, Deferred};
use crate::error::{self, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::ResultExt;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrustPolicy {
    pub version: String,
    pub statement: Vec<Statement>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: Effect,
    pub principal: Principal,
    pub action: StsAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Principal {
    /// An AWS service such as `eks.amazonaws.com`.
    Service(String),
    /// An identity provider ARN, usually a `Deferred` in template form.
    Federated(String),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StsAction {
    #[serde(rename = "sts:AssumeRole")]
    AssumeRole,
    #[serde(rename = "sts:AssumeRoleWithWebIdentity")]
    AssumeRoleWithWebIdentity,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "StringEquals")]
    pub string_equals: BTreeMap<String, String>,
}

impl TrustPolicy {
    /// A policy that lets `service` (e.g. `ec2.amazonaws.com`) assume the role.
    pub fn for_service<S: Into<String>>(service: S) -> Self {
        Self {
            version: IAM_POLICY_VERSION.to_string(),
            statement: vec![Statement {
                effect: Effect::Allow,
                principal: Principal::Service(service.into()),
                action: StsAction::AssumeRole,
                condition: None,
            }],
        }
    }

    /// A policy that lets the Kubernetes service account `namespace/service_account` assume the
    /// role through the cluster's OIDC identity provider.
    ///
    /// `provider_arn` and `issuer` are not known until the cluster and provider exist, so the
    /// policy holds references to them. The condition keys are built from the issuer URL with
    /// its scheme removed.
    pub fn for_service_account(
        provider_arn: &Deferred,
        issuer: &Deferred,
        namespace: &str,
        service_account: &str,
    ) -> Self {
        let issuer_host = issuer.without_scheme();
        let mut string_equals = BTreeMap::new();
        string_equals.insert(
            format!("{}:sub", issuer_host),
            format!("system:serviceaccount:{}:{}", namespace, service_account),
        );
        string_equals.insert(format!("{}:aud", issuer_host), OIDC_CLIENT_ID.to_string());
        Self {
            version: IAM_POLICY_VERSION.to_string(),
            statement: vec![Statement {
                effect: Effect::Allow,
                principal: Principal::Federated(provider_arn.to_string()),
                action: StsAction::AssumeRoleWithWebIdentity,
                condition: Some(Condition { string_equals }),
            }],
        }
    }

    pub fn to_canonical_json(&self) -> Result<String> {
        to_canonical_json(self)
    }

    pub fn into_value(self) -> Result<Value> {
        serde_json::to_value(self).context(error::AttributeSerializationSnafu)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).context(error::AttributeDeserializationSnafu)
    }
}

#[cfg(test)]
mod test {
    use super::TrustPolicy;
    use crate::graph::NodeName;
    use crate::Deferred;
    use serde_json::json;

    #[test]
    fn service_policy() {
        let policy = TrustPolicy::for_service("eks.amazonaws.com");
        assert_eq!(
            policy.clone().into_value().unwrap(),
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": {"Service": "eks.amazonaws.com"},
                    "Action": "sts:AssumeRole",
                }]
            })
        );
        assert_eq!(
            policy.to_canonical_json().unwrap(),
            r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"Service":"eks.amazonaws.com"},"Action":"sts:AssumeRole"}]}"#
        );
    }

    #[test]
    fn service_account_policy() {
        let provider = NodeName::new("eks-oidc-provider-staging").unwrap();
        let cluster = NodeName::new("eks-cluster-staging").unwrap();
        let policy = TrustPolicy::for_service_account(
            &Deferred::new(provider, "arn"),
            &Deferred::new(cluster, "identityOidcIssuer"),
            "kube-system",
            "aws-load-balancer-controller",
        );
        let value = policy.clone().into_value().unwrap();
        assert_eq!(
            value,
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": {"Federated": "${eks-oidc-provider-staging.arn}"},
                    "Action": "sts:AssumeRoleWithWebIdentity",
                    "Condition": {"StringEquals": {
                        "${eks-cluster-staging.identityOidcIssuer|without-scheme}:aud": "sts.amazonaws.com",
                        "${eks-cluster-staging.identityOidcIssuer|without-scheme}:sub":
                            "system:serviceaccount:kube-system:aws-load-balancer-controller",
                    }},
                }]
            })
        );
        assert_eq!(TrustPolicy::from_value(value).unwrap(), policy);
    }
}
