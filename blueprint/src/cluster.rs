use crate::error::{self, Result};
use crate::identity::{IdentityProvider, Role};
use crate::naming;
use crate::network::NetworkOutputs;
use eksplan_config::ResolvedConfig;
use eksplan_model::constants::{
    CLUSTER_LOG_TYPES, ENCRYPTED_RESOURCES, OIDC_CLIENT_ID, OIDC_THUMBPRINT,
};
use eksplan_model::{Configuration, Deferred, Node, NodeKind, NodeRef, ResourceGraph};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterAttributes {
    pub name: String,
    pub version: String,
    pub role_arn: Deferred,
    pub vpc_config: ClusterVpcConfig,
    pub enabled_cluster_log_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encryption_config: Vec<EncryptionConfig>,
}

impl Configuration for ClusterAttributes {}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVpcConfig {
    pub subnet_ids: Vec<Deferred>,
    pub endpoint_private_access: bool,
    pub endpoint_public_access: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionConfig {
    pub resources: Vec<String>,
    pub provider: EncryptionProvider,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionProvider {
    pub key_arn: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderAttributes {
    pub url: Deferred,
    pub client_id_list: Vec<String>,
    pub thumbprint_list: Vec<String>,
}

impl Configuration for IdentityProviderAttributes {}

/// API server endpoint access.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EndpointAccess {
    pub private: bool,
    pub public: bool,
}

impl EndpointAccess {
    /// With the private endpoint disabled the public endpoint is the only way to reach the API
    /// server, so it is enabled regardless of `public`.
    pub fn new(private: bool, public: bool) -> Self {
        if !private && !public {
            warn!("The private endpoint is disabled, enabling the public endpoint");
        }
        Self {
            private,
            public: public || !private,
        }
    }
}

/// The log types to enable.
pub fn log_types(enabled: bool) -> Vec<String> {
    if enabled {
        CLUSTER_LOG_TYPES.iter().map(|t| t.to_string()).collect()
    } else {
        Vec::new()
    }
}

/// Secrets encryption applies only when it is enabled and a key is given.
pub fn encryption_config(enabled: bool, kms_key_id: Option<&str>) -> Vec<EncryptionConfig> {
    match (enabled, kms_key_id) {
        (true, Some(key_arn)) => vec![EncryptionConfig {
            resources: ENCRYPTED_RESOURCES.iter().map(|r| r.to_string()).collect(),
            provider: EncryptionProvider {
                key_arn: key_arn.to_string(),
            },
        }],
        _ => Vec::new(),
    }
}

#[derive(Clone, Debug)]
pub struct ClusterOutputs {
    pub cluster: NodeRef,
    pub identity_provider: IdentityProvider,
}

impl ClusterOutputs {
    pub fn name(&self) -> Deferred {
        self.cluster.output("name")
    }
}

pub struct ClusterBuilder<'a> {
    config: &'a ResolvedConfig,
}

impl<'a> ClusterBuilder<'a> {
    pub fn new(config: &'a ResolvedConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        graph: &mut ResourceGraph,
        network: &NetworkOutputs,
        cluster_role: &Role,
    ) -> Result<ClusterOutputs> {
        let env = self.config.environment.as_str();
        let common = &self.config.common;
        let tags = self.config.tags.to_map();
        let access = EndpointAccess::new(
            common.enable_private_endpoint,
            common.enable_public_endpoint,
        );
        let cluster_name = self.config.cluster_name();

        let cluster = graph
            .declare(
                Node::new(NodeKind::Cluster, naming::cluster(env)?)
                    .with_attributes(ClusterAttributes {
                        name: cluster_name.clone(),
                        version: self
                            .config
                            .environment_config
                            .kubernetes_version
                            .major_minor(),
                        role_arn: cluster_role.arn(),
                        vpc_config: ClusterVpcConfig {
                            subnet_ids: network.private_subnet_ids(),
                            endpoint_private_access: access.private,
                            endpoint_public_access: access.public,
                        },
                        enabled_cluster_log_types: log_types(common.enable_cluster_logging),
                        encryption_config: encryption_config(
                            common.enable_encryption,
                            common.kms_key_id.as_deref(),
                        ),
                    })
                    .context(error::GraphSnafu { what: "the cluster" })?
                    .with_tags(tags.clone())
                    .depends_on_all(&cluster_role.attachments),
            )
            .context(error::GraphSnafu { what: "the cluster" })?;

        let issuer = cluster.output("identityOidcIssuer");
        let provider = graph
            .declare(
                Node::new(NodeKind::IdentityProvider, naming::identity_provider(env)?)
                    .with_attributes(IdentityProviderAttributes {
                        url: issuer.clone(),
                        client_id_list: vec![OIDC_CLIENT_ID.to_string()],
                        thumbprint_list: vec![OIDC_THUMBPRINT.to_string()],
                    })
                    .context(error::GraphSnafu {
                        what: "the identity provider",
                    })?
                    .with_tags(tags),
            )
            .context(error::GraphSnafu {
                what: "the identity provider",
            })?;

        info!(
            "Declared cluster '{}' (Kubernetes {}, private endpoint {}, public endpoint {})",
            cluster_name,
            self.config.environment_config.kubernetes_version.major_minor(),
            access.private,
            access.public
        );

        Ok(ClusterOutputs {
            cluster,
            identity_provider: IdentityProvider {
                provider,
                issuer,
            },
        })
    }
}

#[cfg(test)]
mod test {
    use super::{encryption_config, log_types, EndpointAccess};

    #[test]
    fn endpoint_access() {
        assert_eq!(
            EndpointAccess::new(false, false),
            EndpointAccess {
                private: false,
                public: true
            }
        );
        assert_eq!(
            EndpointAccess::new(false, true),
            EndpointAccess {
                private: false,
                public: true
            }
        );
        assert_eq!(
            EndpointAccess::new(true, false),
            EndpointAccess {
                private: true,
                public: false
            }
        );
        assert_eq!(
            EndpointAccess::new(true, true),
            EndpointAccess {
                private: true,
                public: true
            }
        );
    }

    #[test]
    fn logging() {
        assert_eq!(
            log_types(true),
            vec!["api", "audit", "authenticator", "controllerManager", "scheduler"]
        );
        assert!(log_types(false).is_empty());
    }

    #[test]
    fn encryption() {
        assert!(encryption_config(true, None).is_empty());
        assert!(encryption_config(false, Some("arn:aws:kms:key")).is_empty());
        let config = encryption_config(true, Some("arn:aws:kms:key"));
        assert_eq!(config.len(), 1);
        assert_eq!(config[0].resources, vec!["secrets"]);
        assert_eq!(config[0].provider.key_arn, "arn:aws:kms:key");
    }
}
