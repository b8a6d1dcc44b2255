use super::{Attributes, EngineError, EngineResult, IntoEngineError, MaterializedNode};
use crate::engine::ProvisioningEngine;
use eksplan_model::{strip_scheme, NodeKind, NodeName};
use log::trace;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// The account id used in the ARNs that [`LocalEngine`] makes up.
pub const LOCAL_ACCOUNT_ID: &str = "000000000000";

/// An in-memory [`ProvisioningEngine`] that pretends to create resources. Identifiers, ARNs and
/// URLs are derived from a hash of the node name, so a given graph always produces the same
/// outputs. This is what `eksplan preview` runs against.
#[derive(Debug)]
pub struct LocalEngine {
    region: String,
    account_id: String,
    state: Mutex<BTreeMap<NodeName, Attributes>>,
}

impl LocalEngine {
    pub fn new<S: Into<String>>(region: S) -> Self {
        Self {
            region: region.into(),
            account_id: LOCAL_ACCOUNT_ID.to_string(),
            state: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_account_id<S: Into<String>>(mut self, account_id: S) -> Self {
        self.account_id = account_id.into();
        self
    }

    /// The attributes of every resource created so far.
    pub async fn state(&self) -> BTreeMap<NodeName, Attributes> {
        self.state.lock().await.clone()
    }

    fn fake_hex(&self, name: &NodeName, len: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.account_id.as_bytes());
        hasher.update(b"/");
        hasher.update(self.region.as_bytes());
        hasher.update(b"/");
        hasher.update(name.as_str().as_bytes());
        let mut hex = hex::encode(hasher.finalize());
        hex.truncate(len);
        hex
    }

    fn fake_id(&self, prefix: &str, name: &NodeName) -> String {
        format!("{}-{}", prefix, self.fake_hex(name, 17))
    }

    fn string_attribute<'a>(node: &'a MaterializedNode, key: &str) -> EngineResult<&'a str> {
        node.attributes
            .get(key)
            .and_then(Value::as_str)
            .context(format!("{} '{}' has no '{}' attribute", node.kind, node.name, key))
    }

    /// The attributes a real provider would report after creating `node`.
    fn outputs(&self, node: &MaterializedNode) -> EngineResult<Attributes> {
        let mut attributes = node.attributes.clone();
        let mut set = |key: &str, value: String| {
            attributes.insert(key.to_string(), Value::String(value));
        };
        let region = &self.region;
        let account = &self.account_id;
        match node.kind {
            NodeKind::Vpc => set("id", self.fake_id("vpc", &node.name)),
            NodeKind::InternetGateway => set("id", self.fake_id("igw", &node.name)),
            NodeKind::Subnet => set("id", self.fake_id("subnet", &node.name)),
            NodeKind::RouteTable => set("id", self.fake_id("rtb", &node.name)),
            NodeKind::NatGateway => set("id", self.fake_id("nat", &node.name)),
            NodeKind::SecurityGroup => set("id", self.fake_id("sg", &node.name)),
            NodeKind::Endpoint => set("id", self.fake_id("vpce", &node.name)),
            NodeKind::IamRole => {
                let name = Self::string_attribute(node, "name")?;
                set("arn", format!("arn:aws:iam::{}:role/{}", account, name));
                set("id", name.to_string());
            }
            NodeKind::PolicyAttachment => {
                let role = Self::string_attribute(node, "role")?;
                set("id", format!("{}-{}", role, self.fake_hex(&node.name, 8)));
            }
            NodeKind::Cluster => {
                let name = Self::string_attribute(node, "name")?;
                let token = self.fake_hex(&node.name, 32).to_uppercase();
                set(
                    "arn",
                    format!("arn:aws:eks:{}:{}:cluster/{}", region, account, name),
                );
                set(
                    "endpoint",
                    format!("https://{}.gr7.{}.eks.amazonaws.com", token, region),
                );
                set(
                    "identityOidcIssuer",
                    format!("https://oidc.eks.{}.amazonaws.com/id/{}", region, token),
                );
                set("id", name.to_string());
                set("status", "ACTIVE".to_string());
            }
            NodeKind::IdentityProvider => {
                let url = Self::string_attribute(node, "url")?;
                set(
                    "arn",
                    format!(
                        "arn:aws:iam::{}:oidc-provider/{}",
                        account,
                        strip_scheme(url)
                    ),
                );
            }
            NodeKind::NodeGroup => {
                let cluster = Self::string_attribute(node, "clusterName")?;
                let name = Self::string_attribute(node, "nodeGroupName")?;
                set(
                    "arn",
                    format!(
                        "arn:aws:eks:{}:{}:nodegroup/{}/{}/{}",
                        region,
                        account,
                        cluster,
                        name,
                        self.fake_hex(&node.name, 32)
                    ),
                );
                set("id", format!("{}:{}", cluster, name));
                set("status", "ACTIVE".to_string());
            }
            NodeKind::HelmRelease => {
                set("status", "deployed".to_string());
            }
        }
        Ok(attributes)
    }
}

#[async_trait::async_trait]
impl ProvisioningEngine for LocalEngine {
    async fn read(&self, name: &NodeName) -> EngineResult<Option<Attributes>> {
        Ok(self.state.lock().await.get(name).cloned())
    }

    async fn create(&self, node: &MaterializedNode) -> EngineResult<Attributes> {
        let mut state = self.state.lock().await;
        if state.contains_key(&node.name) {
            return Err(EngineError::new_with_context(format!(
                "{} '{}' already exists",
                node.kind, node.name
            )));
        }
        for dependency in &node.depends_on {
            if !state.contains_key(dependency) {
                return Err(EngineError::new_with_context(format!(
                    "{} '{}' depends on '{}' which does not exist",
                    node.kind, node.name, dependency
                )));
            }
        }
        let attributes = self.outputs(node)?;
        trace!("Created {} '{}'", node.kind, node.name);
        state.insert(node.name.clone(), attributes.clone());
        Ok(attributes)
    }
}

#[cfg(test)]
mod test {
    use super::LocalEngine;
    use crate::engine::{MaterializedNode, ProvisioningEngine};
    use eksplan_model::{NodeKind, NodeName};
    use serde_json::{json, Map, Value};
    use std::collections::{BTreeMap, BTreeSet};

    fn node(kind: NodeKind, name: &str, attributes: Value) -> MaterializedNode {
        let attributes: Map<String, Value> = match attributes {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        MaterializedNode {
            name: NodeName::new(name).unwrap(),
            kind,
            depends_on: BTreeSet::new(),
            tags: BTreeMap::new(),
            attributes,
        }
    }

    #[tokio::test]
    async fn deterministic_ids() {
        let vpc = node(NodeKind::Vpc, "eks-vpc-dev", json!({"cidrBlock": "10.0.0.0/16"}));
        let a = LocalEngine::new("us-west-2").create(&vpc).await.unwrap();
        let b = LocalEngine::new("us-west-2").create(&vpc).await.unwrap();
        assert_eq!(a, b);
        let id = a.get("id").unwrap().as_str().unwrap();
        assert!(id.starts_with("vpc-"));
        assert_eq!(id.len(), "vpc-".len() + 17);
        assert_eq!(a.get("cidrBlock").unwrap(), &json!("10.0.0.0/16"));
    }

    #[tokio::test]
    async fn cluster_and_provider() {
        let engine = LocalEngine::new("eu-west-1");
        let cluster = engine
            .create(&node(
                NodeKind::Cluster,
                "eks-cluster-dev",
                json!({"name": "eks-cluster-dev", "version": "1.28"}),
            ))
            .await
            .unwrap();
        let issuer = cluster
            .get("identityOidcIssuer")
            .unwrap()
            .as_str()
            .unwrap()
            .to_string();
        assert!(issuer.starts_with("https://oidc.eks.eu-west-1.amazonaws.com/id/"));
        let provider = engine
            .create(&node(
                NodeKind::IdentityProvider,
                "eks-oidc-provider-dev",
                json!({ "url": issuer }),
            ))
            .await
            .unwrap();
        assert!(provider
            .get("arn")
            .unwrap()
            .as_str()
            .unwrap()
            .starts_with("arn:aws:iam::000000000000:oidc-provider/oidc.eks.eu-west-1.amazonaws.com/id/"));
        assert!(engine
            .read(&NodeName::new("eks-cluster-dev").unwrap())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn create_twice_fails() {
        let engine = LocalEngine::new("us-west-2");
        let sg = node(NodeKind::SecurityGroup, "vpc-endpoint-sg-dev", json!({}));
        engine.create(&sg).await.unwrap();
        assert!(engine.create(&sg).await.is_err());
    }

    #[tokio::test]
    async fn missing_attribute() {
        let engine = LocalEngine::new("us-west-2");
        let err = engine
            .create(&node(NodeKind::IamRole, "eks-node-role-dev", json!({})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'name'"));
    }
}
