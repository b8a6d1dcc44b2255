use crate::deferred::{references_in, Deferred};
use crate::error::{self, Result};
use crate::Configuration;
use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_plain::{
    derive_deserialize_from_fromstr, derive_display_from_serialize,
    derive_fromstr_from_deserialize,
};
use snafu::ensure;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use topological_sort::TopologicalSort;

/// The longest logical name accepted for a node.
const MAX_NAME_LEN: usize = 128;

/// The kinds of cloud resources that can appear in a [`ResourceGraph`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Vpc,
    InternetGateway,
    Subnet,
    RouteTable,
    NatGateway,
    SecurityGroup,
    IamRole,
    PolicyAttachment,
    Cluster,
    IdentityProvider,
    NodeGroup,
    Endpoint,
    HelmRelease,
}

derive_display_from_serialize!(NodeKind);
derive_fromstr_from_deserialize!(NodeKind);

impl NodeKind {
    /// Whether the provider API accepts tags for this kind of resource. Policy attachments and
    /// Helm releases do not.
    pub fn is_taggable(&self) -> bool {
        !matches!(self, NodeKind::PolicyAttachment | NodeKind::HelmRelease)
    }
}

/// The stable logical name of a node, e.g. `eks-vpc-staging`. Names are lowercase alphanumerics
/// and `-`, and may neither start nor end with `-`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeName(String);

impl NodeName {
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: &str| {
            error::InvalidNodeNameSnafu {
                name: name.clone(),
                reason,
            }
            .fail()
        };
        if name.is_empty() {
            return invalid("the name is empty");
        }
        if name.len() > MAX_NAME_LEN {
            return invalid("the name is too long");
        }
        if name.starts_with('-') || name.ends_with('-') {
            return invalid("the name may not start or end with '-'");
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return invalid("only lowercase alphanumerics and '-' are allowed");
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for NodeName {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

derive_deserialize_from_fromstr!(NodeName, "a lowercase node name such as eks-vpc-staging");

/// A handle to a node that has been declared in a [`ResourceGraph`]. Handles are only handed out
/// by [`ResourceGraph::declare`], so holding one means the node already exists upstream.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeRef {
    name: NodeName,
    kind: NodeKind,
}

impl NodeRef {
    pub fn name(&self) -> &NodeName {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// A deferred reference to one of this node's post-creation attributes.
    pub fn output<S: Into<String>>(&self, attribute: S) -> Deferred {
        Deferred::new(self.name.clone(), attribute)
    }
}

/// The desired state of a single resource. A `Node` is assembled with its builder-style methods
/// and becomes immutable once it is handed to [`ResourceGraph::declare`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    name: NodeName,
    kind: NodeKind,
    #[serde(default)]
    depends_on: BTreeSet<NodeName>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    attributes: Map<String, Value>,
}

impl Node {
    pub fn new(kind: NodeKind, name: NodeName) -> Self {
        Self {
            name,
            kind,
            depends_on: BTreeSet::new(),
            tags: BTreeMap::new(),
            attributes: Map::new(),
        }
    }

    /// Merge a typed attribute struct into the attribute bag.
    pub fn with_attributes<C>(mut self, attributes: C) -> Result<Self>
    where
        C: Configuration,
    {
        self.attributes.extend(attributes.into_map()?);
        Ok(self)
    }

    pub fn with_attribute<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Add an ordering-only dependency. Dependencies that come from deferred references in the
    /// attributes are found automatically when the node is declared.
    pub fn depends_on(mut self, node: &NodeRef) -> Self {
        self.depends_on.insert(node.name.clone());
        self
    }

    pub fn depends_on_all<'a, I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = &'a NodeRef>,
    {
        self.depends_on
            .extend(nodes.into_iter().map(|node| node.name.clone()));
        self
    }

    pub fn name(&self) -> &NodeName {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn dependencies(&self) -> &BTreeSet<NodeName> {
        &self.depends_on
    }

    pub fn depends_on_node(&self, node: &NodeRef) -> bool {
        self.depends_on.contains(node.name())
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The nodes whose outputs are referenced anywhere in this node's attributes.
    pub fn references(&self) -> Result<BTreeSet<NodeName>> {
        let mut names = BTreeSet::new();
        for (key, value) in &self.attributes {
            names.extend(references_in(&Value::String(key.clone()))?);
            names.extend(references_in(value)?);
        }
        Ok(names)
    }
}

/// A directed acyclic graph of resources keyed by logical name.
///
/// Nodes are write-once: [`ResourceGraph::declare`] rejects a name that already exists and rejects
/// any node whose dependencies have not been declared before it. Together these make it
/// impossible to build a graph with a cycle or a dangling edge.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGraph {
    nodes: BTreeMap<NodeName, Node>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node` to the graph and return a handle to it. Every deferred reference in the node's
    /// attributes becomes a dependency edge.
    pub fn declare(&mut self, mut node: Node) -> Result<NodeRef> {
        ensure!(
            !self.nodes.contains_key(&node.name),
            error::DuplicateNodeSnafu {
                name: node.name.to_string()
            }
        );
        let references = node.references()?;
        node.depends_on.extend(references);
        for dependency in &node.depends_on {
            ensure!(
                self.nodes.contains_key(dependency),
                error::DependencyUnresolvedSnafu {
                    node: node.name.to_string(),
                    dependency: dependency.to_string(),
                }
            );
        }
        trace!(
            "Declared {} '{}' depending on {:?}",
            node.kind,
            node.name,
            node.depends_on
        );
        let node_ref = NodeRef {
            name: node.name.clone(),
            kind: node.kind,
        };
        self.nodes.insert(node.name.clone(), node);
        Ok(node_ref)
    }

    pub fn get(&self, name: &NodeName) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn node(&self, node: &NodeRef) -> Option<&Node> {
        self.nodes.get(node.name())
    }

    pub fn contains(&self, name: &NodeName) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |node| node.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes that must exist before `name` can be created, directly or indirectly.
    pub fn transitive_dependencies(&self, name: &NodeName) -> BTreeSet<NodeName> {
        let mut visited = BTreeSet::new();
        let mut to_be_visited: Vec<&NodeName> = self
            .nodes
            .get(name)
            .map(|node| node.depends_on.iter().collect())
            .unwrap_or_default();
        while let Some(next) = to_be_visited.pop() {
            if visited.insert(next.clone()) {
                if let Some(node) = self.nodes.get(next) {
                    to_be_visited.extend(node.depends_on.iter());
                }
            }
        }
        visited
    }

    /// Group the nodes into creation stages. Every node appears after all of its dependencies and
    /// the nodes within a stage do not depend on one another, so an engine may create them
    /// concurrently. Stages are sorted by name so the order is reproducible.
    pub fn creation_order(&self) -> Result<Vec<Vec<NodeName>>> {
        let mut topo_sort = TopologicalSort::<NodeName>::new();
        for node in self.nodes.values() {
            topo_sort.insert(node.name.clone());
            for dependency in &node.depends_on {
                topo_sort.add_dependency(dependency.clone(), node.name.clone());
            }
        }

        let mut stages: Vec<Vec<NodeName>> = Vec::new();
        while !topo_sort.is_empty() {
            let mut stage = topo_sort.pop_all();
            if stage.is_empty() {
                let staged: BTreeSet<&NodeName> = stages.iter().flatten().collect();
                return error::CyclicGraphSnafu {
                    nodes: self
                        .nodes
                        .keys()
                        .filter(|name| !staged.contains(name))
                        .map(|name| name.to_string())
                        .collect::<Vec<_>>(),
                }
                .fail();
            }
            stage.sort();
            stages.push(stage);
        }
        Ok(stages)
    }
}

#[cfg(test)]
mod test {
    use super::{Node, NodeKind, NodeName, ResourceGraph};
    use crate::Error;
    use std::collections::BTreeSet;

    fn name(s: &str) -> NodeName {
        NodeName::new(s).unwrap()
    }

    #[test]
    fn node_names() {
        assert!(NodeName::new("eks-vpc-staging").is_ok());
        assert!(NodeName::new("s3-endpoint-production").is_ok());
        assert!(NodeName::new("").is_err());
        assert!(NodeName::new("-vpc").is_err());
        assert!(NodeName::new("vpc-").is_err());
        assert!(NodeName::new("Vpc").is_err());
        assert!(NodeName::new("eks.vpc").is_err());
        assert!(NodeName::new("a".repeat(129)).is_err());
    }

    #[test]
    fn kind_display() {
        assert_eq!(NodeKind::IamRole.to_string(), "iamRole");
        assert_eq!(
            "policyAttachment".parse::<NodeKind>().unwrap(),
            NodeKind::PolicyAttachment
        );
        assert!(!NodeKind::PolicyAttachment.is_taggable());
        assert!(NodeKind::Subnet.is_taggable());
    }

    #[test]
    fn declare_requires_dependencies() {
        let mut other = ResourceGraph::new();
        let vpc_elsewhere = other
            .declare(Node::new(NodeKind::Vpc, name("eks-vpc-staging")))
            .unwrap();

        let mut graph = ResourceGraph::new();
        let err = graph
            .declare(Node::new(NodeKind::Subnet, name("subnet-a")).depends_on(&vpc_elsewhere))
            .unwrap_err();
        assert!(matches!(err, Error::DependencyUnresolved { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn references_become_dependencies() {
        let mut graph = ResourceGraph::new();
        let vpc = graph
            .declare(Node::new(NodeKind::Vpc, name("eks-vpc-staging")))
            .unwrap();
        let subnet = graph
            .declare(
                Node::new(NodeKind::Subnet, name("eks-vpc-staging-public-0"))
                    .with_attribute("vpcId", vpc.output("id").to_string()),
            )
            .unwrap();
        let node = graph.node(&subnet).unwrap();
        assert!(node.depends_on_node(&vpc));
    }

    #[test]
    fn unresolved_reference_is_rejected() {
        let mut graph = ResourceGraph::new();
        let err = graph
            .declare(
                Node::new(NodeKind::Subnet, name("eks-vpc-staging-public-0"))
                    .with_attribute("vpcId", "${eks-vpc-staging.id}"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::DependencyUnresolved { .. }));
    }

    #[test]
    fn nodes_are_write_once() {
        let mut graph = ResourceGraph::new();
        graph
            .declare(Node::new(NodeKind::Vpc, name("eks-vpc-staging")))
            .unwrap();
        let err = graph
            .declare(
                Node::new(NodeKind::Vpc, name("eks-vpc-staging"))
                    .with_attribute("cidrBlock", "10.1.0.0/16"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateNode { .. }));
        assert!(graph
            .get(&name("eks-vpc-staging"))
            .unwrap()
            .attributes()
            .is_empty());
    }

    #[test]
    fn creation_order_stages() {
        let mut graph = ResourceGraph::new();
        let vpc = graph
            .declare(Node::new(NodeKind::Vpc, name("vpc")))
            .unwrap();
        let role = graph
            .declare(Node::new(NodeKind::IamRole, name("role")))
            .unwrap();
        let a = graph
            .declare(Node::new(NodeKind::Subnet, name("subnet-a")).depends_on(&vpc))
            .unwrap();
        let b = graph
            .declare(Node::new(NodeKind::Subnet, name("subnet-b")).depends_on(&vpc))
            .unwrap();
        graph
            .declare(
                Node::new(NodeKind::Cluster, name("cluster"))
                    .depends_on_all([&a, &b, &role]),
            )
            .unwrap();

        let stages = graph.creation_order().unwrap();
        assert_eq!(
            stages,
            vec![
                vec![name("role"), name("vpc")],
                vec![name("subnet-a"), name("subnet-b")],
                vec![name("cluster")],
            ]
        );
        assert_eq!(
            graph.transitive_dependencies(&name("cluster")),
            ["role", "subnet-a", "subnet-b", "vpc"]
                .iter()
                .map(|s| name(s))
                .collect::<BTreeSet<_>>()
        );
    }
}
