use crate::error::{self, Result};
use crate::graph::{NodeName, ResourceGraph};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_plain::{derive_deserialize_from_fromstr, derive_serialize_from_display};
use snafu::{OptionExt, ResultExt};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;

const REFERENCE_PATTERN_REGEX: &str =
    r"\$\{([a-z0-9][a-z0-9-]*)\.([A-Za-z0-9_]+)(?:\|([a-z-]+))?\}";

lazy_static::lazy_static! {

    static ref REGEX: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(REFERENCE_PATTERN_REGEX).unwrap()
    };

    static ref EXACT_REGEX: Regex = {
        #[allow(clippy::unwrap_used)]
        Regex::new(&format!("^{}$", REFERENCE_PATTERN_REGEX)).unwrap()
    };
}

/// A transformation applied to a resolved value before it is substituted.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Projection {
    /// The value is used as-is.
    Identity,
    /// The value is a URL and its scheme (e.g. `https://`) is removed.
    WithoutScheme,
}

impl Default for Projection {
    fn default() -> Self {
        Self::Identity
    }
}

/// A reference to an attribute that a node only has after it has been created, such as a
/// cluster's endpoint or an identity provider's ARN.
///
/// In an attribute bag a `Deferred` is written as `${<node>.<attribute>}`, or
/// `${<node>.<attribute>|without-scheme}` when a projection is applied. Declaring a node whose
/// attributes contain a reference adds an edge to the referenced node, and the engine driver
/// substitutes the value from that node's [`Resolutions`] cell before creating the dependent.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Deferred {
    node: NodeName,
    attribute: String,
    projection: Projection,
}

impl Deferred {
    pub fn new<S: Into<String>>(node: NodeName, attribute: S) -> Self {
        Self {
            node,
            attribute: attribute.into(),
            projection: Projection::Identity,
        }
    }

    /// The same reference with the URL scheme stripped from the resolved value.
    pub fn without_scheme(&self) -> Self {
        Self {
            projection: Projection::WithoutScheme,
            ..self.clone()
        }
    }

    pub fn node(&self) -> &NodeName {
        &self.node
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Parse a string that consists of exactly one reference.
    pub fn parse<S: AsRef<str>>(s: S) -> Result<Self> {
        let s = s.as_ref();
        let captures = EXACT_REGEX
            .captures(s)
            .context(error::InvalidReferenceSnafu { reference: s })?;
        from_captures(&captures, s)
    }

    fn project(&self, value: &Value) -> Result<Value> {
        match self.projection {
            Projection::Identity => Ok(value.clone()),
            Projection::WithoutScheme => {
                let url = value.as_str().context(error::UnresolvedSnafu {
                    reference: self.to_string(),
                    reason: "only string values can have their scheme removed",
                })?;
                Ok(Value::String(strip_scheme(url).to_string()))
            }
        }
    }
}

impl Display for Deferred {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.projection {
            Projection::Identity => write!(f, "${{{}.{}}}", self.node, self.attribute),
            Projection::WithoutScheme => {
                write!(f, "${{{}.{}|without-scheme}}", self.node, self.attribute)
            }
        }
    }
}

impl FromStr for Deferred {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Deferred> for Value {
    fn from(deferred: Deferred) -> Self {
        Value::String(deferred.to_string())
    }
}

impl From<&Deferred> for Value {
    fn from(deferred: &Deferred) -> Self {
        Value::String(deferred.to_string())
    }
}

derive_serialize_from_display!(Deferred);
derive_deserialize_from_fromstr!(Deferred, "a reference such as ${eks-cluster-staging.endpoint}");

fn from_captures(captures: &Captures<'_>, input: &str) -> Result<Deferred> {
    let node = captures
        .get(1)
        .context(error::InvalidReferenceSnafu { reference: input })?
        .as_str();
    let attribute = captures
        .get(2)
        .context(error::InvalidReferenceSnafu { reference: input })?
        .as_str();
    let projection = match captures.get(3).map(|m| m.as_str()) {
        None => Projection::Identity,
        Some(projection) => serde_plain::from_str::<Projection>(projection)
            .ok()
            .context(error::InvalidReferenceSnafu { reference: input })?,
    };
    Ok(Deferred {
        node: NodeName::new(node)?,
        attribute: attribute.to_string(),
        projection,
    })
}

/// Remove the scheme (e.g. `https://`) from a URL, leaving it unchanged if it has none.
pub fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map(|(_, rest)| rest).unwrap_or(url)
}

/// Every node referenced anywhere in `value`, including object keys.
pub(crate) fn references_in(value: &Value) -> Result<BTreeSet<NodeName>> {
    let mut names = BTreeSet::new();
    match value {
        Value::String(s) => {
            for captures in REGEX.captures_iter(s) {
                names.insert(from_captures(&captures, s)?.node);
            }
        }
        Value::Array(values) => {
            for value in values {
                names.extend(references_in(value)?);
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                names.extend(references_in(&Value::String(key.clone()))?);
                names.extend(references_in(value)?);
            }
        }
        _ => {}
    }
    Ok(names)
}

/// The post-creation attributes of every node in a graph, each held in a cell that can be written
/// exactly once. Clones share the same cells.
#[derive(Clone, Debug, Default)]
pub struct Resolutions {
    cells: BTreeMap<NodeName, Arc<OnceCell<Map<String, Value>>>>,
}

impl Resolutions {
    /// Create one empty cell for each node of `graph`.
    pub fn for_graph(graph: &ResourceGraph) -> Self {
        Self {
            cells: graph
                .nodes()
                .map(|node| (node.name().clone(), Arc::new(OnceCell::new())))
                .collect(),
        }
    }

    /// Record the attributes of `name` after it has been created. This is the single point at
    /// which a node's deferred values become available.
    pub fn resolve(&self, name: &NodeName, attributes: Map<String, Value>) -> Result<()> {
        let cell = self.cells.get(name).context(error::UnresolvedSnafu {
            reference: name.to_string(),
            reason: "the node is not part of the graph",
        })?;
        cell.set(attributes)
            .ok()
            .context(error::AlreadyResolvedSnafu {
                name: name.to_string(),
            })
    }

    pub fn is_resolved(&self, name: &NodeName) -> bool {
        self.cells
            .get(name)
            .map(|cell| cell.initialized())
            .unwrap_or_default()
    }

    pub fn attributes(&self, name: &NodeName) -> Option<&Map<String, Value>> {
        self.cells.get(name).and_then(|cell| cell.get())
    }

    /// The value of a single reference.
    pub fn get(&self, reference: &Deferred) -> Result<Value> {
        let attributes = self
            .attributes(reference.node())
            .context(error::UnresolvedSnafu {
                reference: reference.to_string(),
                reason: "the node has not been created yet",
            })?;
        let value = attributes
            .get(reference.attribute())
            .context(error::UnresolvedSnafu {
                reference: reference.to_string(),
                reason: format!("no attribute '{}' on the node", reference.attribute()),
            })?;
        reference.project(value)
    }

    /// The value of a single reference as a string.
    pub fn get_string(&self, reference: &Deferred) -> Result<String> {
        Ok(value_to_string(self.get(reference)?))
    }

    /// Replace every reference in `value` with the referenced value. A string that consists of
    /// exactly one reference is replaced by the referenced value itself (which need not be a
    /// string); references embedded in longer strings or in object keys are interpolated.
    pub fn substitute(&self, value: &Value) -> Result<Value> {
        match value {
            Value::String(s) => self.substitute_string(s),
            Value::Array(values) => values
                .iter()
                .map(|value| self.substitute(value))
                .collect::<Result<Vec<Value>>>()
                .map(Value::Array),
            Value::Object(map) => self.substitute_map(map).map(Value::Object),
            other => Ok(other.clone()),
        }
    }

    pub fn substitute_map(&self, map: &Map<String, Value>) -> Result<Map<String, Value>> {
        map.iter()
            .map(|(key, value)| -> Result<(String, Value)> {
                Ok((self.interpolate(key)?, self.substitute(value)?))
            })
            .collect()
    }

    fn substitute_string(&self, s: &str) -> Result<Value> {
        if EXACT_REGEX.is_match(s) {
            return self.get(&Deferred::parse(s)?);
        }
        self.interpolate(s).map(Value::String)
    }

    fn interpolate(&self, s: &str) -> Result<String> {
        let mut interpolated = String::with_capacity(s.len());
        let mut last = 0;
        for captures in REGEX.captures_iter(s) {
            let whole = captures
                .get(0)
                .context(error::InvalidReferenceSnafu { reference: s })?;
            let reference = from_captures(&captures, s)?;
            interpolated.push_str(&s[last..whole.start()]);
            interpolated.push_str(&self.get_string(&reference)?);
            last = whole.end();
        }
        interpolated.push_str(&s[last..]);
        Ok(interpolated)
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Compact JSON text for `value`.
pub(crate) fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context(error::AttributeSerializationSnafu)
}

#[cfg(test)]
mod test {
    use super::{strip_scheme, Deferred, Projection, Resolutions};
    use crate::graph::{Node, NodeKind, NodeName, ResourceGraph};
    use crate::Error;
    use serde_json::{json, Map, Value};

    fn name(s: &str) -> NodeName {
        NodeName::new(s).unwrap()
    }

    fn attributes(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn resolved_cluster() -> Resolutions {
        let mut graph = ResourceGraph::new();
        graph
            .declare(Node::new(NodeKind::Cluster, name("eks-cluster-staging")))
            .unwrap();
        graph
            .declare(Node::new(NodeKind::Vpc, name("eks-vpc-staging")))
            .unwrap();
        let resolutions = Resolutions::for_graph(&graph);
        resolutions
            .resolve(
                &name("eks-cluster-staging"),
                attributes(json!({
                    "name": "eks-cluster-staging",
                    "identityOidcIssuer": "https://oidc.eks.us-west-2.amazonaws.com/id/ABC",
                    "subnetIds": ["subnet-1", "subnet-2"],
                })),
            )
            .unwrap();
        resolutions
    }

    #[test]
    fn render_and_parse() {
        let reference = Deferred::new(name("eks-cluster-staging"), "endpoint");
        assert_eq!(reference.to_string(), "${eks-cluster-staging.endpoint}");
        assert_eq!(
            reference.without_scheme().to_string(),
            "${eks-cluster-staging.endpoint|without-scheme}"
        );
        let parsed = Deferred::parse("${eks-oidc-provider-staging.url|without-scheme}").unwrap();
        assert_eq!(parsed.node().as_str(), "eks-oidc-provider-staging");
        assert_eq!(parsed.attribute(), "url");
        assert_eq!(parsed.projection(), Projection::WithoutScheme);
        assert!(Deferred::parse("hello").is_err());
        assert!(Deferred::parse("${hello}").is_err());
        assert!(Deferred::parse("foo${x.y}").is_err());
        assert!(Deferred::parse("${.x}").is_err());
        assert!(Deferred::parse("${x.}").is_err());
        assert!(Deferred::parse("${x.y|upper}").is_err());
    }

    #[test]
    fn serde_uses_template_form() {
        let reference = Deferred::new(name("eks-vpc-staging"), "id");
        let value = serde_json::to_value(&reference).unwrap();
        assert_eq!(value, json!("${eks-vpc-staging.id}"));
        let back: Deferred = serde_json::from_value(value).unwrap();
        assert_eq!(back, reference);
    }

    #[test]
    fn scheme_is_stripped() {
        assert_eq!(
            strip_scheme("https://oidc.eks.us-west-2.amazonaws.com/id/ABC"),
            "oidc.eks.us-west-2.amazonaws.com/id/ABC"
        );
        assert_eq!(strip_scheme("oidc.example.com"), "oidc.example.com");
    }

    #[test]
    fn substitution() {
        let resolutions = resolved_cluster();
        let input = json!({
            "clusterName": "${eks-cluster-staging.name}",
            "subnets": "${eks-cluster-staging.subnetIds}",
            "command": "aws eks update-kubeconfig --name ${eks-cluster-staging.name} --region us-west-2",
            "${eks-cluster-staging.identityOidcIssuer|without-scheme}:aud": "sts.amazonaws.com",
            "count": 3,
        });
        let output = resolutions.substitute(&input).unwrap();
        assert_eq!(
            output,
            json!({
                "clusterName": "eks-cluster-staging",
                "subnets": ["subnet-1", "subnet-2"],
                "command": "aws eks update-kubeconfig --name eks-cluster-staging --region us-west-2",
                "oidc.eks.us-west-2.amazonaws.com/id/ABC:aud": "sts.amazonaws.com",
                "count": 3,
            })
        );
    }

    #[test]
    fn unresolved_references() {
        let resolutions = resolved_cluster();
        let err = resolutions
            .substitute(&json!("${eks-vpc-staging.id}"))
            .unwrap_err();
        assert!(matches!(err, Error::Unresolved { .. }));
        let err = resolutions
            .substitute(&json!("${eks-cluster-staging.arn}"))
            .unwrap_err();
        assert!(matches!(err, Error::Unresolved { .. }));
    }

    #[test]
    fn cells_resolve_once() {
        let resolutions = resolved_cluster();
        let shared = resolutions.clone();
        let err = shared
            .resolve(&name("eks-cluster-staging"), Map::new())
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyResolved { .. }));
        assert!(resolutions.is_resolved(&name("eks-cluster-staging")));
        assert!(!resolutions.is_resolved(&name("eks-vpc-staging")));
        assert_eq!(
            resolutions
                .attributes(&name("eks-cluster-staging"))
                .unwrap()
                .get("name")
                .unwrap(),
            &json!("eks-cluster-staging")
        );
    }
}
