/*!

The contract between the blueprint and whatever actually provisions the resources, and the driver
that walks a [`ResourceGraph`](eksplan_model::ResourceGraph) against it.

The driver creates nodes in topological stages. Nodes within a stage do not depend on each other
and are materialized concurrently. Before a node is created its deferred references are replaced
with values from the [`Resolutions`] of the nodes it depends on, and once it exists its
post-creation attributes are written to its own cell, exactly once.

A node that the engine can already `read` is adopted instead of created again. A run that failed
part way through can therefore be repeated against the same engine and converges on the same
graph.

!*/

mod driver;
mod error;
mod local;

pub use driver::apply;
pub use error::{EngineError, EngineResult, IntoEngineError};
pub use local::LocalEngine;

use eksplan_model::{NodeKind, NodeName, Resolutions};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// The attributes of a node.
pub type Attributes = Map<String, Value>;

/// A node whose deferred references have all been replaced with concrete values, ready to be
/// handed to a [`ProvisioningEngine`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedNode {
    pub name: NodeName,
    pub kind: NodeKind,
    pub depends_on: BTreeSet<NodeName>,
    pub tags: BTreeMap<String, String>,
    pub attributes: Attributes,
}

/// You implement [`ProvisioningEngine`] to create real resources. The engine is addressed by the
/// stable logical name of each node.
#[async_trait::async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// The post-creation attributes of `name`, or `None` if it does not exist.
    async fn read(&self, name: &NodeName) -> EngineResult<Option<Attributes>>;

    /// Create the resource and return its post-creation attributes (for example its `id` or
    /// `arn`), which dependents may reference.
    async fn create(&self, node: &MaterializedNode) -> EngineResult<Attributes>;
}

/// What happened during [`apply()`].
#[derive(Clone, Debug)]
pub struct ApplyReport {
    pub resolutions: Resolutions,
    pub created: Vec<NodeName>,
    pub adopted: Vec<NodeName>,
}
