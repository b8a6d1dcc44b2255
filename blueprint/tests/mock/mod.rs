/*!

Helpers for testing blueprints without a cloud account: a configuration source for a typical
environment and an engine that fails once on a chosen node, to simulate a partial failure.

!*/

use eksplan_blueprint::engine::{
    Attributes, EngineError, EngineResult, LocalEngine, MaterializedNode, ProvisioningEngine,
};
use eksplan_config::{ConfigResolver, ResolvedConfig};
use eksplan_model::NodeName;
use maplit::btreemap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// The `staging` settings, with `overrides` applied on top.
pub(crate) fn staging_config(overrides: &[(&str, &str)]) -> ResolvedConfig {
    ConfigResolver::new(&staging_settings(overrides))
        .resolve("staging")
        .unwrap()
}

/// The unresolved `staging` settings, keyed as in a stack file.
pub(crate) fn staging_settings(overrides: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut config: BTreeMap<String, String> = btreemap! {
        "eks:instance-type" => "t3.medium",
        "eks:min-size" => "1",
        "eks:max-size" => "3",
        "eks:desired-size" => "2",
        "eks:nat-gateways" => "1",
        "eks:vpc-max-azs" => "3",
        "eks:kubernetes-version" => "1.28",
        "eks:cluster-name-prefix" => "eks-cluster",
        "eks:project-name" => "eks-pulumi",
        "eks:managed-by" => "pulumi",
        "eks:cost-center" => "engineering",
    }
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (key, value) in overrides {
        config.insert(format!("eks:{}", key), value.to_string());
    }
    config
}

/// Wraps a [`LocalEngine`] and fails the first attempt to create `fail_on`.
pub(crate) struct FlakyEngine {
    inner: LocalEngine,
    fail_on: NodeName,
    failed: AtomicBool,
    creates: AtomicUsize,
}

impl FlakyEngine {
    pub(crate) fn new(region: &str, fail_on: NodeName) -> Self {
        Self {
            inner: LocalEngine::new(region),
            fail_on,
            failed: AtomicBool::new(false),
            creates: AtomicUsize::new(0),
        }
    }

    pub(crate) fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProvisioningEngine for FlakyEngine {
    async fn read(&self, name: &NodeName) -> EngineResult<Option<Attributes>> {
        self.inner.read(name).await
    }

    async fn create(&self, node: &MaterializedNode) -> EngineResult<Attributes> {
        if node.name == self.fail_on && !self.failed.swap(true, Ordering::SeqCst) {
            return Err(EngineError::new_with_context(format!(
                "simulated failure creating '{}'",
                node.name
            )));
        }
        let attributes = self.inner.create(node).await?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(attributes)
    }
}
