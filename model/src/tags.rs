use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The standard tags applied to every taggable resource for cost attribution and ownership
/// tracking.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tags {
    pub environment: String,
    pub project: String,
    pub managed_by: String,
    pub cost_center: String,
}

impl Tags {
    /// The tag keys, in the order they are rendered.
    pub const KEYS: [&'static str; 4] = ["Environment", "Project", "ManagedBy", "CostCenter"];

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("Environment".to_string(), self.environment.clone());
        map.insert("Project".to_string(), self.project.clone());
        map.insert("ManagedBy".to_string(), self.managed_by.clone());
        map.insert("CostCenter".to_string(), self.cost_center.clone());
        map
    }

    /// The standard tags plus `extra`. A key in `extra` that collides with a standard tag does not
    /// override it.
    pub fn merged_with<I, K, V>(&self, extra: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map: BTreeMap<String, String> = extra
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        map.extend(self.to_map());
        map
    }
}
