use super::{ApplyReport, Attributes, MaterializedNode, ProvisioningEngine};
use crate::error::{self, Result};
use crate::identity::ASSUME_ROLE_POLICY;
use eksplan_model::{NodeKind, NodeName, Resolutions, ResourceGraph, TrustPolicy};
use futures::future::try_join_all;
use log::{debug, info};
use serde_json::Value;
use snafu::{OptionExt, ResultExt};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Outcome {
    Created,
    Adopted,
}

/// Materialize every node of `graph` with `engine`.
pub async fn apply<E>(graph: &ResourceGraph, engine: &E) -> Result<ApplyReport>
where
    E: ProvisioningEngine + ?Sized,
{
    let stages = graph
        .creation_order()
        .context(error::GraphSnafu {
            what: "the creation order",
        })?;
    let resolutions = Resolutions::for_graph(graph);
    let mut created = Vec::new();
    let mut adopted = Vec::new();

    for (i, stage) in stages.iter().enumerate() {
        info!(
            "Stage {} of {}: {} node(s)",
            i + 1,
            stages.len(),
            stage.len()
        );
        let outcomes = try_join_all(
            stage
                .iter()
                .map(|name| materialize(graph, engine, &resolutions, name)),
        )
        .await?;
        for (name, outcome) in stage.iter().zip(outcomes) {
            match outcome {
                Outcome::Created => created.push(name.clone()),
                Outcome::Adopted => adopted.push(name.clone()),
            }
        }
    }

    info!(
        "Applied {} node(s): {} created, {} adopted",
        graph.len(),
        created.len(),
        adopted.len()
    );
    Ok(ApplyReport {
        resolutions,
        created,
        adopted,
    })
}

async fn materialize<E>(
    graph: &ResourceGraph,
    engine: &E,
    resolutions: &Resolutions,
    name: &NodeName,
) -> Result<Outcome>
where
    E: ProvisioningEngine + ?Sized,
{
    let node = graph
        .get(name)
        .context(error::MissingNodeSnafu {
            node: name.to_string(),
        })?;

    let existing = engine
        .read(name)
        .await
        .context(error::EngineSnafu {
            action: "read",
            node: name.to_string(),
        })?;
    let (outcome, attributes) = match existing {
        Some(attributes) => {
            debug!("Adopting existing {} '{}'", node.kind(), name);
            (Outcome::Adopted, attributes)
        }
        None => {
            let mut attributes = resolutions
                .substitute_map(node.attributes())
                .context(error::GraphSnafu {
                    what: format!("the attributes of '{}'", name),
                })?;
            render_trust_policy(node.kind(), &mut attributes).context(error::GraphSnafu {
                what: format!("the trust policy of '{}'", name),
            })?;
            let materialized = MaterializedNode {
                name: name.clone(),
                kind: node.kind(),
                depends_on: node.dependencies().clone(),
                tags: node.tags().clone(),
                attributes,
            };
            debug!("Creating {} '{}'", node.kind(), name);
            let attributes =
                engine
                    .create(&materialized)
                    .await
                    .context(error::EngineSnafu {
                        action: "create",
                        node: name.to_string(),
                    })?;
            (Outcome::Created, attributes)
        }
    };

    resolutions
        .resolve(name, attributes)
        .context(error::GraphSnafu {
            what: format!("the attributes of '{}'", name),
        })?;
    Ok(outcome)
}

/// A role is created with its trust policy as canonical JSON text, once every reference in it has
/// been substituted.
fn render_trust_policy(kind: NodeKind, attributes: &mut Attributes) -> eksplan_model::Result<()> {
    if kind != NodeKind::IamRole {
        return Ok(());
    }
    if let Some(policy) = attributes.remove(ASSUME_ROLE_POLICY) {
        let text = TrustPolicy::from_value(policy)?.to_canonical_json()?;
        attributes.insert(ASSUME_ROLE_POLICY.to_string(), Value::String(text));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::render_trust_policy;
    use crate::engine::Attributes;
    use eksplan_model::{NodeKind, TrustPolicy};
    use serde_json::{json, Value};

    fn role_attributes() -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("name".to_string(), json!("eks-node-role-dev"));
        attributes.insert(
            "assumeRolePolicy".to_string(),
            TrustPolicy::for_service("ec2.amazonaws.com")
                .into_value()
                .unwrap(),
        );
        attributes
    }

    #[test]
    fn role_policy_is_rendered_as_text() {
        let mut attributes = role_attributes();
        render_trust_policy(NodeKind::IamRole, &mut attributes).unwrap();
        assert_eq!(
            attributes.get("assumeRolePolicy").unwrap(),
            &Value::String(
                r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"Service":"ec2.amazonaws.com"},"Action":"sts:AssumeRole"}]}"#
                    .to_string()
            )
        );
        assert_eq!(attributes.get("name").unwrap(), &json!("eks-node-role-dev"));
    }

    #[test]
    fn other_kinds_are_untouched() {
        let mut attributes = role_attributes();
        render_trust_policy(NodeKind::Cluster, &mut attributes).unwrap();
        assert_eq!(attributes, role_attributes());
    }

    #[test]
    fn malformed_policy_is_rejected() {
        let mut attributes = Attributes::new();
        attributes.insert("assumeRolePolicy".to_string(), json!({"Version": 1}));
        assert!(render_trust_policy(NodeKind::IamRole, &mut attributes).is_err());
    }
}
