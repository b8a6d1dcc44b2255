use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for the resource graph.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("The attributes of node '{}' were already resolved", name))]
    AlreadyResolved { name: String },

    #[snafu(display("Error deserializing attributes: {}", source))]
    AttributeDeserialization { source: serde_json::Error },

    #[snafu(display("Error serializing attributes: {}", source))]
    AttributeSerialization { source: serde_json::Error },

    #[snafu(display(
        "Error serializing attributes: expected Value::Object type but got something else."
    ))]
    AttributeWrongValueType {},

    #[snafu(display("The resource graph contains a cycle among: {}", nodes.join(", ")))]
    CyclicGraph { nodes: Vec<String> },

    #[snafu(display(
        "Node '{}' depends on '{}' which has not been declared yet",
        node,
        dependency
    ))]
    DependencyUnresolved { node: String, dependency: String },

    #[snafu(display("Node '{}' has already been declared", name))]
    DuplicateNode { name: String },

    #[snafu(display("Invalid node name '{}': {}", name, reason))]
    InvalidNodeName { name: String, reason: String },

    #[snafu(display("'{}' is not a valid reference", reference))]
    InvalidReference { reference: String },

    #[snafu(display("Unable to resolve '{}': {}", reference, reason))]
    Unresolved { reference: String, reason: String },
}
