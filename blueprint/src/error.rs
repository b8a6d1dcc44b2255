use crate::engine::EngineError;
use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to {} for node '{}': {}", action, node, source))]
    Engine {
        action: String,
        node: String,
        source: EngineError,
    },

    #[snafu(display("Error declaring {}: {}", what, source))]
    Graph {
        what: String,
        source: eksplan_model::Error,
    },

    #[snafu(display("Node '{}' is missing from the graph", node))]
    MissingNode { node: String },

    #[snafu(display("Unable to resolve output values: {}", source))]
    Outputs { source: eksplan_model::Error },

    #[snafu(display("Unable to deserialize output values: {}", source))]
    OutputsDeserialization { source: serde_json::Error },

    #[snafu(display("Unable to serialize output values: {}", source))]
    OutputsSerialization { source: serde_json::Error },

    #[snafu(display(
        "Unable to split '{}' into {} subnets of at least /28",
        vpc_cidr,
        count
    ))]
    Subnetting { vpc_cidr: String, count: u32 },
}
