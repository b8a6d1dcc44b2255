use crate::error::{self, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use snafu::ResultExt;
use std::fmt::Debug;

/// The `Configuration` trait is for the typed attribute structs that each builder declares. A
/// node stores its attributes as an open JSON object, so that the provisioning engine can treat
/// every kind of resource the same way:
///
/// ```yaml
/// attributes:
///   cidrBlock: 10.0.0.0/16
///   enableDnsHostnames: true
/// ```
///
/// The traits aggregated by the `Configuration` trait are typical of "plain old data" types and
/// provide a way for builders to strongly type data which is otherwise unconstrained.
///
pub trait Configuration:
    Serialize + DeserializeOwned + Clone + Debug + Send + Sync + Sized + 'static
{
    /// Convert the `Configuration` object to a serde `Map`.
    fn into_map(self) -> Result<Map<String, Value>> {
        match self.into_value()? {
            Value::Object(map) => Ok(map),
            _ => Err(error::AttributeWrongValueTypeSnafu {}.build()),
        }
    }

    /// Convert the `Configuration` object to a serde `Value`.
    fn into_value(self) -> Result<Value> {
        serde_json::to_value(self).context(error::AttributeSerializationSnafu)
    }
}
