/*!

Resolution and validation of the configuration of one EKS environment. Configuration is read from a
namespaced key-value [`ConfigSource`] (usually a Pulumi stack file) and turned into a
[`ResolvedConfig`] that is threaded explicitly through the blueprint builders.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

mod cidr;
mod error;
mod resolver;
mod source;
mod types;

pub use cidr::{Ipv4Cidr, MAX_SUBNET_PREFIX};
pub use error::{Error, Result};
pub use resolver::{
    ConfigResolver, ResolvedConfig, DEFAULT_NODE_DISK_SIZE, DEFAULT_REGION, DEFAULT_VPC_CIDR,
    DEFAULT_VPC_MAX_AZS, MAX_ENVIRONMENT_LEN, NAMESPACE, REGION_KEY,
};
pub use source::{ConfigSource, StackFile};
pub use types::{AmiType, CommonConfig, EnvironmentConfig, K8sVersion};
