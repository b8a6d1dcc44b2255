/*!

The resource graph of an EKS environment. [`Blueprint::build`] takes a resolved configuration and
runs the builders in dependency order:

```text
network -> roles -> cluster -> identity provider -> node group | endpoints | ingress role
```

The resulting graph can be planned (stages of nodes that may be created concurrently) or applied
with any [`engine::ProvisioningEngine`]. [`engine::LocalEngine`] simulates a provider in memory.

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

/// Implement `Display` using `serde_json` `to_string_pretty` for types that implement Serialize.
#[macro_export]
macro_rules! impl_display_as_json {
    ($i:ident) => {
        impl std::fmt::Display for $i {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = serde_json::to_string_pretty(self)
                    .unwrap_or_else(|e| format!("Serialization failed: {}", e));
                std::fmt::Display::fmt(&s, f)
            }
        }
    };
}

pub mod cluster;
pub mod endpoints;
pub mod engine;
mod error;
pub mod identity;
pub mod ingress;
pub mod naming;
pub mod network;
pub mod nodegroup;
mod orchestrator;
mod outputs;

pub use error::{Error, Result};
pub use orchestrator::{Blueprint, Deployment, PlannedNode, NODE_ROLE_POLICIES};
pub use outputs::{OutputRefs, StackOutputs};
