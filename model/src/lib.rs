/*!

This library provides the resource graph used to describe an EKS environment: the nodes and their
dependency edges, deferred references to post-creation attributes, typed IAM trust policies and
the standard tag set applied to every resource.

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

pub use configuration::Configuration;
pub use deferred::{strip_scheme, Deferred, Projection, Resolutions};
pub use error::{Error, Result};
pub use graph::{Node, NodeKind, NodeName, NodeRef, ResourceGraph};
pub use policy::{Condition, Effect, Principal, Statement, StsAction, TrustPolicy};
pub use tags::Tags;

mod configuration;
pub mod constants;
mod deferred;
mod error;
mod graph;
mod policy;
mod tags;
