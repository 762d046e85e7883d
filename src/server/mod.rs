//! Server module for exposing element endpoints over HTTP
//!
//! This module provides a `ServerBuilder` that registers one GET route per
//! endpoint pattern, all sharing a single [`EndpointPipeline`](crate::pipeline::EndpointPipeline).

pub mod builder;
pub mod router;

pub use builder::ServerBuilder;
pub use router::{EndpointState, build_endpoint_routes};
