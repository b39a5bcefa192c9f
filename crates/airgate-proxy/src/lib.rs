//! Model-aware reverse proxy core
//!
//! Keeps a periodically refreshed registry of which account serves which
//! model, picks an account per request while steering away from recently
//! failed ones, and streams the winning upstream response back unchanged.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod discovery;
pub mod error;
pub mod failure;
pub mod forwarder;
pub mod handler;
pub mod orchestrator;
pub mod pattern;
pub mod protocol;
pub mod random;
pub mod registry;
pub mod state;
pub mod stream;

#[cfg(test)]
mod testing;

pub use discovery::{HttpModelSource, ModelSource, start_discovery};
pub use error::ProxyError;
pub use failure::FailureTracker;
pub use forwarder::{Forward, ForwardRequest, HttpForwarder};
pub use handler::{error_response, proxy_router};
pub use orchestrator::{Orchestrator, RetryPolicy, RouteOutcome};
pub use pattern::Pattern;
pub use random::RandomSource;
pub use registry::{ModelRegistry, RefreshSummary, ResolveError, Snapshot};
pub use state::{ProxyComponents, ProxyState};
