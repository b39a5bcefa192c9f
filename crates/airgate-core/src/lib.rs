//! Shared domain types and HTTP error conventions for Airgate

#![allow(clippy::must_use_candidate)]

mod account;
mod alias;
mod error;
pub mod headers;

pub use account::Account;
pub use alias::ModelAlias;
pub use error::{ErrorBody, ErrorEnvelope, HttpError};
