//! Compile OpenAPI 3.x documents into callable tools and invoke them with
//! managed credentials.
//!
//! See [`tools::openapi`] for compilation and invocation and [`tools::auth`]
//! for credential handling.

pub mod compat;
pub mod config;
pub mod errors;
pub mod observability;
pub mod poll;
pub mod tools;

pub use compat::{MaybeSend, MaybeSync};
pub use errors::{RestkitError, RestkitResult};
