//! Black-box verifier for a distributed document database.
//!
//! Drives a running server through its HTTP admin API and checks two things:
//! that cluster-level database properties survive a dump/restore, and that an
//! asynchronously applied routing reload eventually takes effect.
//!
//! The building blocks are usable on their own:
//! - [`ConsistencyVerifier`] compares live database properties with a [`ClusterConfig`]
//! - [`AsyncReloadWaiter`] triggers a reload and polls for its effect
//! - [`Session`] and [`Teardown`] keep each case's footprint scoped
//! - [`Suite`] runs the canonical cases and reports each one

mod client;
mod config;
mod constants;
mod errors;
mod fixture;
mod migration;
mod reload;
mod routing;
mod session;
mod setup;
mod suite;
mod teardown;
mod verifier;

pub use client::*;
pub use config::*;
pub use constants::*;
pub use errors::*;
pub use fixture::*;
pub use migration::*;
pub use reload::*;
pub use routing::*;
pub use session::*;
pub use setup::*;
pub use suite::*;
pub use teardown::*;
pub use verifier::*;

#[cfg(test)]
mod routing_test;
