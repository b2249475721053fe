//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`transport`]: scripted [`ArcherTransport`](crate::app::client::ArcherTransport)
//!   and the matching transport factory.
//! - [`clock`]: a manually advanced [`Clock`](crate::app::clock::Clock).
//! - [`fixtures`]: builders for vendor JSON payloads and connections.

pub mod clock;
pub mod fixtures;
pub mod transport;
