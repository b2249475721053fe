//! Archer Fetcher Library
//!
//! A Rust library for reading Archer GRC applications through the platform
//! REST API and ContentAPI. Keeps pooled, self-healing sessions per
//! connection, caches application and field metadata with TTL, background
//! refresh and LRU eviction, and translates record keys between field
//! aliases and display names.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
