//! Command-line interface components
//!
//! This module contains CLI-specific code for Archer Fetcher: argument
//! parsing and the command handlers that drive [`crate::app::ArcherService`].

pub mod args;
pub mod commands;

pub use args::{
    AuthAction, AuthArgs, CacheAction, CacheArgs, Cli, Commands, FieldsArgs, GlobalArgs,
    RecordsArgs,
};
pub use commands::{handle_auth, handle_cache, handle_fields, handle_records, CommandContext};
