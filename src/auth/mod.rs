//! Credential loading for Archer connections
//!
//! # Examples
//!
//! ```rust,no_run
//! use archer_fetcher::auth::{load_dotenv, resolve_connection};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! load_dotenv();
//! let connection = resolve_connection()?;
//! println!("Connecting to {}", connection.base_url);
//! # Ok(())
//! # }
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{
    connection_from_env, connection_from_vars, get_auth_status, load_dotenv, prompt_password,
    resolve_connection, AuthStatus,
};
