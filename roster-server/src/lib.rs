//! roster-server: user-creation HTTP service with startup migrations
//!
//! Startup is a strict sequence: resolve config, open the pool, ping it,
//! apply pending migrations, then bind and serve `POST /users`.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod migrate;
pub mod models;
pub mod startup;

pub use config::{ConfigError, DatabaseConfig, ServerConfig};
pub use error::{Result, StartupError};
pub use startup::run;
