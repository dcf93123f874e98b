//! Database layer - connection pool and repositories
//!
//! The pool is built once at startup and handed to the HTTP layer through
//! the `UserStore` trait; nothing reaches for it through global state.

pub mod pool;
pub mod repos;

pub use pool::{create_pool, ping};
pub use repos::*;
