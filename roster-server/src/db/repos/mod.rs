//! Repository implementations for database access
//!
//! Repositories sit behind traits so the HTTP layer can run against
//! in-memory doubles in tests.

pub mod users;

pub use users::{DbError, UserRepo, UserStore};
