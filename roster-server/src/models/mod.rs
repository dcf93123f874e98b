//! Domain models with validation
//!
//! Request payloads are parsed into these types before any store access.

pub mod user;
pub mod validation;

pub use user::{CreateUserRequest, NewUser};
pub use validation::ValidationError;
