//! User creation payload

use serde::Deserialize;

use super::ValidationError;

/// Raw `POST /users` body. Both fields are optional here so a missing
/// field is reported as a validation error rather than a parse error.
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl CreateUserRequest {
    /// Parse a request body. The content type is not checked.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::Malformed {
            reason: e.to_string(),
        })
    }

    /// Check required fields and produce an insertable user
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        NewUser::new(
            self.username.ok_or(ValidationError::Missing { field: "username" })?,
            self.email.ok_or(ValidationError::Missing { field: "email" })?,
        )
    }
}

/// A user ready for insertion. Uniqueness is not enforced anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    username: String,
    email: String,
}

impl NewUser {
    pub fn new(username: String, email: String) -> Result<Self, ValidationError> {
        if username.is_empty() {
            return Err(ValidationError::Empty { field: "username" });
        }
        if email.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }
        Ok(Self { username, email })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}
