//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] storefinder_core::EmailError),

    /// Blank display name.
    #[error("name is required")]
    MissingName,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message to show on the registration form, or `None` for server-side
    /// failures that should not be echoed back.
    #[must_use]
    pub fn form_message(&self) -> Option<String> {
        match self {
            Self::InvalidEmail(_) => Some("You must supply a valid email!".to_owned()),
            Self::MissingName => Some("You must supply a name!".to_owned()),
            Self::WeakPassword(msg) => Some(msg.clone()),
            Self::UserAlreadyExists => {
                Some("An account with this email already exists".to_owned())
            }
            Self::InvalidCredentials => Some("Failed Login!".to_owned()),
            Self::Repository(_) | Self::PasswordHash => None,
        }
    }
}
