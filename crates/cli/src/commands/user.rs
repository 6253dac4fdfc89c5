//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! sf-cli user create -e wes@example.com -n "Wes" -p "correct horse battery"
//! ```
//!
//! The password may also come from `STOREFINDER_NEW_USER_PASSWORD` so it
//! stays out of shell history.

use thiserror::Error;

use storefinder_core::UserId;
use storefinder_web::db::PgUserRepository;
use storefinder_web::services::{AuthError, AuthService};

use super::{CommandError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Could not create user: {0}")]
    Auth(#[from] AuthError),
}

/// Register a new user with the same rules as the registration form.
///
/// # Returns
///
/// The ID of the created user.
///
/// # Errors
///
/// Returns an error if the email, name or password is rejected, the email
/// is already registered, or the database is unreachable.
pub async fn create(email: &str, name: &str, password: &str) -> Result<UserId, UserError> {
    let pool = connect().await?;
    let users = PgUserRepository::new(pool);

    tracing::info!("Creating user: {}", email);
    let user = AuthService::new(&users)
        .register(email, name, password)
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}
