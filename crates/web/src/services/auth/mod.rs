//! Authentication service.
//!
//! Password registration and login. Hashing goes through the
//! [`CredentialVerifier`] trait, implemented for production by
//! [`Argon2Verifier`].

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use storefinder_core::Email;

use crate::db::{RepositoryError, UserRepository};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Hashes and checks passwords.
pub trait CredentialVerifier: Send + Sync {
    /// Hash a password into a self-describing string (salt included).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if hashing fails.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Check a password against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the password does not match.
    /// Returns `AuthError::PasswordHash` if the stored hash is malformed.
    fn verify(&self, password: &str, hash: &str) -> Result<(), AuthError>;

    /// Do the work of a verification against no user, so a login for an
    /// unknown email takes as long as one with a wrong password.
    fn verify_absent(&self, password: &str);
}

/// Argon2id with the crate's default parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Verifier;

/// Hash checked when the email is unknown.
static ABSENT_USER_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| Argon2Verifier.hash("no such user, no such password").ok());

impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| AuthError::PasswordHash)?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    fn verify_absent(&self, password: &str) {
        if let Some(hash) = ABSENT_USER_HASH.as_deref() {
            let _ = self.verify(password, hash);
        }
    }
}

/// Authentication service.
///
/// Handles user registration and password login.
pub struct AuthService<'a, V: CredentialVerifier = Argon2Verifier> {
    users: &'a dyn UserRepository,
    verifier: V,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service using Argon2.
    #[must_use]
    pub const fn new(users: &'a dyn UserRepository) -> Self {
        Self {
            users,
            verifier: Argon2Verifier,
        }
    }
}

impl<'a, V: CredentialVerifier> AuthService<'a, V> {
    /// Create a new authentication service with a specific verifier.
    #[must_use]
    pub const fn with_verifier(users: &'a dyn UserRepository, verifier: V) -> Self {
        Self { users, verifier }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::MissingName` if the name is blank.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[tracing::instrument(skip(self, name, password))]
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingName);
        }

        validate_password(password)?;
        let password_hash = self.verifier.hash(password)?;

        let user = self
            .users
            .create_with_password(&email, name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// A malformed email, an unknown email and a wrong password all produce
    /// the same error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Ok(email) = Email::parse(email) else {
            self.verifier.verify_absent(password);
            return Err(AuthError::InvalidCredentials);
        };

        let Some((user, password_hash)) = self.users.get_password_hash(&email).await? else {
            self.verifier.verify_absent(password);
            return Err(AuthError::InvalidCredentials);
        };

        self.verifier.verify(password, &password_hash)?;

        Ok(user)
    }
}

/// Validate password meets minimum requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryUserRepository;

    /// Reversible stand-in so tests don't pay for Argon2.
    struct PlainVerifier;

    impl CredentialVerifier for PlainVerifier {
        fn hash(&self, password: &str) -> Result<String, AuthError> {
            Ok(format!("plain${password}"))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<(), AuthError> {
            if hash.strip_prefix("plain$") == Some(password) {
                Ok(())
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }

        fn verify_absent(&self, _password: &str) {}
    }

    fn service(users: &MemoryUserRepository) -> AuthService<'_, PlainVerifier> {
        AuthService::with_verifier(users, PlainVerifier)
    }

    #[test]
    fn test_argon2_round_trip() {
        let hash = Argon2Verifier.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(Argon2Verifier.verify("correct horse", &hash).is_ok());
        assert!(matches!(
            Argon2Verifier.verify("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_argon2_rejects_malformed_hash() {
        assert!(matches!(
            Argon2Verifier.verify("pw", "not-a-phc-string"),
            Err(AuthError::PasswordHash)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let users = MemoryUserRepository::new();
        let auth = service(&users);

        let user = auth
            .register(" Wes@Example.com ", " Wes ", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "wes@example.com");
        assert_eq!(user.name, "Wes");

        let logged_in = auth
            .login("WES@example.com", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let users = MemoryUserRepository::new();
        let auth = service(&users);
        auth.register("wes@example.com", "Wes", "hunter2hunter2")
            .await
            .unwrap();

        for (email, password) in [
            ("wes@example.com", "wrong-password"),
            ("nobody@example.com", "hunter2hunter2"),
            ("not-an-email", "hunter2hunter2"),
        ] {
            let err = auth.login(email, password).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials), "{email}");
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_ignores_case() {
        let users = MemoryUserRepository::new();
        let auth = service(&users);
        auth.register("wes@example.com", "Wes", "hunter2hunter2")
            .await
            .unwrap();

        let err = auth
            .register("WES@EXAMPLE.COM", "Other", "hunter2hunter2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
        assert!(err.form_message().is_some());
    }

    #[tokio::test]
    async fn test_register_validation() {
        let users = MemoryUserRepository::new();
        let auth = service(&users);

        assert!(matches!(
            auth.register("nope", "Wes", "hunter2hunter2").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register("wes@example.com", "   ", "hunter2hunter2").await,
            Err(AuthError::MissingName)
        ));
        assert!(matches!(
            auth.register("wes@example.com", "Wes", "short").await,
            Err(AuthError::WeakPassword(_))
        ));
    }
}
