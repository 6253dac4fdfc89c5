//! User domain types.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use storefinder_core::{Email, UserId};

/// A registered user (domain type).
///
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Gravatar image URL for this user.
    #[must_use]
    pub fn gravatar_url(&self) -> String {
        gravatar_url(&self.email)
    }
}

/// Gravatar image URL for an email, from the SHA-256 of the normalized address.
#[must_use]
pub fn gravatar_url(email: &Email) -> String {
    let digest = Sha256::digest(email.as_bytes());
    format!("https://gravatar.com/avatar/{}?s=200", hex::encode(digest))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gravatar_url_is_stable_across_spellings() {
        let a = gravatar_url(&Email::parse("Wes@Example.com").unwrap());
        let b = gravatar_url(&Email::parse("wes@example.com ").unwrap());
        assert_eq!(a, b);
        assert!(a.starts_with("https://gravatar.com/avatar/"));
        assert!(a.ends_with("?s=200"));
        // 64 hex chars of SHA-256
        let hash = a
            .trim_start_matches("https://gravatar.com/avatar/")
            .trim_end_matches("?s=200");
        assert_eq!(hash.len(), 64);
    }
}
