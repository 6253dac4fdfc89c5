//! Persistence for the store finder.
//!
//! # Schema: `storefinder`
//!
//! ## Tables
//!
//! - `store` - Listed stores, unique `slug`, full-text `search_vector`
//! - `user` - Registered users with Argon2 password hashes
//! - `tower_sessions.session` - Session storage (created by `sf-cli migrate`)
//!
//! # Repositories
//!
//! Handlers and services talk to the [`StoreRepository`] and
//! [`UserRepository`] traits. [`PgStoreRepository`] and [`PgUserRepository`]
//! back them with `PostgreSQL`; the [`memory`] adapters keep everything in
//! process for tests and local demos.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p storefinder-cli -- migrate
//! ```

pub mod memory;
pub mod stores;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use storefinder_core::{Email, Slug, StoreId, TagCount};

use crate::models::{Store, StoreFields, User};

pub use memory::{MemoryStoreRepository, MemoryUserRepository};
pub use stores::PgStoreRepository;
pub use users::PgUserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email or slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Storage for stores.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    /// Insert a store under `slug`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is already taken.
    async fn insert(&self, fields: &StoreFields, slug: &Slug) -> Result<Store, RepositoryError>;

    /// Replace the writable fields and slug of an existing store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no store has this ID.
    /// Returns `RepositoryError::Conflict` if the slug belongs to another store.
    async fn update(
        &self,
        id: StoreId,
        fields: &StoreFields,
        slug: &Slug,
    ) -> Result<Store, RepositoryError>;

    /// All stores, newest first.
    async fn list(&self) -> Result<Vec<Store>, RepositoryError>;

    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<Store>, RepositoryError>;

    async fn get_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    /// Count stores whose slug is `base` or a numbered variant of it,
    /// ignoring case and optionally excluding one store.
    async fn count_slug_variants(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<usize, RepositoryError>;

    /// Every tag with the number of stores carrying it, most used first.
    async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError>;

    /// Stores carrying `tag`, or every tagged store when `tag` is `None`.
    async fn list_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError>;

    /// Full-text search over name and description, best matches first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Store>, RepositoryError>;

    /// Check the backing storage is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Storage for users and their password hashes.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    async fn create_with_password(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Get a user together with their password hash, for login.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
pub(crate) fn conflict_or_database(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
