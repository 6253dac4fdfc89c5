//! Business logic services.
//!
//! Services sit between route handlers and the repositories: they validate
//! input, enforce invariants such as slug uniqueness, and own side effects
//! like writing uploaded photos to disk.

pub mod auth;
pub mod media;
pub mod stores;

pub use auth::{Argon2Verifier, AuthError, AuthService, CredentialVerifier};
pub use media::{AcceptedImage, MediaError, MediaStore, Upload};
pub use stores::{StoreError, StoreService};
