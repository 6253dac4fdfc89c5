//! Domain models for the store finder.
//!
//! These types represent validated domain objects separate from database row
//! types and HTML form payloads.

pub mod session;
pub mod store;
pub mod user;
pub mod validation;

pub use session::{CurrentUser, Flash, FlashLevel, SessionState, keys as session_keys};
pub use store::{Store, StoreDraft, StoreFields, StorePatch, TAG_CHOICES};
pub use user::{User, gravatar_url};
pub use validation::ValidationErrors;
