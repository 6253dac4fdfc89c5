//! Core types for Storefinder.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod location;
pub mod slug;
pub mod tag;

pub use email::{Email, EmailError};
pub use id::*;
pub use location::{GeoPoint, GeometryType, Location, LocationError};
pub use slug::{Slug, SlugError};
pub use tag::{TagCount, count_tags, normalize_tags};
