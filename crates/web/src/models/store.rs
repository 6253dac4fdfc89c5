//! Store domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefinder_core::{Location, LocationError, Slug, StoreId, normalize_tags};

use super::ValidationErrors;

/// Tags offered as checkboxes on the store form.
pub const TAG_CHOICES: &[&str] = &[
    "Wifi",
    "Open Late",
    "Family Friendly",
    "Vegetarian",
    "Licensed",
];

/// A store listed on the site (domain type).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Store {
    /// Unique store ID.
    pub id: StoreId,
    /// Display name.
    pub name: String,
    /// Unique URL slug derived from the name.
    pub slug: Slug,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Tags in the order they were entered.
    pub tags: Vec<String>,
    /// GeoJSON point plus street address.
    pub location: Location,
    /// Filename of the processed photo in the upload directory.
    pub photo: Option<String>,
    /// When the store was created.
    pub created_at: DateTime<Utc>,
}

/// Shown when a store has no photo.
pub const PLACEHOLDER_PHOTO: &str = "/static/images/store.svg";

impl Store {
    /// Public URL of the store page.
    #[must_use]
    pub fn url(&self) -> String {
        format!("/store/{}", self.slug)
    }

    /// Where the photo is served from, or the placeholder.
    #[must_use]
    pub fn photo_url(&self) -> String {
        self.photo.as_ref().map_or_else(
            || PLACEHOLDER_PHOTO.to_owned(),
            |photo| format!("/uploads/{photo}"),
        )
    }
}

/// Unvalidated store fields, as submitted by a form or a seed file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreDraft {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub address: String,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
    pub photo: Option<String>,
}

/// Validated, writable store fields. Everything except id, slug and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreFields {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
    pub photo: Option<String>,
}

impl StoreDraft {
    /// Validate the draft.
    ///
    /// Trims the name, description and address, drops a blank description,
    /// and normalizes tags. Every problem found is reported, not just the first.
    ///
    /// # Errors
    ///
    /// Returns `ValidationErrors` if the name, address or coordinates are
    /// missing, or the coordinates are out of range.
    pub fn validate(self) -> Result<StoreFields, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = self.name.trim().to_owned();
        if name.is_empty() {
            errors.push("You must supply a store name!");
        }

        let location = match (self.lng, self.lat) {
            (Some(lng), Some(lat)) => match Location::new(lng, lat, &self.address) {
                Ok(location) => Some(location),
                Err(e) => {
                    errors.push(e.to_string());
                    None
                }
            },
            _ => {
                if self.address.trim().is_empty() {
                    errors.push(LocationError::MissingAddress.to_string());
                }
                errors.push(LocationError::MissingCoordinates.to_string());
                None
            }
        };

        let description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        let Some(location) = location else {
            return Err(errors);
        };

        errors.into_result(StoreFields {
            name,
            description,
            tags: normalize_tags(&self.tags),
            location,
            photo: self.photo,
        })
    }
}

/// A partial update to a store. `None` leaves the field unchanged.
///
/// Coordinates are doubly optional: `Some(None)` means the field was
/// submitted but blank or unparseable, which fails validation instead of
/// silently keeping the old value.
#[derive(Debug, Clone, Default)]
pub struct StorePatch {
    pub name: Option<String>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub address: Option<String>,
    pub lng: Option<Option<f64>>,
    pub lat: Option<Option<f64>>,
    pub photo: Option<String>,
}

impl StorePatch {
    /// Overlay the patch on the current store, producing a full draft to
    /// re-validate.
    #[must_use]
    pub fn apply(self, current: &Store) -> StoreDraft {
        StoreDraft {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            description: self.description.or_else(|| current.description.clone()),
            tags: self.tags.unwrap_or_else(|| current.tags.clone()),
            address: self
                .address
                .unwrap_or_else(|| current.location.address.clone()),
            lng: self.lng.unwrap_or(Some(current.location.lng())),
            lat: self.lat.unwrap_or(Some(current.location.lat())),
            photo: self.photo.or_else(|| current.photo.clone()),
        }
    }
}
