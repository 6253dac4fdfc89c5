//! GeoJSON-style point locations.
//!
//! Stores are pinned to a single point with a human-readable address. The
//! serialized shape is GeoJSON's point geometry plus an `address` member:
//!
//! ```json
//! { "type": "Point", "coordinates": [-79.3832, 43.6532], "address": "Toronto" }
//! ```
//!
//! Coordinates are ordered longitude first, as in GeoJSON.

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Location`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    /// The address is blank.
    #[error("You must supply an address!")]
    MissingAddress,
    /// A coordinate is not a finite number.
    #[error("You must supply coordinates!")]
    MissingCoordinates,
    /// Longitude outside [-180, 180].
    #[error("longitude {0} is out of range")]
    LongitudeOutOfRange(f64),
    /// Latitude outside [-90, 90].
    #[error("latitude {0} is out of range")]
    LatitudeOutOfRange(f64),
}

/// Geometry kind. Only points are supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    /// A single position.
    #[default]
    Point,
}

/// A longitude/latitude pair, serialized as `[lng, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl GeoPoint {
    /// Build a point, checking the coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is not finite or out of range.
    pub fn new(lng: f64, lat: f64) -> Result<Self, LocationError> {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(LocationError::MissingCoordinates);
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(LocationError::LongitudeOutOfRange(lng));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(LocationError::LatitudeOutOfRange(lat));
        }
        Ok(Self { lng, lat })
    }
}

impl TryFrom<[f64; 2]> for GeoPoint {
    type Error = LocationError;

    fn try_from([lng, lat]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(lng, lat)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.lng, point.lat]
    }
}

/// Where a store is.
///
/// Deserializing goes through [`Location::new`], so the address and range
/// checks hold for stored and submitted JSON alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    /// Always [`GeometryType::Point`].
    #[serde(rename = "type", default)]
    pub kind: GeometryType,
    /// `[lng, lat]`.
    pub coordinates: GeoPoint,
    /// Street address as entered by the user.
    pub address: String,
}

#[derive(Deserialize)]
struct RawLocation {
    #[serde(rename = "type", default)]
    kind: GeometryType,
    coordinates: [f64; 2],
    address: String,
}

impl TryFrom<RawLocation> for Location {
    type Error = LocationError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        let [lng, lat] = raw.coordinates;
        let location = Self::new(lng, lat, &raw.address)?;
        Ok(Self {
            kind: raw.kind,
            ..location
        })
    }
}

impl Location {
    /// Build a point location, trimming and requiring the address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is blank or the coordinates are invalid.
    pub fn new(lng: f64, lat: f64, address: &str) -> Result<Self, LocationError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(LocationError::MissingAddress);
        }
        Ok(Self {
            kind: GeometryType::Point,
            coordinates: GeoPoint::new(lng, lat)?,
            address: address.to_owned(),
        })
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.coordinates.lng
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.coordinates.lat
    }
}
